//! Retransmit timeout management.
//!
//! Reliable delivery requires that unacknowledged frames are re-sent if no
//! ACK arrives within a bounded time.  [`RetransmitTimer`] is a single-shot,
//! restartable deadline scoped to one transfer session:
//!
//! - [`RetransmitTimer::arm`] schedules a one-shot expiry `timeout` from now;
//!   arming while already armed **replaces** the previous deadline, it never
//!   stacks.
//! - [`RetransmitTimer::disarm`] cancels a pending expiry.
//!
//! Expiry is observed by the sender as an interruption of its blocking
//! receive: the sender passes [`RetransmitTimer::deadline`] to
//! `tokio::time::timeout_at`, so a receive that outlives the deadline returns
//! "timed out" instead of data.  Exactly one timer is live per session; no
//! process-wide alarm state exists.

use std::time::Duration;

use tokio::time::Instant;

/// A one-shot, restartable retransmit deadline for one transfer session.
#[derive(Debug)]
pub struct RetransmitTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    /// Construct a disarmed timer with a fixed expiry interval.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    /// Schedule (or reschedule) expiry one `timeout` from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    /// Cancel any pending expiry.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// `true` when an expiry is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Deadline to bound the next blocking receive with, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disarmed() {
        let timer = RetransmitTimer::new(Duration::from_millis(100));
        assert!(!timer.is_armed());
        assert!(timer.deadline().is_none());
    }

    #[test]
    fn arm_then_disarm() {
        let mut timer = RetransmitTimer::new(Duration::from_millis(100));
        timer.arm();
        assert!(timer.is_armed());
        timer.disarm();
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_deadline() {
        let mut timer = RetransmitTimer::new(Duration::from_secs(1));
        timer.arm();
        let first = timer.deadline().unwrap();

        tokio::time::advance(Duration::from_millis(500)).await;
        timer.arm();
        let second = timer.deadline().unwrap();

        assert!(second > first, "rearming must push the deadline out");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_a_blocking_wait() {
        let mut timer = RetransmitTimer::new(Duration::from_secs(1));
        timer.arm();

        let never = std::future::pending::<()>();
        let result = tokio::time::timeout_at(timer.deadline().unwrap(), never).await;
        assert!(result.is_err(), "wait must be cut short by the deadline");
    }
}
