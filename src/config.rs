//! Protocol tuning parameters.
//!
//! One [`GbnConfig`] is supplied per transfer session by the caller (CLI or
//! embedding application).  The channel's own loss/corruption knobs live in
//! [`crate::channel::FaultConfig`]; the state machines never see them.

use std::time::Duration;

/// Adjustable parameters for one Go-Back-N transfer.
#[derive(Debug, Clone)]
pub struct GbnConfig {
    /// Maximum number of unacknowledged DATA frames in flight (N, ≥ 1).
    pub window_size: u32,
    /// Retransmit timeout: how long the sender waits for an ACK before
    /// resending the whole unacked window.
    pub timeout: Duration,
    /// Consecutive no-progress timeouts tolerated before the transfer is
    /// aborted.
    pub max_retries: u32,
}

impl Default for GbnConfig {
    fn default() -> Self {
        Self {
            window_size: 4,
            timeout: Duration::from_millis(1000),
            max_retries: 6,
        }
    }
}

impl GbnConfig {
    /// Validate the configuration.
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is zero.
    pub fn assert_valid(&self) {
        assert!(self.window_size >= 1, "window_size must be at least 1");
    }
}
