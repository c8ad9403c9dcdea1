//! Go-Back-N send-side state machine.
//!
//! Split in two layers, so the protocol rules stay testable without I/O:
//!
//! - [`SendState`] — pure window bookkeeping: `base`, `highest_sent`, the
//!   retry counter, and the cumulative-ACK rules.
//! - [`GbnSender`] — the async driver owning the channel, the retransmit
//!   timer, and the per-session statistics; [`GbnSender::send_message`] runs
//!   one complete transfer.
//!
//! # Protocol contract
//!
//! - The message is partitioned into `ceil(len / CHUNK_SIZE)` DATA frames
//!   with sequence numbers `0..n-1`; only the last frame may be short.
//! - At most `window_size` frames are in flight at once.
//! - ACKs are **cumulative**: an ACK carrying `K` means every frame up to and
//!   including `K` has been accepted in order; the window advances to `K+1`.
//! - On timeout the sender retransmits **every** unacked frame from `base`
//!   (the defining go-back-N step), up to a hard retry ceiling.  Exhausting
//!   the ceiling aborts the whole transfer; no partial byte count is ever
//!   reported.
//! - After the last ACK the sender emits one TEARDOWN frame, retrying the
//!   local send until the channel reports the full frame written.  The
//!   receiver never acknowledges teardown; a lost teardown goes undetected
//!   (known protocol weakness, kept by design).

use std::io;
use std::ops::Range;

use tokio::time::Instant;

use crate::channel::Channel;
use crate::config::GbnConfig;
use crate::frame::{Frame, FrameKind, ACK_NONE, CHUNK_SIZE, MAX_FRAME_LEN};
use crate::stats::SenderStats;
use crate::timer::RetransmitTimer;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Number of DATA frames needed for a message of `len` bytes.
pub fn total_frames(len: usize) -> u32 {
    len.div_ceil(CHUNK_SIZE) as u32
}

/// Payload slice for frame `seq` of `message`.
///
/// Every chunk is exactly [`CHUNK_SIZE`] bytes except the last, which carries
/// the residual byte count.
fn chunk_of(message: &[u8], seq: u32) -> &[u8] {
    let start = seq as usize * CHUNK_SIZE;
    let end = message.len().min(start + CHUNK_SIZE);
    &message[start..end]
}

// ---------------------------------------------------------------------------
// SendState
// ---------------------------------------------------------------------------

/// Result of feeding one ACK value into [`SendState::on_ack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The window advanced.  `window_drained` is `true` when every frame sent
    /// so far is now acknowledged.
    Advanced { window_drained: bool },
    /// Duplicate, stale, or spurious ACK — no state changed.
    Ignored,
}

/// Pure Go-Back-N window state for one transfer session.
///
/// ```text
///      base                    highest_sent
///       │                           │
///  ─────┼───────────────────────────┼─────────▶ frame seq
///       │ ◀──────  in flight  ─────▶│
/// ```
#[derive(Debug)]
pub struct SendState {
    /// Sequence number of the oldest unacknowledged frame.
    base: u32,
    /// Highest sequence number transmitted so far.
    highest_sent: Option<u32>,
    /// Total DATA frames in the message.
    total: u32,
    /// Window size N.
    window_size: u32,
    /// Consecutive timeouts since the last window advance.
    retries: u32,
}

impl SendState {
    /// Create the window state for a message of `total` frames.
    pub fn new(total: u32, window_size: u32) -> Self {
        Self {
            base: 0,
            highest_sent: None,
            total,
            window_size,
            retries: 0,
        }
    }

    /// Oldest unacknowledged sequence number.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Consecutive no-progress timeouts so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// `true` once every frame of the message has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.base >= self.total
    }

    /// The range of sequence numbers to (re)transmit in the next burst:
    /// `base .. min(base + window_size, total)`.
    pub fn window_range(&self) -> Range<u32> {
        self.base..(self.base + self.window_size).min(self.total)
    }

    /// Number of frames sent but not yet acknowledged.
    pub fn in_flight(&self) -> u32 {
        match self.highest_sent {
            Some(h) => h + 1 - self.base,
            None => 0,
        }
    }

    /// Record that frame `seq` was handed to the channel.
    pub fn record_sent(&mut self, seq: u32) {
        self.highest_sent = Some(self.highest_sent.map_or(seq, |h| h.max(seq)));
    }

    /// Process a cumulative ACK value from the wire.
    ///
    /// Advances `base` to `ack + 1` when `ack` acknowledges at least one
    /// outstanding frame; resets the retry counter on progress.  [`ACK_NONE`],
    /// duplicates (`ack < base`), and values beyond `highest_sent` are
    /// ignored, which makes duplicate and reordered ACKs idempotent.
    pub fn on_ack(&mut self, ack: u32) -> AckOutcome {
        if ack == ACK_NONE {
            return AckOutcome::Ignored;
        }
        let Some(highest) = self.highest_sent else {
            return AckOutcome::Ignored;
        };
        if ack < self.base || ack > highest {
            return AckOutcome::Ignored;
        }

        self.base = ack + 1;
        self.retries = 0;
        AckOutcome::Advanced {
            window_drained: self.base == highest + 1,
        }
    }

    /// Record one timeout expiry; returns the new consecutive-timeout count.
    pub fn on_timeout(&mut self) -> u32 {
        self.retries += 1;
        self.retries
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that abort a send-side transfer.
#[derive(Debug)]
pub enum SendError {
    /// The channel failed for a reason other than simulated loss.
    Io(io::Error),
    /// The retry budget was exhausted with frames still unacknowledged.
    MaxRetriesExceeded,
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Io(e) => write!(f, "channel I/O error: {e}"),
            SendError::MaxRetriesExceeded => {
                write!(f, "maximum retries exceeded with frames unacknowledged")
            }
        }
    }
}

impl std::error::Error for SendError {}

impl From<io::Error> for SendError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// GbnSender
// ---------------------------------------------------------------------------

/// Outcome of one bounded receive attempt.
enum RecvEvent {
    /// A frame's bytes arrived.
    Bytes(usize),
    /// The channel discarded a corrupted inbound frame (zero read).
    Discarded,
    /// The retransmit deadline expired before anything arrived.
    Expired,
}

/// Receive into `buf`, bounded by `deadline` when one is armed.
async fn recv_or_deadline<C: Channel>(
    channel: &mut C,
    buf: &mut [u8],
    deadline: Option<Instant>,
) -> io::Result<RecvEvent> {
    let result = match deadline {
        Some(d) => match tokio::time::timeout_at(d, channel.recv(buf)).await {
            Ok(inner) => inner,
            Err(_elapsed) => return Ok(RecvEvent::Expired),
        },
        None => channel.recv(buf).await,
    };
    match result? {
        0 => Ok(RecvEvent::Discarded),
        n => Ok(RecvEvent::Bytes(n)),
    }
}

/// Send side of one Go-Back-N endpoint.
pub struct GbnSender<C> {
    channel: C,
    config: GbnConfig,
    stats: SenderStats,
}

impl<C: Channel> GbnSender<C> {
    /// Create a sender over `channel` with the given tuning parameters.
    ///
    /// # Panics
    ///
    /// Panics if `config.window_size` is zero.
    pub fn new(channel: C, config: GbnConfig) -> Self {
        config.assert_valid();
        Self {
            channel,
            config,
            stats: SenderStats::default(),
        }
    }

    /// Counters for the most recent transfer.
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Reliably transfer `message` to the peer.
    ///
    /// Pipelines up to `window_size` DATA frames, slides the window on
    /// cumulative ACKs, retransmits the whole unacked range on timeout, and
    /// finishes with the teardown frame.  Returns the message length on
    /// success.  A failed transfer returns an error and claims no bytes sent.
    pub async fn send_message(&mut self, message: &[u8]) -> Result<usize, SendError> {
        let total = total_frames(message.len());
        let mut state = SendState::new(total, self.config.window_size);
        let mut timer = RetransmitTimer::new(self.config.timeout);
        let mut buf = vec![0u8; MAX_FRAME_LEN];

        self.stats = SenderStats {
            total_frames: total,
            message_bytes: message.len() as u64,
            ..SenderStats::default()
        };
        let start = std::time::Instant::now();

        log::debug!(
            "[gbn] send_message: {} bytes in {} frame(s), window={}",
            message.len(),
            total,
            self.config.window_size
        );

        // Transmission round pending: true on a fresh window and after a
        // timeout (whole-window resend).
        let mut send_pending = true;

        while !state.is_complete() {
            if send_pending {
                send_pending = false;
                for seq in state.window_range() {
                    let chunk = chunk_of(message, seq);
                    self.channel.send(&Frame::data(seq, chunk).encode()).await?;
                    state.record_sent(seq);
                    self.stats.frames_sent += 1;
                    self.stats.bytes_sent += chunk.len() as u64;
                    log::debug!(
                        "[gbn] → DATA seq={} len={} base={}",
                        seq,
                        chunk.len(),
                        state.base()
                    );
                }
                timer.arm();
            }

            match recv_or_deadline(&mut self.channel, &mut buf, timer.deadline()).await? {
                RecvEvent::Expired => {
                    self.stats.frames_retransmitted += u64::from(state.in_flight());
                    if state.on_timeout() >= self.config.max_retries {
                        log::warn!(
                            "[gbn] no progress after {} consecutive timeouts — aborting",
                            state.retries()
                        );
                        return Err(SendError::MaxRetriesExceeded);
                    }
                    log::debug!(
                        "[gbn] timeout — resending {} frame(s) from base {}",
                        state.in_flight(),
                        state.base()
                    );
                    send_pending = true;
                }
                RecvEvent::Discarded => {
                    // Channel dropped a corrupted frame; keep waiting for the
                    // ACK under the same deadline.
                }
                RecvEvent::Bytes(n) => {
                    let frame = match Frame::decode(&buf[..n]) {
                        Ok(f) => f,
                        Err(e) => {
                            log::debug!("[gbn] dropping undecodable frame: {e}");
                            continue;
                        }
                    };
                    if frame.kind != FrameKind::Ack {
                        log::debug!("[gbn] ignoring unexpected {} frame", frame.kind);
                        continue;
                    }
                    self.stats.acks_received += 1;

                    match state.on_ack(frame.seq) {
                        AckOutcome::Advanced { window_drained } => {
                            log::debug!(
                                "[gbn] ← ACK {} — base now {}",
                                frame.seq,
                                state.base()
                            );
                            if window_drained {
                                timer.disarm();
                                send_pending = true;
                            } else {
                                timer.arm();
                            }
                        }
                        AckOutcome::Ignored => {
                            log::debug!("[gbn] ← stale ACK {} ignored", frame.seq);
                        }
                    }
                }
            }
        }

        self.send_teardown().await?;
        self.stats.elapsed = start.elapsed();
        log::debug!(
            "[gbn] transfer complete: {} frame(s) sent, {} retransmitted",
            self.stats.frames_sent,
            self.stats.frames_retransmitted
        );
        Ok(message.len())
    }

    /// Emit the TEARDOWN frame, retrying until the channel reports the full
    /// frame written.
    ///
    /// This confirms only the *local* send, not receipt — teardown is never
    /// acknowledged by the peer.
    async fn send_teardown(&mut self) -> Result<(), SendError> {
        let bytes = Frame::teardown().encode();
        loop {
            let written = self.channel.send(&bytes).await?;
            if written == bytes.len() {
                log::debug!("[gbn] → TEARDOWN");
                return Ok(());
            }
            log::debug!(
                "[gbn] short teardown write ({written}/{} bytes) — retrying",
                bytes.len()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
