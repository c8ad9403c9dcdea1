//! Go-Back-N receive-side state machine.
//!
//! Mirrors the sender's layering:
//!
//! - [`RecvState`] — pure in-order acceptance: the next expected sequence
//!   number, the reassembly buffer, and the cumulative-ACK value.
//! - [`GbnReceiver`] — the async driver owning the channel and per-session
//!   statistics; [`GbnReceiver::receive_message`] runs until teardown.
//!
//! # Protocol contract
//!
//! - Only the frame with `seq == expected` is accepted; its payload is
//!   appended to the reassembly buffer and `expected` advances by one.
//! - Out-of-order and duplicate frames are discarded without buffering
//!   (go-back-N never reorders), counted as duplicates.
//! - After every DATA frame, accepted or not, one cumulative ACK goes out
//!   carrying the highest in-order sequence accepted so far.  A later
//!   duplicate of that ACK is what lets the sender recover from a lost one.
//! - A frame that fails checksum or shape validation is treated as never
//!   received: no ACK, no counter, no state change.
//! - TEARDOWN ends the session; it is not acknowledged.  The reassembled
//!   buffer is handed to the caller.
//!
//! The receiver has no timer — it is purely reactive and blocks on the
//! channel indefinitely.

use std::io;

use crate::channel::Channel;
use crate::frame::{Frame, FrameKind, MAX_FRAME_LEN};
use crate::stats::ReceiverStats;

// ---------------------------------------------------------------------------
// RecvState
// ---------------------------------------------------------------------------

/// Pure in-order reassembly state for one inbound message.
#[derive(Debug, Default)]
pub struct RecvState {
    /// Next sequence number accepted.
    expected: u32,
    /// Accepted payload bytes, in order.
    buffer: Vec<u8>,
}

impl RecvState {
    /// Create an empty reception session expecting sequence 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number this session will accept.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Bytes reassembled so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// `true` when nothing has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Process an inbound DATA frame.
    ///
    /// Returns `true` when the frame was accepted (`seq == expected`) and its
    /// payload appended.  Returns `false` for out-of-order or duplicate
    /// frames, which are discarded; the caller still sends a cumulative ACK
    /// in both cases.
    pub fn on_data(&mut self, seq: u32, payload: &[u8]) -> bool {
        if seq == self.expected {
            self.buffer.extend_from_slice(payload);
            self.expected += 1;
            true
        } else {
            false
        }
    }

    /// Cumulative ACK value to place in the next outbound ACK frame: the
    /// highest in-order sequence accepted so far, or [`crate::frame::ACK_NONE`]
    /// before the first acceptance.
    pub fn ack_value(&self) -> u32 {
        self.expected.wrapping_sub(1)
    }

    /// Hand the reassembled message to the caller, consuming the session.
    pub fn into_message(self) -> Vec<u8> {
        self.buffer
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that abort a receive-side session.
#[derive(Debug)]
pub enum RecvError {
    /// The channel failed for a reason other than simulated corruption.
    Io(io::Error),
}

impl std::fmt::Display for RecvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecvError::Io(e) => write!(f, "channel I/O error: {e}"),
        }
    }
}

impl std::error::Error for RecvError {}

impl From<io::Error> for RecvError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// GbnReceiver
// ---------------------------------------------------------------------------

/// Receive side of one Go-Back-N endpoint.
pub struct GbnReceiver<C> {
    channel: C,
    stats: ReceiverStats,
}

impl<C: Channel> GbnReceiver<C> {
    /// Create a receiver over `channel`.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            stats: ReceiverStats::default(),
        }
    }

    /// Counters for the most recent session.
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Receive one complete message.
    ///
    /// Loops until a TEARDOWN frame arrives, then returns the reassembled
    /// bytes.  Corrupted, malformed, and misordered frames never escalate;
    /// only a real channel I/O failure does.
    pub async fn receive_message(&mut self) -> Result<Vec<u8>, RecvError> {
        let mut state = RecvState::new();
        let mut buf = vec![0u8; MAX_FRAME_LEN];
        self.stats = ReceiverStats::default();

        loop {
            let n = self.channel.recv(&mut buf).await?;
            if n == 0 {
                // Channel discarded a corrupted frame — nothing was received.
                continue;
            }

            let frame = match Frame::decode(&buf[..n]) {
                Ok(f) => f,
                Err(e) => {
                    log::debug!("[gbn] dropping undecodable frame: {e}");
                    continue;
                }
            };

            match frame.kind {
                FrameKind::Teardown => {
                    log::debug!(
                        "[gbn] ← TEARDOWN — message complete ({} bytes)",
                        state.len()
                    );
                    return Ok(state.into_message());
                }
                FrameKind::Data => {
                    let accepted = state.on_data(frame.seq, &frame.payload);
                    if accepted {
                        self.stats.bytes_received += frame.payload.len() as u64;
                        log::debug!(
                            "[gbn] ← DATA seq={} len={} accepted",
                            frame.seq,
                            frame.payload.len()
                        );
                    } else {
                        self.stats.duplicate_frames += 1;
                        log::debug!(
                            "[gbn] ← DATA seq={} rejected (expected {})",
                            frame.seq,
                            state.expected()
                        );
                    }

                    let ack = Frame::ack(state.ack_value());
                    self.channel.send(&ack.encode()).await?;
                    self.stats.acks_sent += 1;
                    log::debug!("[gbn] → ACK {}", state.ack_value());
                }
                FrameKind::Ack => {
                    // A stray ACK means the roles are confused; drop it.
                    log::debug!("[gbn] ignoring unexpected ACK frame");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
