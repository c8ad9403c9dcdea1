//! Per-session transfer counters.
//!
//! Every counter lives inside the session that produced it and is read back
//! through an accessor after the transfer finishes.  Formatting and
//! persistence are the embedding application's concern.

use std::time::Duration;

/// Counters accumulated by one send-side session.
#[derive(Debug, Clone, Default)]
pub struct SenderStats {
    /// Number of DATA frames the message was partitioned into.
    pub total_frames: u32,
    /// DATA frame transmissions, including retransmissions.
    pub frames_sent: u64,
    /// Estimated retransmitted frames (in-flight count at each timeout).
    pub frames_retransmitted: u64,
    /// ACK frames received and successfully decoded.
    pub acks_received: u64,
    /// Length of the message in bytes.
    pub message_bytes: u64,
    /// Payload bytes pushed into the channel, including retransmissions.
    pub bytes_sent: u64,
    /// Wall-clock duration of the transfer, set at completion.
    pub elapsed: Duration,
}

/// Counters accumulated by one receive-side session.
#[derive(Debug, Clone, Default)]
pub struct ReceiverStats {
    /// ACK frames emitted.
    pub acks_sent: u64,
    /// DATA frames rejected as duplicate or out-of-order.
    pub duplicate_frames: u64,
    /// Payload bytes accepted into the reassembly buffer.
    pub bytes_received: u64,
}
