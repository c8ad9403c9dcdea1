//! `gbn` — Go-Back-N reliable transfer over an unreliable datagram channel.
//!
//! A sliding-window ARQ protocol: the sender pipelines up to N
//! unacknowledged DATA frames, the receiver enforces strict in-order
//! acceptance with cumulative ACKs, and a retransmit timer resends the whole
//! unacked window on expiry.
//!
//! # Architecture
//!
//! ```text
//!  message bytes                              reassembled bytes
//!       │                                            ▲
//!  ┌────▼──────┐   DATA frames   ┌──────────────────┴┐
//!  │ GbnSender │────────────────▶│    GbnReceiver    │
//!  └────┬──────┘                 └─────┬─────────────┘
//!       │         cumulative ACKs      │
//!       │◀─────────────────────────────┘
//!       │
//!  ┌────▼──────┐
//!  │  Channel  │  (lossy / corrupting datagram port)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`frame`]    — wire format (serialise / deserialise, CRC-32 checksum)
//! - [`channel`]  — unreliable datagram port (UDP + fault injection)
//! - [`timer`]    — single-shot, restartable retransmit deadline
//! - [`sender`]   — outbound window state machine and transfer driver
//! - [`receiver`] — inbound in-order reassembly and cumulative ACKs
//! - [`config`]   — window / timeout / retry tuning
//! - [`stats`]    — per-session transfer counters

pub mod channel;
pub mod config;
pub mod frame;
pub mod receiver;
pub mod sender;
pub mod stats;
pub mod timer;

pub use channel::{Channel, FaultConfig, LossyChannel, UdpChannel};
pub use config::GbnConfig;
pub use frame::{Frame, FrameKind, CHUNK_SIZE};
pub use receiver::{GbnReceiver, RecvError};
pub use sender::{GbnSender, SendError};
