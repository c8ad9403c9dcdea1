//! Wire-format definitions for protocol frames.
//!
//! Every datagram exchanged between the two endpoints is a [`Frame`].  This
//! module is responsible for:
//! - Defining the on-wire binary layout (kind, sequence number, payload,
//!   checksum).
//! - Serialising a [`Frame`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Frame`], returning errors
//!   for malformed, truncated, or corrupted input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             Kind                              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload Length                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Checksum                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Header size: [`HEADER_LEN`] = 12 bytes.  Only the significant payload
//! bytes travel on the wire; the checksum trails them.
//!
//! The checksum is CRC-32 (ISO-HDLC) computed over the header bytes followed
//! by the significant payload bytes.  A frame whose stored checksum does not
//! match the recomputed value must be treated by the receiver as never having
//! arrived.

use crc::{Crc, CRC_32_ISO_HDLC};

/// Maximum payload bytes carried by one DATA frame.
pub const CHUNK_SIZE: usize = 512;

/// Byte length of the fixed header on the wire (kind + seq + payload_len).
pub const HEADER_LEN: usize = 12;

/// Byte length of the trailing checksum.
pub const CHECKSUM_LEN: usize = 4;

/// Largest possible encoded frame (full DATA payload).
pub const MAX_FRAME_LEN: usize = HEADER_LEN + CHUNK_SIZE + CHECKSUM_LEN;

/// ACK sequence value meaning "no DATA frame accepted yet".
///
/// The receiver acknowledges the highest in-order sequence number it has
/// accepted.  Before the first acceptance that value is minus one, which is
/// encoded on the wire as all-ones.  The sender never advances its window on
/// this value.
pub const ACK_NONE: u32 = u32::MAX;

// Byte offsets of each field within the serialised header.
const OFF_KIND: usize = 0;
const OFF_SEQ: usize = 4;
const OFF_PAYLOAD_LEN: usize = 8;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

// ---------------------------------------------------------------------------
// FrameKind
// ---------------------------------------------------------------------------

/// Discriminates the three frame types on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FrameKind {
    /// Carries a chunk of the message payload.
    Data = 1,
    /// Cumulative acknowledgement of in-order DATA frames.
    Ack = 2,
    /// End-of-message signal; terminates the receiver's loop.
    Teardown = 4,
}

impl TryFrom<u32> for FrameKind {
    type Error = FrameError;

    fn try_from(value: u32) -> Result<Self, FrameError> {
        match value {
            1 => Ok(FrameKind::Data),
            2 => Ok(FrameKind::Ack),
            4 => Ok(FrameKind::Teardown),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameKind::Data => write!(f, "DATA"),
            FrameKind::Ack => write!(f, "ACK"),
            FrameKind::Teardown => write!(f, "TEARDOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A complete protocol frame: kind, sequence number, payload bytes.
///
/// `seq` counts whole frames (0, 1, 2, ...), not bytes.  For ACK frames it
/// holds the highest in-order sequence accepted by the receiver (or
/// [`ACK_NONE`]); for TEARDOWN it is always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub seq: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a DATA frame for one message chunk.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `payload` exceeds [`CHUNK_SIZE`].
    pub fn data(seq: u32, payload: &[u8]) -> Self {
        debug_assert!(
            payload.len() <= CHUNK_SIZE,
            "payload of {} bytes exceeds CHUNK_SIZE",
            payload.len()
        );
        Self {
            kind: FrameKind::Data,
            seq,
            payload: payload.to_vec(),
        }
    }

    /// Build a cumulative ACK frame for `ack` (possibly [`ACK_NONE`]).
    pub fn ack(ack: u32) -> Self {
        Self {
            kind: FrameKind::Ack,
            seq: ack,
            payload: Vec::new(),
        }
    }

    /// Build the end-of-message TEARDOWN frame.
    pub fn teardown() -> Self {
        Self {
            kind: FrameKind::Teardown,
            seq: 0,
            payload: Vec::new(),
        }
    }

    /// Serialise this frame into a newly allocated byte vector.
    ///
    /// The checksum is computed over the header and payload and appended
    /// last.
    pub fn encode(&self) -> Vec<u8> {
        let body_len = HEADER_LEN + self.payload.len();
        let mut buf = Vec::with_capacity(body_len + CHECKSUM_LEN);

        buf.extend_from_slice(&(self.kind as u32).to_be_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);

        let csum = CRC32.checksum(&buf);
        buf.extend_from_slice(&csum.to_be_bytes());

        buf
    }

    /// Parse a [`Frame`] from a raw byte slice.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than the minimum frame size,
    /// - the `kind` field is not a known frame type,
    /// - `payload_length` exceeds [`CHUNK_SIZE`] or disagrees with
    ///   `buf.len()`, or
    /// - the checksum does not verify.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(FrameError::BufferTooShort);
        }

        let kind_raw = u32::from_be_bytes(buf[OFF_KIND..OFF_KIND + 4].try_into().unwrap());
        let seq = u32::from_be_bytes(buf[OFF_SEQ..OFF_SEQ + 4].try_into().unwrap());
        let payload_len =
            u32::from_be_bytes(buf[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 4].try_into().unwrap())
                as usize;

        if payload_len > CHUNK_SIZE {
            return Err(FrameError::PayloadTooLong(payload_len));
        }
        if buf.len() != HEADER_LEN + payload_len + CHECKSUM_LEN {
            return Err(FrameError::LengthMismatch);
        }

        let kind = FrameKind::try_from(kind_raw)?;

        let body = &buf[..HEADER_LEN + payload_len];
        let stored = u32::from_be_bytes(buf[HEADER_LEN + payload_len..].try_into().unwrap());
        if CRC32.checksum(body) != stored {
            return Err(FrameError::ChecksumFailed);
        }

        Ok(Frame {
            kind,
            seq,
            payload: buf[HEADER_LEN..HEADER_LEN + payload_len].to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer shorter than the minimum frame size.
    BufferTooShort,
    /// `payload_length` field exceeds [`CHUNK_SIZE`].
    PayloadTooLong(usize),
    /// `payload_length` field does not match the actual remaining bytes.
    LengthMismatch,
    /// The `kind` field is not DATA, ACK, or TEARDOWN.
    UnknownKind(u32),
    /// Checksum did not match the recomputed value.
    ChecksumFailed,
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::BufferTooShort => write!(f, "buffer too short to contain a frame"),
            FrameError::PayloadTooLong(n) => {
                write!(f, "payload_length {n} exceeds CHUNK_SIZE {CHUNK_SIZE}")
            }
            FrameError::LengthMismatch => {
                write!(f, "payload_length field does not match remaining bytes")
            }
            FrameError::UnknownKind(k) => write!(f, "unknown frame kind {k}"),
            FrameError::ChecksumFailed => write!(f, "checksum verification failed"),
        }
    }
}

impl std::error::Error for FrameError {}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let frame = Frame::data(42, b"hello");
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.kind, FrameKind::Data);
        assert_eq!(decoded.seq, 42);
        assert_eq!(decoded.payload, b"hello");
    }

    #[test]
    fn ack_frame_roundtrip() {
        let frame = Frame::ack(7);
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.kind, FrameKind::Ack);
        assert_eq!(decoded.seq, 7);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn ack_none_survives_the_wire() {
        let decoded = Frame::decode(&Frame::ack(ACK_NONE).encode()).unwrap();
        assert_eq!(decoded.seq, ACK_NONE);
    }

    #[test]
    fn teardown_frame_roundtrip() {
        let decoded = Frame::decode(&Frame::teardown().encode()).unwrap();
        assert_eq!(decoded.kind, FrameKind::Teardown);
        assert_eq!(decoded.seq, 0);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn full_chunk_roundtrip() {
        let payload = vec![0xabu8; CHUNK_SIZE];
        let bytes = Frame::data(3, &payload).encode();
        assert_eq!(bytes.len(), MAX_FRAME_LEN);
        let decoded = Frame::decode(&bytes).unwrap();
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn decode_empty_buffer_returns_error() {
        assert_eq!(Frame::decode(&[]), Err(FrameError::BufferTooShort));
    }

    #[test]
    fn decode_short_header_returns_error() {
        assert_eq!(
            Frame::decode(&[0u8; HEADER_LEN + CHECKSUM_LEN - 1]),
            Err(FrameError::BufferTooShort)
        );
    }

    #[test]
    fn decode_truncated_payload_returns_error() {
        let mut bytes = Frame::data(0, b"data").encode();
        bytes.pop(); // payload_length still claims 4 bytes, but buf is one short
        assert_eq!(Frame::decode(&bytes), Err(FrameError::LengthMismatch));
    }

    #[test]
    fn decode_oversized_payload_length_returns_error() {
        let mut bytes = Frame::data(0, b"x").encode();
        let bogus = (CHUNK_SIZE as u32 + 1).to_be_bytes();
        bytes[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 4].copy_from_slice(&bogus);
        assert_eq!(
            Frame::decode(&bytes),
            Err(FrameError::PayloadTooLong(CHUNK_SIZE + 1))
        );
    }

    #[test]
    fn decode_unknown_kind_returns_error() {
        let mut bytes = Frame::ack(0).encode();
        bytes[OFF_KIND..OFF_KIND + 4].copy_from_slice(&99u32.to_be_bytes());
        // Kind validation runs before checksum verification.
        match Frame::decode(&bytes) {
            Err(FrameError::UnknownKind(99)) => {}
            other => panic!("expected UnknownKind(99), got {other:?}"),
        }
    }

    #[test]
    fn decode_corrupt_payload_byte_returns_checksum_error() {
        let mut bytes = Frame::data(9, b"test").encode();
        bytes[HEADER_LEN] ^= 0xff;
        assert_eq!(Frame::decode(&bytes), Err(FrameError::ChecksumFailed));
    }

    #[test]
    fn decode_corrupt_seq_byte_returns_checksum_error() {
        let mut bytes = Frame::data(9, b"test").encode();
        bytes[OFF_SEQ] ^= 0x01;
        assert_eq!(Frame::decode(&bytes), Err(FrameError::ChecksumFailed));
    }

    #[test]
    fn kind_and_seq_big_endian_on_wire() {
        let bytes = Frame::data(0x0102_0304, b"").encode();
        assert_eq!(&bytes[OFF_KIND..OFF_KIND + 4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[OFF_SEQ..OFF_SEQ + 4], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn encoded_length_equals_header_plus_payload_plus_checksum() {
        let payload = b"exactly twelve!";
        let bytes = Frame::data(0, payload).encode();
        assert_eq!(bytes.len(), HEADER_LEN + payload.len() + CHECKSUM_LEN);
    }
}
