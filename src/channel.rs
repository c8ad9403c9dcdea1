//! The unreliable channel port.
//!
//! The state machines never touch a socket directly; they speak to a
//! [`Channel`], a byte-oriented send/receive primitive with deliberately weak
//! guarantees:
//!
//! - `send` may silently drop the datagram (simulated loss) while still
//!   reporting the full length written.
//! - `recv` may return `Ok(0)` to mean "an inbound frame was corrupted and
//!   discarded by the channel" — the caller must simply receive again.
//! - A delivered frame may still carry flipped bits; the frame codec's
//!   checksum is the last line of defence.
//!
//! Any other failure from the underlying transport is a real I/O error and is
//! fatal to the whole transfer.
//!
//! Two implementations live here:
//! - [`UdpChannel`] — a thin wrapper around a connected `tokio::net::UdpSocket`.
//! - [`LossyChannel`] — a fault-injecting wrapper around any inner channel,
//!   driven by a seeded RNG so test runs are reproducible.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::UdpSocket;

// ---------------------------------------------------------------------------
// Channel trait
// ---------------------------------------------------------------------------

/// Byte-oriented datagram transport with loss and corruption semantics.
#[async_trait]
pub trait Channel: Send {
    /// Send one frame's bytes.  Returns the number of bytes the channel
    /// claims to have written; a lossy channel may drop the frame and still
    /// report the full length.
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Receive one frame's bytes into `buf`.  `Ok(0)` means the channel
    /// discarded a corrupted inbound frame — receive again.
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

// ---------------------------------------------------------------------------
// UdpChannel
// ---------------------------------------------------------------------------

/// A connected UDP socket speaking raw frame bytes.
#[derive(Debug)]
pub struct UdpChannel {
    /// Address this socket is bound to (filled in after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl UdpChannel {
    /// Bind to `local_addr` and connect to `peer`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn connect(local_addr: SocketAddr, peer: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        inner.connect(peer).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Bind to `local_addr` and connect to the source of the first datagram
    /// that arrives (passive side).
    ///
    /// The peeked datagram is left queued so the caller's first `recv` still
    /// sees it.
    pub async fn accept(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        Self::accept_on(inner).await
    }

    /// Like [`UdpChannel::accept`], but on an already-bound socket.  Useful
    /// when the local address must be known before the peer starts.
    pub async fn accept_on(inner: UdpSocket) -> io::Result<Self> {
        let mut probe = [0u8; 1];
        let (_, peer) = inner.peek_from(&mut probe).await?;
        inner.connect(peer).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }
}

#[async_trait]
impl Channel for UdpChannel {
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.send(buf).await
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.recv(buf).await
    }
}

// ---------------------------------------------------------------------------
// LossyChannel
// ---------------------------------------------------------------------------

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability that any given outbound frame is silently dropped.
    pub loss_rate: f64,
    /// Probability that a delivered inbound frame has one byte flipped.
    pub corruption_rate: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        // No faults by default — the wrapper is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            corruption_rate: 0.0,
        }
    }
}

/// A fault-injecting wrapper around another [`Channel`].
///
/// Loss is applied on the send path (the frame never leaves this endpoint,
/// but `send` still reports success).  Corruption is applied on the receive
/// path by flipping one byte of the delivered frame, leaving checksum
/// verification to reject it downstream.
pub struct LossyChannel<C> {
    inner: C,
    config: FaultConfig,
    rng: StdRng,
}

impl<C: Channel> LossyChannel<C> {
    /// Wrap `inner` with the given fault model, seeding the RNG for
    /// reproducible runs.
    pub fn new(inner: C, config: FaultConfig, seed: u64) -> Self {
        Self {
            inner,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl<C: Channel> Channel for LossyChannel<C> {
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.rng.gen_bool(self.config.loss_rate) {
            log::trace!("[chan] dropping outbound frame of {} bytes", buf.len());
            return Ok(buf.len());
        }
        self.inner.send(buf).await
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.recv(buf).await?;
        if n > 0 && self.rng.gen_bool(self.config.corruption_rate) {
            let idx = self.rng.gen_range(0..n);
            buf[idx] ^= 0xff;
            log::trace!("[chan] corrupting inbound frame at byte {idx}");
        }
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
