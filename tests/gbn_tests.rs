//! Integration tests for the Go-Back-N transfer protocol.
//!
//! Each test spins up the two GBN endpoints talking over the loopback
//! interface.  Both sides are spawned as separate tokio tasks so they can
//! make progress concurrently without blocking each other.
//!
//! Fault scenarios use a deterministic dropping wrapper rather than the
//! probabilistic [`LossyChannel`], so every run exercises exactly the same
//! loss pattern.  Teardown frames are never dropped here: teardown loss is
//! undetectable by design, and a test that hangs proves nothing.

use std::io;
use std::net::SocketAddr;
use std::ops::Range;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use gbn::channel::{Channel, UdpChannel};
use gbn::config::GbnConfig;
use gbn::frame::CHUNK_SIZE;
use gbn::receiver::GbnReceiver;
use gbn::sender::{GbnSender, SendError};
use gbn::stats::{ReceiverStats, SenderStats};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Drops outbound frames whose 0-based send index falls in `drop`.
/// Everything else passes straight through to the inner channel.
struct DropSends<C> {
    inner: C,
    drop: Range<usize>,
    sent_so_far: usize,
}

impl<C> DropSends<C> {
    fn new(inner: C, drop: Range<usize>) -> Self {
        Self {
            inner,
            drop,
            sent_so_far: 0,
        }
    }
}

#[async_trait]
impl<C: Channel> Channel for DropSends<C> {
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let index = self.sent_so_far;
        self.sent_so_far += 1;
        if self.drop.contains(&index) {
            return Ok(buf.len()); // silent drop
        }
        self.inner.send(buf).await
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.recv(buf).await
    }
}

fn test_config(window: u32) -> GbnConfig {
    GbnConfig {
        window_size: window,
        timeout: Duration::from_millis(100),
        max_retries: 10,
    }
}

/// Deterministic test message of `len` bytes.
fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Bind the receiver socket up front so the sender knows where to aim.
async fn receiver_socket() -> (UdpSocket, SocketAddr) {
    let sock = UdpSocket::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = sock.local_addr().expect("local_addr");
    (sock, addr)
}

/// Run one complete transfer: receiver wrapped by `wrap_rx`, sender wrapped
/// by `wrap_tx`.  Returns the sender's result plus both sides' statistics
/// and the received message.
async fn run_transfer<FT, FR, CT, CR>(
    message: Vec<u8>,
    config: GbnConfig,
    wrap_tx: FT,
    wrap_rx: FR,
) -> (Result<usize, SendError>, SenderStats, Vec<u8>, ReceiverStats)
where
    FT: FnOnce(UdpChannel) -> CT + Send + 'static,
    FR: FnOnce(UdpChannel) -> CR + Send + 'static,
    CT: Channel + 'static,
    CR: Channel + 'static,
{
    let (rx_sock, rx_addr) = receiver_socket().await;

    let receiver = tokio::spawn(async move {
        let chan = UdpChannel::accept_on(rx_sock).await.expect("accept");
        let mut rx = GbnReceiver::new(wrap_rx(chan));
        let msg = rx.receive_message().await.expect("receive_message");
        (msg, rx.stats().clone())
    });

    let sender = tokio::spawn(async move {
        let chan = UdpChannel::connect("127.0.0.1:0".parse().unwrap(), rx_addr)
            .await
            .expect("connect");
        let mut tx = GbnSender::new(wrap_tx(chan), config);
        let result = tx.send_message(&message).await;
        (result, tx.stats().clone())
    });

    let (tx_out, rx_out) = tokio::join!(sender, receiver);
    let (result, tx_stats) = tx_out.unwrap();
    let (received, rx_stats) = rx_out.unwrap();
    (result, tx_stats, received, rx_stats)
}

// ---------------------------------------------------------------------------
// Test 1: lossless end-to-end, window 4, 2000 bytes (512+512+512+464)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lossless_transfer_window4() {
    let message = patterned(2000);
    let expected = message.clone();

    let (result, tx_stats, received, rx_stats) =
        run_transfer(message, test_config(4), |c| c, |c| c).await;

    assert_eq!(result.unwrap(), 2000);
    assert_eq!(received, expected);

    assert_eq!(tx_stats.total_frames, 4);
    assert_eq!(tx_stats.frames_sent, 4);
    assert_eq!(tx_stats.frames_retransmitted, 0);
    assert_eq!(tx_stats.acks_received, 4);
    assert_eq!(tx_stats.bytes_sent, 2000);

    assert_eq!(rx_stats.acks_sent, 4);
    assert_eq!(rx_stats.duplicate_frames, 0);
    assert_eq!(rx_stats.bytes_received, 2000);
}

// ---------------------------------------------------------------------------
// Test 2: a dropped DATA frame forces a whole-window resend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_data_frame_triggers_go_back_n() {
    let message = patterned(2000); // frames 0..=3
    let expected = message.clone();

    // Sender's 2nd send (frame 1, first transmission) vanishes.
    let (result, tx_stats, received, rx_stats) = run_transfer(
        message,
        test_config(4),
        |c| DropSends::new(c, 1..2),
        |c| c,
    )
    .await;

    assert_eq!(result.unwrap(), 2000);
    assert_eq!(received, expected);

    // Timeout resent the whole unacked range 1..=3.
    assert_eq!(tx_stats.frames_sent, 7);
    assert_eq!(tx_stats.frames_retransmitted, 3);

    // Frames 2 and 3 overtook the gap and were rejected as out-of-order.
    assert_eq!(rx_stats.duplicate_frames, 2);
    assert_eq!(rx_stats.bytes_received, 2000);
}

// ---------------------------------------------------------------------------
// Test 3: lost ACKs recover through a cumulative re-ACK
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lost_acks_recover_via_cumulative_ack() {
    let message = patterned(2000);
    let expected = message.clone();

    // All four frames are accepted on first delivery, but the ACKs for
    // frames 1..=3 are dropped.  The sender times out after ACK 0, resends
    // 1..=3, and the receiver answers each duplicate with cumulative ACK 3.
    let (result, tx_stats, received, rx_stats) = run_transfer(
        message,
        test_config(4),
        |c| c,
        |c| DropSends::new(c, 1..4),
    )
    .await;

    assert_eq!(result.unwrap(), 2000);
    assert_eq!(received, expected);

    assert_eq!(tx_stats.frames_retransmitted, 3);
    // The resent frames had already been accepted — pure duplicates.
    assert_eq!(rx_stats.duplicate_frames, 3);
    assert_eq!(rx_stats.bytes_received, 2000);
}

// ---------------------------------------------------------------------------
// Test 4: multi-burst transfer (window much smaller than the message)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn large_transfer_many_windows() {
    let message = patterned(CHUNK_SIZE * 24 + 100); // 25 frames, window 8
    let expected = message.clone();

    let (result, tx_stats, received, rx_stats) =
        run_transfer(message, test_config(8), |c| c, |c| c).await;

    assert_eq!(result.unwrap(), expected.len());
    assert_eq!(received, expected);
    assert_eq!(tx_stats.total_frames, 25);
    assert_eq!(tx_stats.frames_retransmitted, 0);
    assert_eq!(rx_stats.bytes_received, expected.len() as u64);
}

// ---------------------------------------------------------------------------
// Test 5: window wider than the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn window_larger_than_message() {
    let message = patterned(CHUNK_SIZE * 2 + 7); // 3 frames, window 16
    let expected = message.clone();

    let (result, tx_stats, received, _) =
        run_transfer(message, test_config(16), |c| c, |c| c).await;

    assert_eq!(result.unwrap(), expected.len());
    assert_eq!(received, expected);
    // Only 3 frames ever outstanding despite the wide window.
    assert_eq!(tx_stats.frames_sent, 3);
}

// ---------------------------------------------------------------------------
// Test 6: single short frame
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tiny_message_single_frame() {
    let message = b"hi".to_vec();

    let (result, tx_stats, received, rx_stats) =
        run_transfer(message, test_config(4), |c| c, |c| c).await;

    assert_eq!(result.unwrap(), 2);
    assert_eq!(received, b"hi");
    assert_eq!(tx_stats.total_frames, 1);
    assert_eq!(rx_stats.bytes_received, 2);
}

// ---------------------------------------------------------------------------
// Test 7: a silent peer exhausts the retry budget
// ---------------------------------------------------------------------------

#[tokio::test]
async fn silent_peer_exhausts_retries() {
    // Bind a receiver socket that never answers.
    let (_mute_sock, mute_addr) = receiver_socket().await;

    let chan = UdpChannel::connect("127.0.0.1:0".parse().unwrap(), mute_addr)
        .await
        .expect("connect");
    let config = GbnConfig {
        window_size: 4,
        timeout: Duration::from_millis(50),
        max_retries: 3,
    };
    let mut tx = GbnSender::new(chan, config);

    let result = tx.send_message(&patterned(1000)).await;
    assert!(matches!(result, Err(SendError::MaxRetriesExceeded)));

    // Two frames, initial burst plus two resend rounds.
    assert_eq!(tx.stats().frames_sent, 6);
    assert_eq!(tx.stats().frames_retransmitted, 6);
}
