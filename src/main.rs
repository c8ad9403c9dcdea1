//! Entry point for `gbn`.
//!
//! Parses CLI arguments and dispatches into either **send** or **recv** mode.
//! All protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing, socket wiring) and the final
//! statistics printout.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use gbn::channel::{FaultConfig, LossyChannel, UdpChannel};
use gbn::config::GbnConfig;
use gbn::receiver::GbnReceiver;
use gbn::sender::GbnSender;

/// Go-Back-N reliable transfer over a lossy UDP channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Probability that an outbound frame is silently dropped.
    #[arg(long, default_value_t = 0.0, global = true)]
    loss: f64,

    /// Probability that a delivered frame has one byte flipped.
    #[arg(long, default_value_t = 0.0, global = true)]
    corrupt: f64,

    /// RNG seed for the fault model (reproducible runs).
    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file to a receiving peer.
    Send {
        /// Remote receiver address (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        peer: SocketAddr,
        /// File to transfer.
        #[arg(short, long)]
        file: PathBuf,
        /// Sliding-window size N.
        #[arg(short, long, default_value_t = 4)]
        window: u32,
        /// Retransmit timeout in milliseconds.
        #[arg(short, long, default_value_t = 1000)]
        timeout_ms: u64,
        /// Consecutive timeouts tolerated before aborting.
        #[arg(short, long, default_value_t = 6)]
        retries: u32,
    },
    /// Receive one message and write it to a file.
    Recv {
        /// Local address to bind (e.g. 0.0.0.0:9000).
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
        /// Where to write the received message.
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let faults = FaultConfig {
        loss_rate: cli.loss,
        corruption_rate: cli.corrupt,
    };

    match cli.mode {
        Mode::Send {
            peer,
            file,
            window,
            timeout_ms,
            retries,
        } => {
            let message = std::fs::read(&file)?;
            log::info!("sending {} ({} bytes) to {peer}", file.display(), message.len());

            let udp = UdpChannel::connect("0.0.0.0:0".parse()?, peer).await?;
            let channel = LossyChannel::new(udp, faults, cli.seed);
            let config = GbnConfig {
                window_size: window,
                timeout: Duration::from_millis(timeout_ms),
                max_retries: retries,
            };

            let mut sender = GbnSender::new(channel, config);
            let sent = sender.send_message(&message).await?;
            let stats = sender.stats();
            log::info!("transfer complete: {sent} bytes");
            log::info!(
                "frames: {} total, {} sent, {} retransmitted; acks received: {}; elapsed: {:?}",
                stats.total_frames,
                stats.frames_sent,
                stats.frames_retransmitted,
                stats.acks_received,
                stats.elapsed
            );
        }
        Mode::Recv { bind, out } => {
            log::info!("listening on {bind}");
            let udp = UdpChannel::accept(bind).await?;
            let channel = LossyChannel::new(udp, faults, cli.seed);

            let mut receiver = GbnReceiver::new(channel);
            let message = receiver.receive_message().await?;
            std::fs::write(&out, &message)?;

            let stats = receiver.stats();
            log::info!("received {} bytes into {}", message.len(), out.display());
            log::info!(
                "acks sent: {}; duplicate frames: {}",
                stats.acks_sent,
                stats.duplicate_frames
            );
        }
    }

    Ok(())
}
