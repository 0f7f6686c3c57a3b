//! Entry point for `drtp`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client** mode.
//! All actual protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing, exit status).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use drtp::config::{ClientConfig, ServerConfig, DEFAULT_OUTPUT, DEFAULT_PORT, DEFAULT_WINDOW};

/// Reliable file transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run as a server: receive one file and report throughput.
    Server {
        /// IP address to bind.
        #[arg(short, long, default_value = "127.0.0.1")]
        ip: IpAddr,
        /// Port to bind.
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Drop this sequence number once to exercise retransmission.
        #[arg(short, long)]
        discard: Option<u16>,
        /// Where to write the received file.
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Run as a client: send one file to a server.
    Client {
        /// File to send.
        #[arg(short, long)]
        file: PathBuf,
        /// Server IP address.
        #[arg(short, long, default_value = "127.0.0.1")]
        ip: IpAddr,
        /// Server port.
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Sliding window size in packets.
        #[arg(short, long, default_value_t = DEFAULT_WINDOW,
              value_parser = clap::value_parser!(u16).range(1..))]
        window: u16,
        /// Probability of dropping each outbound data packet.
        #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
        loss: f64,
    },
}

fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{rate} is not a probability in [0, 1]"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Per-packet progress is logged at info; RUST_LOG overrides.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Server {
            ip,
            port,
            discard,
            output,
        } => {
            let config = ServerConfig {
                bind: SocketAddr::new(ip, port),
                output,
                discard,
                ..ServerConfig::default()
            };
            let report = drtp::server::run(&config)
                .await
                .with_context(|| format!("server on {} failed", config.bind))?;
            println!("\nThroughput: {}", report.throughput);
        }
        Mode::Client {
            file,
            ip,
            port,
            window,
            loss,
        } => {
            let mut config = ClientConfig::new(SocketAddr::new(ip, port), file);
            config.window = window;
            config.simulator.loss_rate = loss;
            let report = drtp::client::run(&config).await.with_context(|| {
                format!("sending {} to {} failed", config.file.display(), config.server)
            })?;
            log::info!(
                "sent {} bytes in {} packet(s), teardown: {:?}",
                report.stats.bytes,
                report.stats.segments,
                report.teardown
            );
        }
    }

    Ok(())
}
