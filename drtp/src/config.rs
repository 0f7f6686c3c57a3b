//! Run-time configuration for both roles.
//!
//! The binary maps its command line onto these structs; tests build them
//! directly.  Every field has a default matching the CLI defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::timer::RETRANSMIT_TIMEOUT;

/// Port used when none is given.
pub const DEFAULT_PORT: u16 = 8088;

/// Sender window, in segments, used when none is given.
pub const DEFAULT_WINDOW: u16 = 3;

/// Receive window the server advertises in its SYN|ACK.
pub const RECEIVER_WINDOW: u16 = 15;

/// File the server writes when no output path is given.
pub const DEFAULT_OUTPUT: &str = "received_file";

/// Default server address: loopback on [`DEFAULT_PORT`].
pub fn default_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT)
}

/// Fault model for [`crate::simulator::Simulator`] on the client's outbound
/// path.
///
/// Rates are probabilities in `[0.0, 1.0]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatorConfig {
    /// Probability that a data segment is silently dropped.
    pub loss_rate: f64,
    /// Probability that a data segment is sent twice.
    pub duplicate_rate: f64,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Client (sender) settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server to connect to.
    pub server: SocketAddr,
    /// File to transfer.
    pub file: PathBuf,
    /// Locally configured window; the effective window is the minimum of this
    /// and the server's advertisement.
    pub window: u16,
    /// Retransmission interval; also bounds the handshake and teardown waits.
    pub retransmit_timeout: Duration,
    pub simulator: SimulatorConfig,
}

impl ClientConfig {
    pub fn new(server: SocketAddr, file: impl Into<PathBuf>) -> Self {
        Self {
            server,
            file: file.into(),
            window: DEFAULT_WINDOW,
            retransmit_timeout: RETRANSMIT_TIMEOUT,
            simulator: SimulatorConfig::default(),
        }
    }
}

/// Server (receiver) settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind: SocketAddr,
    /// Where received bytes are written.
    pub output: PathBuf,
    /// Sequence number to drop once, simulating loss.
    pub discard: Option<u16>,
    /// Window advertised during the handshake.
    pub advertised_window: u16,
    /// Poll interval of the data-receive loop.
    pub retransmit_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_addr(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            discard: None,
            advertised_window: RECEIVER_WINDOW,
            retransmit_timeout: RETRANSMIT_TIMEOUT,
        }
    }
}
