//! Client role: connect, send one file, tear down.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::fs::File;
use tokio::io::AsyncRead;

use crate::config::ClientConfig;
use crate::connection::{ConnError, Teardown};
use crate::gbn_connection::{GbnConnection, TransferStats};
use crate::gbn_sender::OutgoingBuffer;
use crate::simulator::Simulator;
use crate::socket::{Socket, Transport};

/// Outcome of one client run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientReport {
    pub stats: TransferStats,
    pub teardown: Teardown,
}

/// Read `config.file`, bind an ephemeral socket and deliver the file.
pub async fn run(config: &ClientConfig) -> Result<ClientReport, ConnError> {
    let file = File::open(&config.file).await?;

    let local = match config.server.ip() {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };
    let socket = Socket::bind(SocketAddr::new(local, 0)).await?;
    let transport = Simulator::new(socket, config.simulator.clone());

    send(transport, file, config).await
}

/// Frame `source`, then handshake, transmit, and close.
///
/// The whole source is framed before the handshake so that an unreadable or
/// oversized source fails without touching the network.
pub async fn send<T, R>(
    transport: T,
    source: R,
    config: &ClientConfig,
) -> Result<ClientReport, ConnError>
where
    T: Transport,
    R: AsyncRead + Unpin,
{
    let buffer = OutgoingBuffer::from_reader(source).await?;
    log::info!(
        "prepared {} packet(s), {} bytes",
        buffer.len(),
        buffer.payload_bytes()
    );

    let mut conn = GbnConnection::connect(
        transport,
        config.server,
        config.window,
        config.retransmit_timeout,
    )
    .await?;

    let stats = conn.transmit(buffer).await?;
    log::info!(
        "all {} packet(s) acknowledged ({} retransmission(s), {} timeout(s))",
        stats.segments,
        stats.retransmissions,
        stats.timeouts
    );

    let teardown = conn.close().await?;
    Ok(ClientReport { stats, teardown })
}
