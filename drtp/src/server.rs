//! Server role: accept one client, write its file, report throughput.

use tokio::fs::File;
use tokio::io::AsyncWrite;

use crate::config::ServerConfig;
use crate::connection::ConnError;
use crate::gbn_connection::{GbnConnection, ReceiveReport};
use crate::gbn_receiver::GbnReceiver;
use crate::socket::{Socket, Transport};

/// Bind, create the output file, and serve exactly one client.
pub async fn run(config: &ServerConfig) -> Result<ReceiveReport, ConnError> {
    let socket = Socket::bind(config.bind).await?;
    log::info!("server listening on {}", socket.local_addr);

    let mut file = File::create(&config.output).await?;
    let report = serve(socket, &mut file, config).await?;

    log::info!("wrote {} bytes to {}", report.bytes, config.output.display());
    Ok(report)
}

/// Handshake, receive until FIN, then log the throughput.
///
/// Generic over the transport and sink so tests can drive it with an
/// in-memory sink.
pub async fn serve<T, W>(
    transport: T,
    sink: &mut W,
    config: &ServerConfig,
) -> Result<ReceiveReport, ConnError>
where
    T: Transport,
    W: AsyncWrite + Unpin,
{
    let mut conn =
        GbnConnection::accept(transport, config.advertised_window, config.retransmit_timeout)
            .await?;
    let report = conn
        .receive_into(sink, GbnReceiver::with_discard(config.discard))
        .await?;

    log::info!("throughput: {}", report.throughput);
    log::info!("connection closed");
    Ok(report)
}
