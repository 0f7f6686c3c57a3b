//! Datagram transport abstraction.
//!
//! [`Transport`] is the seam between the protocol and the network: a
//! packet-oriented `send_to` plus a `recv` bounded by an optional timeout that
//! reports [`Recv::Timeout`] instead of failing.  Both roles use it the same
//! way, so the protocol never depends on a particular socket API's timeout
//! semantics.
//!
//! [`Socket`] is the production implementation, a thin wrapper around
//! `tokio::net::UdpSocket`.  All protocol logic lives elsewhere; this module
//! owns only byte I/O.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};

use crate::packet::{Packet, PacketError, MAX_DATAGRAM};

/// Errors that can arise from socket operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// An outbound packet could not be framed.
    #[error("packet encode error: {0}")]
    Packet(#[from] PacketError),
}

/// Outcome of a bounded receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv {
    /// A well-formed segment and the address it came from.
    Segment(Packet, SocketAddr),
    /// Nothing arrived before the timeout.
    Timeout,
}

/// A packet-oriented datagram transport.
///
/// All methods take `&self`; implementations must be shareable across tasks.
pub trait Transport: Send + Sync {
    /// Encode `packet` and send it as one datagram to `dest`.
    fn send_to(
        &self,
        packet: &Packet,
        dest: SocketAddr,
    ) -> impl Future<Output = Result<(), SocketError>> + Send;

    /// Wait for the next well-formed segment.
    ///
    /// `None` blocks indefinitely.  Malformed datagrams are discarded and do
    /// not end the wait early.
    fn recv(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<Recv, SocketError>> + Send;
}

/// An async, packet-oriented UDP socket.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing port `0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    async fn recv_any(&self, buf: &mut [u8]) -> Result<(Packet, SocketAddr), SocketError> {
        loop {
            let (n, addr) = self.inner.recv_from(buf).await?;
            match Packet::decode(&buf[..n]) {
                Ok(packet) => return Ok((packet, addr)),
                Err(e) => log::debug!("dropping datagram from {addr}: {e}"),
            }
        }
    }
}

impl Transport for Socket {
    async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        let bytes = packet.encode()?;
        self.inner.send_to(&bytes, dest).await?;
        Ok(())
    }

    async fn recv(&self, timeout: Option<Duration>) -> Result<Recv, SocketError> {
        // One spare byte so oversized datagrams are detected, not truncated.
        let mut buf = vec![0u8; MAX_DATAGRAM + 1];
        match timeout {
            None => {
                let (packet, addr) = self.recv_any(&mut buf).await?;
                Ok(Recv::Segment(packet, addr))
            }
            Some(limit) => match timeout_at(Instant::now() + limit, self.recv_any(&mut buf)).await {
                Ok(result) => {
                    let (packet, addr) = result?;
                    Ok(Recv::Segment(packet, addr))
                }
                Err(_elapsed) => Ok(Recv::Timeout),
            },
        }
    }
}
