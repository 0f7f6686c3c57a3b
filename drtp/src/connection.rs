//! Per-connection lifecycle: handshake and client teardown.
//!
//! A [`Connection`] owns the transport, the peer address and the negotiated
//! window for one logical session.  It is created by an active open
//! ([`Connection::connect`], client) or by accepting a peer's SYN
//! ([`Connection::accept`], server); the data phase is driven by
//! [`crate::gbn_connection::GbnConnection`].
//!
//! Neither side retries control segments.  A client that hears no SYN|ACK
//! within one retransmission interval gives up; a client that hears no
//! FIN|ACK closes anyway.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::gbn_sender::MAX_SEGMENTS;
use crate::packet::{flags, Packet};
use crate::socket::{Recv, SocketError, Transport};
use crate::state::ConnectionState;
use crate::timer::RetransmitTimer;

/// Errors surfaced by the connection layer.
///
/// Recoverable protocol conditions (timeouts during the data phase,
/// out-of-order segments, stale acknowledgements) never appear here.
#[derive(Debug, Error)]
pub enum ConnError {
    /// No SYN|ACK arrived within the handshake timeout.
    #[error("connection failed: no SYN-ACK from peer")]
    HandshakeFailed,
    /// The operation is not valid in the connection's current state.
    #[error("operation not valid in state {0}")]
    BadState(ConnectionState),
    /// The byte source needs more segments than the 16-bit sequence space holds.
    #[error("transfer needs more than {} segments", MAX_SEGMENTS)]
    TooManySegments,
    #[error(transparent)]
    Socket(#[from] SocketError),
    /// Reading the byte source or writing the byte sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the client's teardown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The server answered FIN with FIN|ACK.
    Acknowledged,
    /// No FIN|ACK arrived in time; the connection was closed locally anyway.
    NoReply,
}

/// A handle to a single DRTP connection.
#[derive(Debug)]
pub struct Connection<T> {
    /// Current FSM state.
    pub state: ConnectionState,
    transport: T,
    peer: SocketAddr,
    /// Effective window in segments: negotiated on the client, advertised on
    /// the server.
    window: u16,
    rto: Duration,
}

impl<T: Transport> Connection<T> {
    /// Active open (client side).
    ///
    /// Sends one SYN and waits, bounded by `rto`, for the SYN|ACK.  On success
    /// the effective window is `min(window, advertised)`.
    pub async fn connect(
        transport: T,
        peer: SocketAddr,
        window: u16,
        rto: Duration,
    ) -> Result<Self, ConnError> {
        let mut conn = Self {
            state: ConnectionState::Closed,
            transport,
            peer,
            window,
            rto,
        };

        conn.send(&Packet::control(flags::SYN, 0, window)).await?;
        conn.state = ConnectionState::SynSent;
        log::info!("SYN packet sent to {peer}");

        let Some(reply) = conn.await_reply(flags::SYN | flags::ACK).await? else {
            conn.state = ConnectionState::Closed;
            log::error!("connection failed: no SYN-ACK within {:?}", rto);
            return Err(ConnError::HandshakeFailed);
        };
        log::info!("SYN-ACK packet received (window={})", reply.header.window);

        conn.window = negotiate_window(window, reply.header.window);
        conn.send(&Packet::control(flags::ACK, 0, 0)).await?;
        log::info!("ACK packet sent");

        conn.state = ConnectionState::Established;
        log::info!("connection established, window={}", conn.window);
        Ok(conn)
    }

    /// Passive open (server side).
    ///
    /// Waits without a timeout for a SYN, answers with SYN|ACK advertising
    /// `advertised_window`, then waits for the peer's ACK.  Everything else is
    /// ignored.
    pub async fn accept(
        transport: T,
        advertised_window: u16,
        rto: Duration,
    ) -> Result<Self, ConnError> {
        let mut state = ConnectionState::Listen;
        let mut pending: Option<SocketAddr> = None;

        let peer = loop {
            let Recv::Segment(pkt, from) = transport.recv(None).await? else {
                continue;
            };

            if pkt.has(flags::SYN) {
                log::info!("SYN packet received from {from}");
                let syn_ack = Packet::control(flags::SYN | flags::ACK, 0, advertised_window);
                transport.send_to(&syn_ack, from).await?;
                log::info!("SYN-ACK packet sent");
                state = ConnectionState::SynReceived;
                pending = Some(from);
            } else if pkt.has(flags::ACK)
                && state == ConnectionState::SynReceived
                && pending == Some(from)
            {
                log::info!("ACK packet received");
                break from;
            } else {
                log::debug!(
                    "[{state}] ignoring segment flags={:#05b} from {from}",
                    pkt.header.flags
                );
            }
        };

        log::info!("connection established with {peer}");
        Ok(Self {
            state: ConnectionState::Established,
            transport,
            peer,
            window: advertised_window,
            rto,
        })
    }

    /// Client teardown: send FIN and wait once for FIN|ACK.
    ///
    /// A missing reply is logged, not returned as an error; the connection
    /// ends up [`ConnectionState::Closed`] either way.
    pub async fn close(&mut self) -> Result<Teardown, ConnError> {
        if self.state != ConnectionState::Established {
            return Err(ConnError::BadState(self.state));
        }

        self.send(&Packet::control(flags::FIN, 0, 0)).await?;
        self.state = ConnectionState::FinWait;
        log::info!("FIN packet sent");

        let outcome = match self.await_reply(flags::FIN | flags::ACK).await? {
            Some(_) => {
                log::info!("FIN-ACK packet received");
                Teardown::Acknowledged
            }
            None => {
                log::warn!("no FIN-ACK received");
                Teardown::NoReply
            }
        };

        self.state = ConnectionState::Closed;
        log::info!("connection closed");
        Ok(outcome)
    }

    /// Remote peer address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Effective window in segments.
    pub fn window(&self) -> u16 {
        self.window
    }

    /// Retransmission interval.
    pub fn rto(&self) -> Duration {
        self.rto
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one segment to the peer.
    pub async fn send(&self, packet: &Packet) -> Result<(), ConnError> {
        self.transport.send_to(packet, self.peer).await?;
        Ok(())
    }

    /// Receive the next segment from the peer, waiting at most `timeout`.
    ///
    /// Segments from other addresses are ignored without extending the wait.
    /// Returns `None` on timeout.
    pub async fn recv(&self, timeout: Duration) -> Result<Option<Packet>, ConnError> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.transport.recv(Some(left)).await? {
                Recv::Timeout => return Ok(None),
                Recv::Segment(pkt, from) if from == self.peer => return Ok(Some(pkt)),
                Recv::Segment(_, from) => log::debug!("ignoring segment from foreign peer {from}"),
            }
        }
    }

    /// Wait one retransmission interval for a segment carrying all of `want`.
    async fn await_reply(&self, want: u16) -> Result<Option<Packet>, ConnError> {
        let timer = RetransmitTimer::new(self.rto);
        loop {
            let now = Instant::now();
            if timer.expired(now) {
                return Ok(None);
            }
            match self.recv(timer.remaining(now)).await? {
                Some(pkt) if pkt.has(want) => return Ok(Some(pkt)),
                Some(pkt) => log::debug!(
                    "[{}] ignoring segment flags={:#05b} ack={}",
                    self.state,
                    pkt.header.flags,
                    pkt.header.ack
                ),
                None => return Ok(None),
            }
        }
    }
}

/// Effective window: the smaller of both sides, never below one segment.
pub fn negotiate_window(configured: u16, advertised: u16) -> u16 {
    let window = configured.min(advertised);
    if window == 0 {
        log::warn!("peer advertised a zero window; using 1");
        1
    } else {
        window
    }
}
