//! Go-Back-N data phase on top of an established [`Connection`].
//!
//! # Architecture
//!
//! ```text
//!  byte source                                   byte sink
//!      │ OutgoingBuffer                              ▲
//!      ▼                                             │ in-order payloads
//!  GbnConnection::transmit        GbnConnection::receive_into
//!    ├── GbnSender  (window)        ├── GbnReceiver (expected seq)
//!    ├── RetransmitTimer            ├── ThroughputMeter
//!    └── Connection ──datagrams──▶  └── Connection
//! ```
//!
//! The client calls [`GbnConnection::transmit`] and then
//! [`GbnConnection::close`]; the server calls
//! [`GbnConnection::receive_into`], which returns once the client's FIN has
//! been answered.
//!
//! ```ignore
//! let buffer = OutgoingBuffer::from_reader(file).await?;
//! let mut gbn = GbnConnection::connect(socket, server, 3, RETRANSMIT_TIMEOUT).await?;
//! gbn.transmit(buffer).await?;
//! gbn.close().await?;
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::connection::{ConnError, Connection, Teardown};
use crate::gbn_receiver::{Delivery, GbnReceiver};
use crate::gbn_sender::{GbnSender, OutgoingBuffer};
use crate::packet::{flags, Packet};
use crate::socket::Transport;
use crate::state::ConnectionState;
use crate::throughput::{Throughput, ThroughputMeter};
use crate::timer::RetransmitTimer;

/// Counters from one completed send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Segments in the transfer.
    pub segments: u32,
    /// Payload bytes in the transfer.
    pub bytes: u64,
    /// Window used for the transfer.
    pub window: u16,
    /// Datagrams sent, first transmissions and retransmissions together.
    pub transmissions: u64,
    /// Datagrams re-sent after a timeout.
    pub retransmissions: u64,
    /// Timer expiries.
    pub timeouts: u64,
}

/// Outcome of one completed receive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceiveReport {
    /// Segments written to the sink.
    pub segments: u64,
    /// Payload bytes written to the sink.
    pub bytes: u64,
    /// Segments dropped for arriving out of order.
    pub out_of_order: u64,
    /// Segments dropped by fault injection.
    pub discarded: u64,
    pub throughput: Throughput,
}

/// A connection in its data phase.
#[derive(Debug)]
pub struct GbnConnection<T> {
    conn: Connection<T>,
}

impl<T: Transport> GbnConnection<T> {
    /// Wrap an already-established [`Connection`].
    pub fn from_connection(conn: Connection<T>) -> Self {
        Self { conn }
    }

    /// Active open followed by [`GbnConnection::from_connection`].
    pub async fn connect(
        transport: T,
        peer: SocketAddr,
        window: u16,
        rto: Duration,
    ) -> Result<Self, ConnError> {
        let conn = Connection::connect(transport, peer, window, rto).await?;
        Ok(Self::from_connection(conn))
    }

    /// Passive open followed by [`GbnConnection::from_connection`].
    pub async fn accept(
        transport: T,
        advertised_window: u16,
        rto: Duration,
    ) -> Result<Self, ConnError> {
        let conn = Connection::accept(transport, advertised_window, rto).await?;
        Ok(Self::from_connection(conn))
    }

    /// Current FSM state.
    pub fn state(&self) -> ConnectionState {
        self.conn.state
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection<T> {
        &self.conn
    }

    /// Deliver every segment of `buffer` using Go-Back-N.
    ///
    /// Returns once every segment has been cumulatively acknowledged.
    /// Timeouts, stale ACKs and lost segments are absorbed here; only
    /// transport failures are returned.
    pub async fn transmit(&mut self, buffer: OutgoingBuffer) -> Result<TransferStats, ConnError> {
        if self.conn.state != ConnectionState::Established {
            return Err(ConnError::BadState(self.conn.state));
        }

        let mut sender = GbnSender::new(buffer, self.conn.window());
        let mut stats = TransferStats {
            segments: sender.total(),
            bytes: sender.buffer().payload_bytes(),
            window: sender.window(),
            ..TransferStats::default()
        };
        let mut timer = RetransmitTimer::new(self.conn.rto());

        while !sender.is_complete() {
            while let Some(pkt) = sender.next_sendable() {
                self.conn.send(pkt).await?;
                log::info!(
                    "packet with seq = {} sent, sliding window = {}",
                    pkt.header.seq,
                    window_label(sender.base(), sender.next())
                );
                sender.record_sent();
                stats.transmissions += 1;
            }

            let now = Instant::now();
            let reply = if timer.expired(now) {
                None
            } else {
                self.conn.recv(timer.remaining(now)).await?
            };

            match reply {
                Some(pkt) if pkt.has(flags::ACK) && !pkt.is_control() => {
                    log::info!("ACK for packet = {} received", pkt.header.ack);
                    if sender.on_ack(pkt.header.ack) {
                        timer.start();
                    }
                }
                Some(pkt) => log::debug!(
                    "ignoring segment seq={} flags={:#05b} during transfer",
                    pkt.header.seq,
                    pkt.header.flags
                ),
                None => {
                    stats.timeouts += 1;
                    log::info!("timeout, retransmitting {} packet(s)", sender.in_flight());
                    for pkt in sender.outstanding() {
                        self.conn.send(pkt).await?;
                        log::info!("retransmitting packet with seq = {}", pkt.header.seq);
                        stats.retransmissions += 1;
                        stats.transmissions += 1;
                    }
                    timer.start();
                }
            }
        }

        Ok(stats)
    }

    /// Receive in-order payloads into `sink` until the peer's FIN.
    ///
    /// Answers the FIN with FIN|ACK and leaves the connection
    /// [`ConnectionState::Closed`].  A quiet poll interval is not an error;
    /// the loop simply keeps listening.
    pub async fn receive_into<W>(
        &mut self,
        sink: &mut W,
        mut receiver: GbnReceiver,
    ) -> Result<ReceiveReport, ConnError>
    where
        W: AsyncWrite + Unpin,
    {
        if self.conn.state != ConnectionState::Established {
            return Err(ConnError::BadState(self.conn.state));
        }

        let mut meter = ThroughputMeter::new();

        loop {
            let Some(pkt) = self.conn.recv(self.conn.rto()).await? else {
                continue;
            };

            if pkt.has(flags::FIN) {
                meter.stop(Instant::now());
                log::info!("FIN packet received");
                self.conn
                    .send(&Packet::control(flags::FIN | flags::ACK, 0, 0))
                    .await?;
                log::info!("FIN-ACK packet sent");
                self.conn.state = ConnectionState::Closed;
                break;
            }
            if pkt.has(flags::SYN) {
                log::debug!("ignoring SYN during transfer");
                continue;
            }

            let seq = pkt.header.seq;
            match receiver.on_segment(seq) {
                Delivery::Accepted => {
                    sink.write_all(&pkt.payload).await?;
                    meter.record(pkt.payload.len(), Instant::now());
                    log::info!("packet {seq} received");
                    self.conn.send(&Packet::ack(seq)).await?;
                    log::info!("sending ACK for {seq}");
                }
                Delivery::Discarded => {
                    log::info!("discarding packet {seq} to test retransmission");
                }
                Delivery::OutOfOrder { expected } => {
                    log::info!("out-of-order packet {seq} received (expected {expected})");
                }
            }
        }

        sink.flush().await?;

        Ok(ReceiveReport {
            segments: receiver.accepted(),
            bytes: meter.bytes(),
            out_of_order: receiver.out_of_order(),
            discarded: receiver.discarded(),
            throughput: meter.report(),
        })
    }

    /// Client teardown; see [`Connection::close`].
    pub async fn close(&mut self) -> Result<Teardown, ConnError> {
        self.conn.close().await
    }
}

/// `{base, ..., seq}` where `seq` is the segment being sent.
fn window_label(base: u32, seq: u32) -> String {
    let seqs: Vec<String> = (base..=seq).map(|s| s.to_string()).collect();
    format!("{{{}}}", seqs.join(", "))
}
