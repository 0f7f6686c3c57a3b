//! Helpers shared by the integration tests.
//!
//! A [`ScriptedPeer`] is a bare [`Socket`] driven by hand from the test body,
//! so the test can observe and shape every datagram the code under test
//! exchanges with it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use drtp::packet::{flags, Packet};
use drtp::{Recv, Socket, Transport};

/// Generous upper bound for anything that should happen "promptly".
pub const PATIENCE: Duration = Duration::from_secs(5);

/// Bind a socket to an OS-assigned port on loopback.
pub async fn ephemeral() -> Socket {
    let addr = "127.0.0.1:0".parse().unwrap();
    Socket::bind(addr).await.expect("bind failed")
}

/// Deterministic test payload: `len` bytes that differ between segments.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub struct ScriptedPeer {
    pub socket: Socket,
}

impl ScriptedPeer {
    pub async fn bind() -> Self {
        Self {
            socket: ephemeral().await,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    pub async fn send(&self, packet: &Packet, to: SocketAddr) {
        self.socket.send_to(packet, to).await.expect("peer send");
    }

    /// Next segment within `wait`, or `None`.
    pub async fn recv(&self, wait: Duration) -> Option<(Packet, SocketAddr)> {
        match self.socket.recv(Some(wait)).await.expect("peer recv") {
            Recv::Segment(pkt, from) => Some((pkt, from)),
            Recv::Timeout => None,
        }
    }

    /// Next segment, failing the test if none arrives within [`PATIENCE`].
    pub async fn expect(&self) -> (Packet, SocketAddr) {
        self.recv(PATIENCE).await.expect("expected a segment")
    }

    /// Play the server side of the handshake; returns the client's address.
    pub async fn accept_handshake(&self, window: u16) -> SocketAddr {
        let (syn, client) = self.expect().await;
        assert!(syn.has(flags::SYN), "first segment must be SYN");
        self.send(&Packet::control(flags::SYN | flags::ACK, 0, window), client)
            .await;
        let (ack, _) = self.expect().await;
        assert_eq!(ack.header.flags, flags::ACK, "handshake must end with a pure ACK");
        client
    }

    /// Play the client side of the handshake against `server`.
    pub async fn connect_handshake(&self, server: SocketAddr) -> u16 {
        self.send(&Packet::control(flags::SYN, 0, 0), server).await;
        let (syn_ack, _) = self.expect().await;
        assert!(syn_ack.has(flags::SYN | flags::ACK));
        self.send(&Packet::control(flags::ACK, 0, 0), server).await;
        syn_ack.header.window
    }

    /// Receive data segments until `n` have arrived; returns their sequence
    /// numbers in arrival order.
    pub async fn expect_data(&self, n: usize) -> Vec<u16> {
        let mut seqs = Vec::with_capacity(n);
        while seqs.len() < n {
            let (pkt, _) = self.expect().await;
            assert!(!pkt.is_control(), "unexpected control segment {pkt:?}");
            seqs.push(pkt.header.seq);
        }
        seqs
    }
}
