//! `drtp`: a reliable file transfer protocol (DRTP) implemented over UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐   data segments   ┌──────────┐
//!  │  client  │──────────────────▶│  server  │
//!  │ GbnSender│                   │GbnReceiver──▶ file
//!  └────┬─────┘                   └─────┬────┘
//!       │◀──────── cumulative ACKs ─────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │           Connection              │
//!  │ (handshake FSM + teardown + peer) │
//!  └────┬──────────────────────────────┘
//!       │ Transport: send_to / recv(timeout)
//!  ┌────▼──────┐  ┌───────────┐
//!  │  Socket   │◀─│ Simulator │  (optional loss / duplication)
//!  └───────────┘  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]: 8-byte header codec and segment framing
//! - [`timer`]: the single retransmission timer
//! - [`socket`]: the [`socket::Transport`] seam and its UDP implementation
//! - [`simulator`]: fault-injecting transport wrapper
//! - [`state`]: finite-state-machine types
//! - [`connection`]: handshake and client teardown
//! - [`gbn_sender`]: outgoing segment buffer and sliding window
//! - [`gbn_receiver`]: in-order sequencing with optional discard-once
//! - [`gbn_connection`]: the Go-Back-N data phase for both roles
//! - [`throughput`]: effective bitrate of a transfer
//! - [`config`]: run-time settings and protocol constants
//! - [`client`] / [`server`]: one complete run of each role

pub mod client;
pub mod config;
pub mod connection;
pub mod gbn_connection;
pub mod gbn_receiver;
pub mod gbn_sender;
pub mod packet;
pub mod server;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod throughput;
pub mod timer;

pub use connection::{ConnError, Connection, Teardown};
pub use socket::{Recv, Socket, Transport};
