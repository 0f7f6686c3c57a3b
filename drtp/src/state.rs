//! Connection finite-state machine (FSM) types.
//!
//! This module defines every state a [`crate::connection::Connection`] can
//! occupy.  Transitions live in [`crate::connection`] (handshake, client
//! teardown) and [`crate::gbn_connection`] (server teardown).
//!
//! ```text
//!  client:  CLOSED ──SYN──▶ SYN_SENT ──SYN|ACK / ACK──▶ ESTABLISHED
//!  server:  LISTEN ──SYN / SYN|ACK──▶ SYN_RCVD ──ACK──▶ ESTABLISHED
//!
//!  client:  ESTABLISHED ──FIN──▶ FIN_WAIT ──FIN|ACK or timeout──▶ CLOSED
//!  server:  ESTABLISHED ──FIN / FIN|ACK──▶ CLOSED
//! ```

/// All possible states of the connection FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection exists; initial client state and final state of both.
    #[default]
    Closed,
    /// Server is waiting for a SYN.
    Listen,
    /// SYN has been sent; waiting for SYN|ACK.
    SynSent,
    /// SYN received and SYN|ACK sent; waiting for ACK.
    SynReceived,
    /// Handshake complete; data transfer in progress.
    Established,
    /// Client sent FIN; waiting for FIN|ACK.
    FinWait,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Closed => "CLOSED",
            Self::Listen => "LISTEN",
            Self::SynSent => "SYN_SENT",
            Self::SynReceived => "SYN_RCVD",
            Self::Established => "ESTABLISHED",
            Self::FinWait => "FIN_WAIT",
        };
        f.write_str(name)
    }
}
