//! Go-Back-N receive-side state machine.
//!
//! [`GbnReceiver`] implements the receiver side of Go-Back-N:
//!
//! - Only **in-order** segments are accepted (`seq == expected`).
//! - Out-of-order, duplicate and from-the-future segments are **silently
//!   discarded**: no ACK, no buffering.  Recovery relies entirely on the
//!   sender's window retransmission.
//! - Each accepted segment is acknowledged with `ack = seq`.
//!
//! For fault injection the receiver can be told to drop one specific
//! sequence number exactly once ([`GbnReceiver::with_discard`]).
//!
//! This module only manages state; all socket I/O is the caller's
//! responsibility.

/// What the receiver decided about one data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// In order: write the payload and acknowledge it.
    Accepted,
    /// In order, but dropped once on purpose to simulate loss.
    Discarded,
    /// Not the expected sequence number; dropped without acknowledgement.
    OutOfOrder { expected: u32 },
}

/// Go-Back-N receive-side state for one connection.
#[derive(Debug)]
pub struct GbnReceiver {
    /// Next sequence number that will be accepted.
    ///
    /// `u32` so it can move one past the last 16-bit sequence number.
    expected: u32,

    /// Sequence number still to be dropped once, if any.
    pending_discard: Option<u16>,

    accepted: u64,
    out_of_order: u64,
    discarded: u64,
}

impl Default for GbnReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl GbnReceiver {
    /// Create a receiver expecting sequence number 1.
    pub fn new() -> Self {
        Self {
            expected: 1,
            pending_discard: None,
            accepted: 0,
            out_of_order: 0,
            discarded: 0,
        }
    }

    /// Create a receiver that drops `discard` the first time it arrives in
    /// order.
    pub fn with_discard(discard: Option<u16>) -> Self {
        Self {
            pending_discard: discard,
            ..Self::new()
        }
    }

    /// Decide what to do with data segment `seq`.
    pub fn on_segment(&mut self, seq: u16) -> Delivery {
        if u32::from(seq) != self.expected {
            self.out_of_order += 1;
            return Delivery::OutOfOrder {
                expected: self.expected,
            };
        }
        if self.pending_discard == Some(seq) {
            self.pending_discard = None;
            self.discarded += 1;
            return Delivery::Discarded;
        }
        self.expected += 1;
        self.accepted += 1;
        Delivery::Accepted
    }

    /// Next sequence number that will be accepted.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Sequence number still to be dropped once, if any.
    pub fn pending_discard(&self) -> Option<u16> {
        self.pending_discard
    }

    /// Segments accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Segments dropped for arriving out of order.
    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    /// Segments dropped by fault injection (at most one).
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
