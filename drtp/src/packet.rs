//! Wire-format definitions for DRTP segments.
//!
//! Every datagram exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (header fields, flags, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`].
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        Sequence Number        |     Acknowledgment Number     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |             Flags             |            Window             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                   Payload (0..=992 bytes) ...                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! There is no checksum; corruption detection is left to UDP.

use thiserror::Error;

/// Bit-flag constants for the `flags` header field.
pub mod flags {
    /// Finish: the client has no more data to send.
    pub const FIN: u16 = 0b001;
    /// Acknowledgement field is valid.
    pub const ACK: u16 = 0b010;
    /// Synchronise (handshake initiation).
    pub const SYN: u16 = 0b100;
}

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 8;

/// Largest payload carried by a single segment.
pub const MAX_PAYLOAD: usize = 992;

/// Largest datagram on the wire (header + payload).
pub const MAX_DATAGRAM: usize = HEADER_LEN + MAX_PAYLOAD;

const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 2;
const OFF_FLAGS: usize = 4;
const OFF_WINDOW: usize = 6;

/// Fixed-size protocol header, in host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Sequence number of a data segment (1-based); `0` on control segments.
    pub seq: u16,
    /// Highest in-order sequence number the receiver has accepted.
    pub ack: u16,
    /// Bitmask of [`flags`] constants.
    pub flags: u16,
    /// Advertised window, in segments.
    pub window: u16,
}

impl Header {
    /// `true` when every bit of `flag` is set.
    pub fn has(&self, flag: u16) -> bool {
        self.flags & flag == flag
    }
}

/// Serialise the four header fields into their 8-byte wire form.
pub fn encode_header(seq: u16, ack: u16, flags: u16, window: u16) -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    buf[OFF_SEQ..OFF_SEQ + 2].copy_from_slice(&seq.to_be_bytes());
    buf[OFF_ACK..OFF_ACK + 2].copy_from_slice(&ack.to_be_bytes());
    buf[OFF_FLAGS..OFF_FLAGS + 2].copy_from_slice(&flags.to_be_bytes());
    buf[OFF_WINDOW..OFF_WINDOW + 2].copy_from_slice(&window.to_be_bytes());
    buf
}

/// Parse an 8-byte header.
pub fn decode_header(buf: &[u8; HEADER_LEN]) -> Header {
    Header {
        seq: u16::from_be_bytes([buf[OFF_SEQ], buf[OFF_SEQ + 1]]),
        ack: u16::from_be_bytes([buf[OFF_ACK], buf[OFF_ACK + 1]]),
        flags: u16::from_be_bytes([buf[OFF_FLAGS], buf[OFF_FLAGS + 1]]),
        window: u16::from_be_bytes([buf[OFF_WINDOW], buf[OFF_WINDOW + 1]]),
    }
}

/// A complete protocol datagram: header + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Packet {
    /// A payload-less control segment (SYN, SYN|ACK, ACK, FIN, FIN|ACK).
    pub fn control(flags: u16, ack: u16, window: u16) -> Self {
        Self {
            header: Header {
                seq: 0,
                ack,
                flags,
                window,
            },
            payload: Vec::new(),
        }
    }

    /// A data segment. Data segments carry no flags.
    pub fn data(seq: u16, payload: Vec<u8>) -> Self {
        Self {
            header: Header {
                seq,
                ack: 0,
                flags: 0,
                window: 0,
            },
            payload,
        }
    }

    /// Cumulative acknowledgement of every segment up to and including `seq`.
    pub fn ack(seq: u16) -> Self {
        Self::control(flags::ACK, seq, 0)
    }

    /// `true` when every bit of `flag` is set in the header.
    pub fn has(&self, flag: u16) -> bool {
        self.header.has(flag)
    }

    /// `true` for segments that open or close a connection.
    pub fn is_control(&self) -> bool {
        self.header.flags & (flags::SYN | flags::FIN) != 0
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLarge(self.payload.len()));
        }
        let h = &self.header;
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&encode_header(h.seq, h.ack, h.flags, h.window));
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parse a [`Packet`] from a raw datagram.
    ///
    /// Everything after the header is payload.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::BufferTooShort(buf.len()));
        }
        if buf.len() > MAX_DATAGRAM {
            return Err(PacketError::DatagramTooLarge(buf.len()));
        }
        let (head, payload) = buf.split_at(HEADER_LEN);
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(head);
        Ok(Packet {
            header: decode_header(&header),
            payload: payload.to_vec(),
        })
    }
}

/// Errors that can arise when framing or parsing a datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    #[error("datagram of {0} bytes is too short to contain a header")]
    BufferTooShort(usize),
    /// Received datagram longer than [`MAX_DATAGRAM`].
    #[error("datagram of {0} bytes exceeds the 1000-byte limit")]
    DatagramTooLarge(usize),
    /// Payload longer than [`MAX_PAYLOAD`] handed to the encoder.
    #[error("payload of {0} bytes exceeds the 992-byte limit")]
    PayloadTooLarge(usize),
}
