//! Go-Back-N send-side state machine.
//!
//! [`OutgoingBuffer`] holds every data segment of one transfer, framed once
//! from the byte source before the data phase begins.  [`GbnSender`] walks a
//! sliding window of up to `window` unacknowledged segments over it.
//!
//! # Protocol contract
//!
//! - Segments are numbered `1..=total`, contiguously.
//! - At most `window` segments are in flight at once.
//! - ACKs are **cumulative**: `ack = K` confirms every segment `≤ K`.
//! - On timeout the caller retransmits **all** of `base..next` (go back N).
//!
//! This module only manages state; all socket I/O is the caller's responsibility.

use std::ops::Range;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::connection::ConnError;
use crate::packet::{Packet, MAX_PAYLOAD};

/// Largest number of segments in one transfer (the 16-bit sequence space,
/// minus zero which is reserved for control segments).
pub const MAX_SEGMENTS: usize = u16::MAX as usize;

/// Sequence number of the segment at `index` (0-based) in the buffer.
///
/// Returns `None` once the 16-bit sequence space is exhausted; sequence
/// numbers never wrap.
pub fn sequence_for(index: usize) -> Option<u16> {
    u16::try_from(index + 1).ok()
}

// ---------------------------------------------------------------------------
// OutgoingBuffer
// ---------------------------------------------------------------------------

/// Pre-framed data segments for one transfer, indexed by sequence number.
#[derive(Debug, Clone, Default)]
pub struct OutgoingBuffer {
    segments: Vec<Packet>,
    bytes: u64,
}

impl OutgoingBuffer {
    /// Chunk `reader` into [`MAX_PAYLOAD`]-byte segments until EOF.
    ///
    /// Short reads are accumulated, so only the last segment may be short.
    /// An empty source yields an empty buffer.
    pub async fn from_reader<R>(reader: R) -> Result<Self, ConnError>
    where
        R: AsyncRead + Unpin,
    {
        Self::from_reader_with_limit(reader, MAX_SEGMENTS).await
    }

    /// Frame an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ConnError> {
        let count = data.len().div_ceil(MAX_PAYLOAD);
        if count > MAX_SEGMENTS {
            return Err(ConnError::TooManySegments);
        }
        let mut buffer = Self::default();
        for chunk in data.chunks(MAX_PAYLOAD) {
            buffer.push(chunk.to_vec(), MAX_SEGMENTS)?;
        }
        Ok(buffer)
    }

    pub(crate) async fn from_reader_with_limit<R>(
        mut reader: R,
        limit: usize,
    ) -> Result<Self, ConnError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = Self::default();
        loop {
            let mut chunk = vec![0u8; MAX_PAYLOAD];
            let n = read_chunk(&mut reader, &mut chunk).await?;
            if n == 0 {
                break;
            }
            chunk.truncate(n);
            buffer.push(chunk, limit)?;
        }
        Ok(buffer)
    }

    fn push(&mut self, payload: Vec<u8>, limit: usize) -> Result<(), ConnError> {
        let index = self.segments.len();
        let seq = match sequence_for(index) {
            Some(seq) if index < limit => seq,
            _ => return Err(ConnError::TooManySegments),
        };
        self.bytes += payload.len() as u64;
        self.segments.push(Packet::data(seq, payload));
        Ok(())
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total payload bytes across all segments.
    pub fn payload_bytes(&self) -> u64 {
        self.bytes
    }

    /// Segment with sequence number `seq` (1-based).
    pub fn get(&self, seq: u32) -> Option<&Packet> {
        let index = usize::try_from(seq).ok()?.checked_sub(1)?;
        self.segments.get(index)
    }

    /// Segments with sequence numbers in `range`.
    fn slice(&self, range: Range<u32>) -> &[Packet] {
        &self.segments[(range.start as usize - 1)..(range.end as usize - 1)]
    }
}

/// Fill `buf` from `reader`, stopping early only at EOF.
async fn read_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

// ---------------------------------------------------------------------------
// GbnSender
// ---------------------------------------------------------------------------

/// Go-Back-N send-side state for one transfer.
///
/// # Sequence-number layout
///
/// ```text
///  base            next          base + window
///   │                │                │
///  ─┼────────────────┼────────────────┼──────▶ seq space
///   │ <── in flight ▶│ <── sendable ─▶│
/// ```
///
/// `base` and `next` are `u32` so that "one past the last segment" stays
/// representable when the transfer fills the whole 16-bit sequence space.
#[derive(Debug)]
pub struct GbnSender {
    buffer: OutgoingBuffer,
    /// Oldest unacknowledged sequence number (left window edge).
    base: u32,
    /// Next sequence number to send for the first time.
    next: u32,
    /// Maximum number of segments in flight (N).
    window: u32,
}

impl GbnSender {
    /// Create a sender over `buffer` with a fixed window of `window` segments.
    ///
    /// A zero window is treated as one segment.
    pub fn new(buffer: OutgoingBuffer, window: u16) -> Self {
        Self {
            buffer,
            base: 1,
            next: 1,
            window: u32::from(window.max(1)),
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn next(&self) -> u32 {
        self.next
    }

    pub fn window(&self) -> u16 {
        self.window as u16
    }

    /// Number of segments in the transfer.
    pub fn total(&self) -> u32 {
        self.buffer.len() as u32
    }

    pub fn buffer(&self) -> &OutgoingBuffer {
        &self.buffer
    }

    /// `true` once every segment has been cumulatively acknowledged.
    pub fn is_complete(&self) -> bool {
        self.base > self.total()
    }

    /// `true` when the window has room and unsent segments remain.
    pub fn can_send(&self) -> bool {
        self.next < self.base + self.window && self.next <= self.total()
    }

    /// The next segment the window allows to go out, if any.
    ///
    /// Call [`GbnSender::record_sent`] after handing it to the transport.
    pub fn next_sendable(&self) -> Option<&Packet> {
        if self.can_send() {
            self.buffer.get(self.next)
        } else {
            None
        }
    }

    /// Mark the segment returned by [`GbnSender::next_sendable`] as sent.
    pub fn record_sent(&mut self) {
        debug_assert!(self.can_send(), "record_sent on a full or exhausted window");
        self.next += 1;
    }

    /// Number of segments awaiting acknowledgement.
    pub fn in_flight(&self) -> u32 {
        self.next - self.base
    }

    /// Segments `base..next`, oldest first: the go-back-N retransmit set.
    pub fn outstanding(&self) -> &[Packet] {
        self.buffer.slice(self.base..self.next)
    }

    /// Process a cumulative ACK.
    ///
    /// Returns `true` when the ACK slid the window (`base = ack + 1`).  Stale
    /// ACKs below `base` and ACKs for segments never sent are ignored.
    pub fn on_ack(&mut self, ack: u16) -> bool {
        let ack = u32::from(ack);
        if ack < self.base || ack >= self.next {
            return false;
        }
        self.base = ack + 1;
        true
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(segments: usize, window: u16) -> GbnSender {
        let data: Vec<u8> = (0..segments * MAX_PAYLOAD).map(|i| i as u8).collect();
        GbnSender::new(OutgoingBuffer::from_bytes(&data).unwrap(), window)
    }

    fn send_all_allowed(s: &mut GbnSender) -> Vec<u16> {
        let mut sent = Vec::new();
        while let Some(pkt) = s.next_sendable() {
            sent.push(pkt.header.seq);
            s.record_sent();
        }
        sent
    }

    #[test]
    fn chunking_keeps_only_last_segment_short() {
        let data = vec![7u8; 2 * MAX_PAYLOAD + 10];
        let buf = OutgoingBuffer::from_bytes(&data).unwrap();
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.payload_bytes(), data.len() as u64);
        assert_eq!(buf.get(1).unwrap().payload.len(), MAX_PAYLOAD);
        assert_eq!(buf.get(3).unwrap().payload.len(), 10);
        assert_eq!(buf.get(3).unwrap().header.seq, 3);
        assert!(buf.get(0).is_none());
        assert!(buf.get(4).is_none());
    }

    #[tokio::test]
    async fn reader_short_reads_are_accumulated() {
        // A chained reader returns at most one part per read call.
        let data = vec![1u8; 1500];
        let reader = (&data[..700]).chain(&data[700..]);
        let buf = OutgoingBuffer::from_reader(reader).await.unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.get(1).unwrap().payload.len(), MAX_PAYLOAD);
        assert_eq!(buf.get(2).unwrap().payload.len(), 1500 - MAX_PAYLOAD);
    }

    #[tokio::test]
    async fn empty_reader_yields_no_segments() {
        let buf = OutgoingBuffer::from_reader(&b""[..]).await.unwrap();
        assert!(buf.is_empty());
        assert!(GbnSender::new(buf, 3).is_complete());
    }

    #[tokio::test]
    async fn reader_beyond_limit_is_rejected() {
        let data = vec![0u8; 3 * MAX_PAYLOAD + 1];
        let err = OutgoingBuffer::from_reader_with_limit(&data[..], 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnError::TooManySegments));
    }

    #[test]
    fn sequence_space_ends_at_u16_max() {
        assert_eq!(sequence_for(0), Some(1));
        assert_eq!(sequence_for(MAX_SEGMENTS - 1), Some(u16::MAX));
        assert_eq!(sequence_for(MAX_SEGMENTS), None);
    }

    #[test]
    fn initial_window_fill_sends_first_three() {
        let mut s = sender(5, 3);
        assert_eq!(send_all_allowed(&mut s), vec![1, 2, 3]);
        assert!(!s.can_send());
        assert_eq!(s.in_flight(), 3);
    }

    #[test]
    fn ack_for_first_releases_fourth() {
        let mut s = sender(5, 3);
        send_all_allowed(&mut s);

        assert!(s.on_ack(1));
        assert_eq!(s.base(), 2);
        assert_eq!(send_all_allowed(&mut s), vec![4]);
    }

    #[test]
    fn cumulative_ack_slides_multiple() {
        let mut s = sender(5, 3);
        send_all_allowed(&mut s);

        assert!(s.on_ack(3));
        assert_eq!(s.base(), 4);
        assert_eq!(s.in_flight(), 0);
        assert_eq!(send_all_allowed(&mut s), vec![4, 5]);
    }

    #[test]
    fn stale_ack_is_ignored() {
        let mut s = sender(5, 3);
        send_all_allowed(&mut s);
        assert!(s.on_ack(2));

        assert!(!s.on_ack(1));
        assert!(!s.on_ack(2));
        assert_eq!(s.base(), 3);
    }

    #[test]
    fn ack_beyond_next_is_ignored() {
        let mut s = sender(5, 3);
        send_all_allowed(&mut s);

        assert!(!s.on_ack(4));
        assert_eq!(s.base(), 1);
    }

    #[test]
    fn outstanding_is_base_through_next_minus_one() {
        let mut s = sender(5, 3);
        send_all_allowed(&mut s);
        s.on_ack(1);
        send_all_allowed(&mut s);

        let seqs: Vec<u16> = s.outstanding().iter().map(|p| p.header.seq).collect();
        assert_eq!(seqs, vec![2, 3, 4]);
    }

    #[test]
    fn window_never_exceeds_total() {
        let mut s = sender(2, 5);
        assert_eq!(send_all_allowed(&mut s), vec![1, 2]);
        assert!(s.on_ack(2));
        assert!(s.is_complete());
        assert!(s.outstanding().is_empty());
    }

    #[test]
    fn zero_window_sends_one_at_a_time() {
        let mut s = sender(3, 0);
        assert_eq!(s.window(), 1);
        assert_eq!(send_all_allowed(&mut s), vec![1]);
    }
}
