//! Split decision for the first record of a connection.
//!
//! Pure logic shared by the blocking [`FragWriter`](super::FragWriter) and the
//! async [`FragStream`](super::FragStream); neither path touches I/O here.

use std::num::NonZeroUsize;
use std::ops::Range;

use super::record::{RecordHeader, HEADER_SIZE, MAX_FRAGMENT_PAYLOAD};

/// One-shot split state.
///
/// Starts `Armed` with the configured offset and ends `Disarmed` after the
/// first decision. [`SplitState::disarm`] is the only way to read the offset,
/// so every code path that looks at it also disarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitState {
    Armed { offset: NonZeroUsize },
    Disarmed,
}

impl SplitState {
    /// A zero offset can never produce two non-empty fragments, so it starts disarmed.
    pub fn new(offset: usize) -> Self {
        NonZeroUsize::new(offset).map_or(Self::Disarmed, |offset| Self::Armed { offset })
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }

    /// Move to `Disarmed`, returning the offset if this was the armed call.
    pub fn disarm(&mut self) -> Option<usize> {
        match std::mem::replace(self, Self::Disarmed) {
            Self::Armed { offset } => Some(offset.get()),
            Self::Disarmed => None,
        }
    }
}

/// How much of the record payload the caller can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Push mode: this many payload bytes follow the header in the buffer.
    Buffered(usize),
    /// Pull mode: the payload is read from the source on demand.
    OnDemand,
}

/// Why a record is passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NotHandshake,
    Oversized,
    /// The offset leaves no room for a non-empty second fragment.
    OffsetOutOfRange,
    /// Push mode only: the whole record is not in this buffer.
    PartialRecord,
}

/// An accepted split of one record into two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPlan {
    header: RecordHeader,
    offset: u16,
}

impl SplitPlan {
    /// Decide whether `header` is split at `offset`. Checks run in a fixed
    /// order and the first failing one names the reason.
    pub fn new(header: RecordHeader, offset: usize, available: Availability) -> Result<Self, Skip> {
        if !header.is_handshake() {
            return Err(Skip::NotHandshake);
        }
        if header.payload_len() > MAX_FRAGMENT_PAYLOAD {
            return Err(Skip::Oversized);
        }
        let offset = u16::try_from(offset)
            .ok()
            .filter(|offset| *offset < header.length)
            .ok_or(Skip::OffsetOutOfRange)?;
        if let Availability::Buffered(n) = available {
            if n < header.payload_len() {
                return Err(Skip::PartialRecord);
            }
        }
        Ok(Self { header, offset })
    }

    pub fn offset(&self) -> usize {
        usize::from(self.offset)
    }

    pub fn record_len(&self) -> usize {
        self.header.payload_len()
    }

    pub fn first_header(&self) -> RecordHeader {
        self.header.with_length(self.offset)
    }

    pub fn second_header(&self) -> RecordHeader {
        self.header.with_length(self.header.length - self.offset)
    }

    /// Rewrite a buffer that starts with the planned record.
    ///
    /// `data` must hold the header and at least the whole payload, which
    /// [`Availability::Buffered`] guarantees. Bytes past the record are
    /// appended unmodified. The result is exactly `HEADER_SIZE` longer.
    pub fn splice(&self, data: &[u8]) -> Vec<u8> {
        let payload = &data[HEADER_SIZE..];
        let (first, rest) = payload.split_at(self.offset());
        let mut out = Vec::with_capacity(data.len() + HEADER_SIZE);
        out.extend_from_slice(&self.first_header().encode());
        out.extend_from_slice(first);
        out.extend_from_slice(&self.second_header().encode());
        out.extend_from_slice(rest);
        out
    }

    /// Buffer for the pull path: both headers already in place, payload
    /// slots zeroed. Fill [`first_payload`](Self::first_payload) and
    /// [`second_payload`](Self::second_payload) from the source.
    pub fn record_buffer(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.record_len() + 2 * HEADER_SIZE];
        buf[..HEADER_SIZE].copy_from_slice(&self.first_header().encode());
        let second = self.first_payload().end;
        buf[second..second + HEADER_SIZE].copy_from_slice(&self.second_header().encode());
        buf
    }

    pub fn first_payload(&self) -> Range<usize> {
        HEADER_SIZE..HEADER_SIZE + self.offset()
    }

    pub fn second_payload(&self) -> Range<usize> {
        self.first_payload().end + HEADER_SIZE..self.record_len() + 2 * HEADER_SIZE
    }
}

/// Push mode: whether a buffer of `len` bytes can hold a header, a
/// non-empty first fragment of `offset` bytes and at least one more byte.
pub fn can_decide(len: usize, offset: usize) -> bool {
    len.saturating_sub(HEADER_SIZE) > offset
}

/// Bytes of the caller's input represented by `physical` bytes written
/// downstream after a split added one header.
pub fn logical_len(physical: usize) -> usize {
    physical.saturating_sub(HEADER_SIZE)
}
