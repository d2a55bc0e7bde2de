//! Blocking fragmenting writer over any [`std::io::Write`] sink.

use std::io::{self, Read, Write};

use tracing::debug;

use super::plan::{can_decide, logical_len, Availability, SplitPlan, SplitState};
use super::record::{RecordHeader, HEADER_SIZE};

/// Splits the first handshake record written through it into two records.
///
/// Push mode is [`Write::write`]; pull mode is [`FragWriter::read_from`].
/// Both share one [`SplitState`]: whichever runs first makes the one split
/// decision and every later call is a plain pass-through.
///
/// Not synchronised. One writer per connection, driven by one caller.
#[derive(Debug)]
pub struct FragWriter<W> {
    sink: W,
    state: SplitState,
}

impl<W: Write> FragWriter<W> {
    /// `split_offset` is the number of payload bytes placed in the first
    /// fragment. Zero disables splitting.
    pub fn new(sink: W, split_offset: usize) -> Self {
        Self {
            sink,
            state: SplitState::new(split_offset),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.is_armed()
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Drain `source` into the sink, splitting the first record if eligible.
    ///
    /// Returns the number of bytes taken from `source`. Read and write errors
    /// are returned unchanged and leave the writer disarmed. A record that
    /// cannot be read completely is never written, not even in part.
    pub fn read_from<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<u64> {
        let Some(offset) = self.state.disarm() else {
            return io::copy(source, &mut self.sink);
        };

        let mut head = [0u8; HEADER_SIZE];
        source.read_exact(&mut head)?;
        let header = RecordHeader::decode(&head);

        let plan = match SplitPlan::new(header, offset, Availability::OnDemand) {
            Ok(plan) => plan,
            Err(skip) => {
                debug!(?skip, ?header, "tlsfrag: first record passed through");
                self.sink.write_all(&head)?;
                let rest = io::copy(source, &mut self.sink)?;
                return Ok(HEADER_SIZE as u64 + rest);
            }
        };

        let mut buf = plan.record_buffer();
        source.read_exact(&mut buf[plan.first_payload()])?;
        source.read_exact(&mut buf[plan.second_payload()])?;
        self.sink.write_all(&buf)?;
        debug!(offset, record_len = plan.record_len(), "tlsfrag: split first record");

        let written = logical_len(buf.len()) as u64;
        let rest = io::copy(source, &mut self.sink)?;
        Ok(written + rest)
    }
}

impl<W: Write> Write for FragWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let Some(offset) = self.state.disarm() else {
            return self.sink.write(data);
        };
        // Too short to hold a header plus a non-empty first fragment and
        // at least one more byte.
        if !can_decide(data.len(), offset) {
            return self.sink.write(data);
        }
        let Some(header) = RecordHeader::peek(data) else {
            return self.sink.write(data);
        };

        let available = Availability::Buffered(data.len() - HEADER_SIZE);
        match SplitPlan::new(header, offset, available) {
            Ok(plan) => {
                let out = plan.splice(data);
                self.sink.write_all(&out)?;
                debug!(offset, record_len = plan.record_len(), "tlsfrag: split first record");
                Ok(logical_len(out.len()))
            }
            Err(skip) => {
                debug!(?skip, ?header, "tlsfrag: first record passed through");
                self.sink.write(data)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(len: u16, fill: impl Fn(usize) -> u8) -> Vec<u8> {
        let mut out = vec![22, 3, 3];
        out.extend_from_slice(&len.to_be_bytes());
        out.extend((0..usize::from(len)).map(fill));
        out
    }

    /// Accepts at most `limit` bytes per call, then fails once `fail_after`
    /// total bytes have been accepted.
    struct Choppy {
        out: Vec<u8>,
        limit: usize,
        fail_after: usize,
        calls: usize,
    }

    impl Write for Choppy {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.out.len() >= self.fail_after {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            let n = buf.len().min(self.limit).min(self.fail_after - self.out.len());
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn push_splits_sixteen_byte_record_at_four() {
        let input = record(16, |i| i as u8);
        let mut w = FragWriter::new(Vec::new(), 4);

        assert_eq!(w.write(&input).unwrap(), 21);
        assert!(!w.is_armed());

        let out = w.into_inner();
        assert_eq!(out.len(), 26);
        assert_eq!(&out[..5], &[22, 3, 3, 0, 4]);
        assert_eq!(&out[5..9], &input[5..9]);
        assert_eq!(&out[9..14], &[22, 3, 3, 0, 12]);
        assert_eq!(&out[14..], &input[9..]);
    }

    #[test]
    fn push_passes_through_after_first_call() {
        let first = b"GET / HTTP/1.1\r\n".to_vec();
        let second = record(16, |_| 7);
        let mut w = FragWriter::new(Vec::new(), 4);

        w.write_all(&first).unwrap();
        w.write_all(&second).unwrap();

        assert_eq!(w.into_inner(), [first, second].concat());
    }

    #[test]
    fn push_short_buffer_disarms_without_splitting() {
        let input = record(16, |_| 1);
        let mut w = FragWriter::new(Vec::new(), 4);

        // Header plus four bytes: one byte short of the decision threshold.
        assert_eq!(w.write(&input[..9]).unwrap(), 9);
        assert!(!w.is_armed());
        w.write_all(&input[9..]).unwrap();
        assert_eq!(w.into_inner(), input);
    }

    #[test]
    fn huge_offset_passes_through() {
        let input = record(16, |_| 7);
        let mut w = FragWriter::new(Vec::new(), usize::MAX);
        assert_eq!(w.write(&input).unwrap(), input.len());
        assert!(!w.is_armed());
        assert_eq!(w.into_inner(), input);

        let mut w = FragWriter::new(Vec::new(), usize::MAX);
        assert_eq!(w.read_from(&mut Cursor::new(&input)).unwrap(), 21);
        assert_eq!(w.into_inner(), input);
    }

    #[test]
    fn push_write_all_survives_a_choppy_sink() {
        let input = record(40, |i| i as u8);
        let sink = Choppy {
            out: Vec::new(),
            limit: 3,
            fail_after: usize::MAX,
            calls: 0,
        };
        let mut w = FragWriter::new(sink, 10);
        w.write_all(&input).unwrap();

        let out = w.into_inner().out;
        assert_eq!(out.len(), input.len() + HEADER_SIZE);
        assert_eq!(&out[..5], &[22, 3, 3, 0, 10]);
        assert_eq!(&out[15..20], &[22, 3, 3, 0, 30]);
    }

    #[test]
    fn push_error_during_split_is_forwarded_and_disarms() {
        let input = record(16, |_| 9);
        let sink = Choppy {
            out: Vec::new(),
            limit: usize::MAX,
            fail_after: 7,
            calls: 0,
        };
        let mut w = FragWriter::new(sink, 4);

        let err = w.write(&input).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(!w.is_armed());
    }

    #[test]
    fn pull_splits_and_drains_the_rest() {
        let mut input = record(16, |i| 100 + i as u8);
        input.extend_from_slice(b"trailing application data");
        let mut w = FragWriter::new(Vec::new(), 4);

        let moved = w.read_from(&mut Cursor::new(&input)).unwrap();
        assert_eq!(moved, input.len() as u64);

        let out = w.into_inner();
        assert_eq!(out.len(), input.len() + HEADER_SIZE);
        assert_eq!(&out[..5], &[22, 3, 3, 0, 4]);
        assert_eq!(&out[9..14], &[22, 3, 3, 0, 12]);
        assert!(out.ends_with(b"trailing application data"));
    }

    #[test]
    fn pull_short_header_writes_nothing() {
        let mut w = FragWriter::new(Vec::new(), 4);
        let err = w.read_from(&mut Cursor::new([22u8, 3, 3])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(!w.is_armed());
        assert!(w.get_ref().is_empty());
    }

    #[test]
    fn pull_truncated_payload_writes_nothing() {
        let input = record(16, |_| 5);
        let mut w = FragWriter::new(Vec::new(), 4);
        let err = w.read_from(&mut Cursor::new(&input[..12])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(w.get_ref().is_empty());

        // Disarmed: a retry copies verbatim.
        w.read_from(&mut Cursor::new(&input)).unwrap();
        assert_eq!(w.into_inner(), input);
    }

    #[test]
    fn pull_non_handshake_is_copied_verbatim() {
        let mut input = record(16, |_| 0);
        input[0] = 23;
        let mut w = FragWriter::new(Vec::new(), 4);
        assert_eq!(w.read_from(&mut Cursor::new(&input)).unwrap(), 21);
        assert_eq!(w.into_inner(), input);
    }

    #[test]
    fn pull_then_push_is_pass_through() {
        let input = record(16, |_| 3);
        let mut w = FragWriter::new(Vec::new(), 4);
        w.read_from(&mut Cursor::new(&input)).unwrap();
        assert_eq!(w.write(&input).unwrap(), input.len());
        let out = w.into_inner();
        assert_eq!(&out[26..], &input[..]);
    }

    #[test]
    fn sink_sees_a_single_call_for_the_split() {
        let input = record(16, |_| 2);
        let sink = Choppy {
            out: Vec::new(),
            limit: usize::MAX,
            fail_after: usize::MAX,
            calls: 0,
        };
        let mut w = FragWriter::new(sink, 4);
        w.write(&input).unwrap();
        assert_eq!(w.get_ref().calls, 1);
    }
}
