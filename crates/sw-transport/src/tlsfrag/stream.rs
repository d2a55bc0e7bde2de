//! Async fragmenting stream for live connections.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::poll_fn;
use futures::ready;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tracing::debug;

use super::plan::{can_decide, logical_len, Availability, SplitPlan, SplitState};
use super::record::{RecordHeader, HEADER_SIZE};

/// Spliced record that the inner stream has not fully accepted yet.
#[derive(Debug)]
struct Staged {
    buf: Vec<u8>,
    pos: usize,
}

/// Wraps a connection so its first outgoing handshake record is split in two.
///
/// Reads are untouched. On the write side this is the async form of
/// [`FragWriter`](super::FragWriter): `poll_write` is push mode and
/// [`FragStream::copy_from`] is pull mode, sharing one [`SplitState`].
///
/// A split record is taken whole: `poll_write` reports the caller's buffer
/// as written once the spliced copy is staged, and whatever the inner stream
/// has not accepted yet is sent ahead of the next `poll_write`, `poll_flush`
/// or `poll_shutdown`. Errors from that drain surface on the call that hits
/// them.
#[derive(Debug)]
pub struct FragStream<S> {
    inner: S,
    state: SplitState,
    pending: Option<Staged>,
}

impl<S> FragStream<S> {
    pub fn new(inner: S, split_offset: usize) -> Self {
        Self {
            inner,
            state: SplitState::new(split_offset),
            pending: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state.is_armed()
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncWrite + Unpin> FragStream<S> {
    /// Push what is left of a staged split record.
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let Self { inner, pending, .. } = self;
        let Some(p) = pending.as_mut() else {
            return Poll::Ready(Ok(()));
        };
        while p.pos < p.buf.len() {
            match ready!(Pin::new(&mut *inner).poll_write(cx, &p.buf[p.pos..])) {
                Ok(0) => {
                    *pending = None;
                    return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
                }
                Ok(n) => p.pos += n,
                Err(e) => {
                    *pending = None;
                    return Poll::Ready(Err(e));
                }
            }
        }
        *pending = None;
        Poll::Ready(Ok(()))
    }

    /// Drain `source` into the stream, splitting the first record if eligible.
    ///
    /// Returns the number of bytes taken from `source`. Errors are returned
    /// unchanged and leave the stream disarmed; a record that cannot be read
    /// completely is never written.
    pub async fn copy_from<R>(&mut self, source: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        poll_fn(|cx| self.poll_drain(cx)).await?;

        let Some(offset) = self.state.disarm() else {
            return tokio::io::copy(source, &mut self.inner).await;
        };

        let mut head = [0u8; HEADER_SIZE];
        source.read_exact(&mut head).await?;
        let header = RecordHeader::decode(&head);

        let plan = match SplitPlan::new(header, offset, Availability::OnDemand) {
            Ok(plan) => plan,
            Err(skip) => {
                debug!(?skip, ?header, "tlsfrag: first record passed through");
                self.inner.write_all(&head).await?;
                let rest = tokio::io::copy(source, &mut self.inner).await?;
                return Ok(HEADER_SIZE as u64 + rest);
            }
        };

        let mut buf = plan.record_buffer();
        source.read_exact(&mut buf[plan.first_payload()]).await?;
        source.read_exact(&mut buf[plan.second_payload()]).await?;
        self.inner.write_all(&buf).await?;
        debug!(offset, record_len = plan.record_len(), "tlsfrag: split first record");

        let written = logical_len(buf.len()) as u64;
        let rest = tokio::io::copy(source, &mut self.inner).await?;
        Ok(written + rest)
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for FragStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for FragStream<S> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;

        let Some(offset) = this.state.disarm() else {
            return Pin::new(&mut this.inner).poll_write(cx, buf);
        };
        if !can_decide(buf.len(), offset) {
            return Pin::new(&mut this.inner).poll_write(cx, buf);
        }
        let Some(header) = RecordHeader::peek(buf) else {
            return Pin::new(&mut this.inner).poll_write(cx, buf);
        };

        match SplitPlan::new(header, offset, Availability::Buffered(buf.len() - HEADER_SIZE)) {
            Ok(plan) => {
                debug!(offset, record_len = plan.record_len(), "tlsfrag: split first record");
                let spliced = plan.splice(buf);
                let logical = logical_len(spliced.len());
                this.pending = Some(Staged { buf: spliced, pos: 0 });
                // The record is ours now; a Pending drain finishes on the next call.
                if let Poll::Ready(Err(e)) = this.poll_drain(cx) {
                    return Poll::Ready(Err(e));
                }
                Poll::Ready(Ok(logical))
            }
            Err(skip) => {
                debug!(?skip, ?header, "tlsfrag: first record passed through");
                Pin::new(&mut this.inner).poll_write(cx, buf)
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
