//! AEAD chunk stream (SIP004 TCP).
//!
//! Each direction opens with a salt, followed by chunks of
//! `seal(len as u16 BE) || seal(payload)` with `len <= 0x3FFF`. The target
//! address rides in the first client chunk, ahead of the first data.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use futures::ready;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::address::encode_target;
use super::cipher::{CipherError, EncryptionKey, SessionCipher, TAG_LEN};
use super::salt::SaltGenerator;

/// Largest payload carried by one chunk.
pub const MAX_PAYLOAD: usize = 0x3FFF;

const READ_CHUNK: usize = 8 * 1024;

fn cipher_io(e: CipherError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Salt,
    Length,
    Payload(usize),
}

/// Client side of a Shadowsocks connection layered over `S`.
///
/// Nothing is sent at construction. The salt and target address go out with
/// the first `poll_write`, or alone on the first `poll_flush`.
pub struct SsStream<S> {
    inner: S,
    key: Arc<EncryptionKey>,

    enc: SessionCipher,
    header: Option<Vec<u8>>,
    out: Vec<u8>,
    out_pos: usize,

    dec: Option<SessionCipher>,
    state: ReadState,
    rbuf: BytesMut,
    plain: Bytes,
}

impl<S> SsStream<S> {
    pub fn new(
        inner: S,
        key: Arc<EncryptionKey>,
        salt_generator: &dyn SaltGenerator,
        host: &str,
        port: u16,
    ) -> io::Result<Self> {
        let mut salt = vec![0u8; key.salt_len()];
        salt_generator.fill_salt(&mut salt);
        let enc = key.session(&salt).map_err(cipher_io)?;

        let mut header = Vec::with_capacity(1 + 1 + host.len() + 2);
        encode_target(host, port, &mut header)?;

        Ok(Self {
            inner,
            key,
            enc,
            header: Some(header),
            out: salt,
            out_pos: 0,
            dec: None,
            state: ReadState::Salt,
            rbuf: BytesMut::new(),
            plain: Bytes::new(),
        })
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    fn seal_chunk(&mut self, payload: &[u8]) -> io::Result<()> {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        let len = (payload.len() as u16).to_be_bytes();
        let sealed_len = self.enc.seal(&len).map_err(cipher_io)?;
        let sealed = self.enc.seal(payload).map_err(cipher_io)?;
        self.out.extend_from_slice(&sealed_len);
        self.out.extend_from_slice(&sealed);
        Ok(())
    }
}

impl<S: AsyncWrite + Unpin> SsStream<S> {
    fn poll_send_out(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.out_pos < self.out.len() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.out[self.out_pos..]))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.out_pos += n;
        }
        self.out.clear();
        self.out_pos = 0;
        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncRead + Unpin> SsStream<S> {
    /// Read until `rbuf` holds `need` bytes. `false` means EOF came first.
    fn poll_fill(&mut self, cx: &mut Context<'_>, need: usize) -> Poll<io::Result<bool>> {
        let mut tmp = [0u8; READ_CHUNK];
        while self.rbuf.len() < need {
            let mut rb = ReadBuf::new(&mut tmp);
            ready!(Pin::new(&mut self.inner).poll_read(cx, &mut rb))?;
            if rb.filled().is_empty() {
                return Poll::Ready(Ok(false));
            }
            self.rbuf.extend_from_slice(rb.filled());
        }
        Poll::Ready(Ok(true))
    }

    fn open(&mut self, chunk: &[u8]) -> io::Result<Vec<u8>> {
        let dec = self
            .dec
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "chunk before salt"))?;
        dec.open(chunk).map_err(cipher_io)
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for SsStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.plain.is_empty() {
                let n = this.plain.len().min(buf.remaining());
                buf.put_slice(&this.plain[..n]);
                this.plain.advance(n);
                return Poll::Ready(Ok(()));
            }
            if buf.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }

            let need = match this.state {
                ReadState::Salt => this.key.salt_len(),
                ReadState::Length => 2 + TAG_LEN,
                ReadState::Payload(n) => n + TAG_LEN,
            };
            if !ready!(this.poll_fill(cx, need))? {
                // EOF is clean only between chunks.
                if this.rbuf.is_empty() && !matches!(this.state, ReadState::Payload(_)) {
                    return Poll::Ready(Ok(()));
                }
                return Poll::Ready(Err(io::ErrorKind::UnexpectedEof.into()));
            }
            let chunk = this.rbuf.split_to(need);

            match this.state {
                ReadState::Salt => {
                    this.dec = Some(this.key.session(&chunk).map_err(cipher_io)?);
                    this.state = ReadState::Length;
                }
                ReadState::Length => {
                    let len = this.open(&chunk)?;
                    let n = u16::from_be_bytes([len[0], len[1]]) as usize;
                    if n > MAX_PAYLOAD {
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("chunk length {n} exceeds {MAX_PAYLOAD}"),
                        )));
                    }
                    this.state = ReadState::Payload(n);
                }
                ReadState::Payload(_) => {
                    this.plain = Bytes::from(this.open(&chunk)?);
                    this.state = ReadState::Length;
                }
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for SsStream<S> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_send_out(cx))?;
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let n = match this.header.take() {
            Some(mut first) => {
                let n = buf.len().min(MAX_PAYLOAD - first.len());
                first.extend_from_slice(&buf[..n]);
                this.seal_chunk(&first)?;
                n
            }
            None => {
                let n = buf.len().min(MAX_PAYLOAD);
                this.seal_chunk(&buf[..n])?;
                n
            }
        };

        // The chunk is ours now; a Pending send finishes on the next call.
        if let Poll::Ready(Err(e)) = this.poll_send_out(cx) {
            return Poll::Ready(Err(e));
        }
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(header) = this.header.take() {
            this.seal_chunk(&header)?;
        }
        ready!(this.poll_send_out(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(header) = this.header.take() {
            this.seal_chunk(&header)?;
        }
        ready!(this.poll_send_out(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
