use async_trait::async_trait;
use tracing::debug;

use super::FragStream;
use crate::dialer::{DialError, IoStream, StreamDialer};

/// Dials through `inner` and splits the first handshake record written on
/// each new connection at `split_offset` payload bytes.
#[derive(Debug, Clone)]
pub struct TlsFragDialer<D> {
    inner: D,
    split_offset: usize,
}

impl<D: StreamDialer> TlsFragDialer<D> {
    pub fn new(inner: D, split_offset: usize) -> Result<Self, DialError> {
        if split_offset == 0 {
            return Err(DialError::Other("tlsfrag: split offset must be positive".into()));
        }
        Ok(Self {
            inner,
            split_offset,
        })
    }

    pub fn split_offset(&self) -> usize {
        self.split_offset
    }
}

#[async_trait]
impl<D: StreamDialer> StreamDialer for TlsFragDialer<D> {
    async fn connect(&self, host: &str, port: u16) -> Result<IoStream, DialError> {
        let stream = self.inner.connect(host, port).await?;
        debug!(host, port, split_offset = self.split_offset, "tlsfrag: wrapping connection");
        Ok(Box::new(FragStream::new(stream, self.split_offset)))
    }
}
