//! # Memory transport / 内存传输
//!
//! A dialer backed by an in-memory duplex pipe, for tests that need a
//! connection without a network. Each dialer connects exactly once.

use async_trait::async_trait;
use tokio::io::{duplex, DuplexStream};
use tokio::sync::Mutex;

use crate::dialer::{DialError, IoStream, StreamDialer};

/// Pipe buffer size, enough for any handshake-sized write in tests.
const PIPE_CAPACITY: usize = 4096;

/// Memory duplex dialer / 内存双工拨号器
///
/// The first `connect` returns the client half of the pipe; later calls
/// fail with [`DialError::NotSupported`]. The address is ignored.
pub struct DuplexDialer {
    /// `Some` until the first connect.
    cli: Mutex<Option<DuplexStream>>,
}

impl DuplexDialer {
    /// Returns the dialer and the server half of its pipe.
    pub fn new_pair() -> (Self, DuplexStream) {
        let (a, b) = duplex(PIPE_CAPACITY);
        (
            Self {
                cli: Mutex::new(Some(a)),
            },
            b,
        )
    }
}

#[async_trait]
impl StreamDialer for DuplexDialer {
    async fn connect(&self, _host: &str, _port: u16) -> Result<IoStream, DialError> {
        let s = self.cli.lock().await.take().ok_or(DialError::NotSupported)?;
        Ok(Box::new(s))
    }
}
