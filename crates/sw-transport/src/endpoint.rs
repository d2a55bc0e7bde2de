//! Fixed-destination endpoints: a dialer bound to one `host:port`.

use std::fmt;
use std::sync::Arc;

use crate::dialer::{BoxPacketConn, DialError, IoStream, PacketDialer, StreamDialer};

/// Split `"host:port"` into its parts. IPv6 hosts must be bracketed
/// (`"[::1]:53"`); the brackets are removed from the returned host.
pub fn split_host_port(addr: &str) -> Result<(String, u16), DialError> {
    let invalid = || DialError::Other(format!("invalid address {addr:?}: expected host:port"));
    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
        (host, tail.strip_prefix(':').ok_or_else(invalid)?)
    } else {
        let (host, port) = addr.rsplit_once(':').ok_or_else(invalid)?;
        if host.contains(':') {
            return Err(invalid());
        }
        (host, port)
    };
    if host.is_empty() {
        return Err(invalid());
    }
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    Ok((host.to_string(), port))
}

/// Join a host and port, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// A [`StreamDialer`] that always dials the same address.
#[derive(Clone)]
pub struct StreamEndpoint {
    dialer: Arc<dyn StreamDialer>,
    host: String,
    port: u16,
}

impl StreamEndpoint {
    pub fn new(dialer: Arc<dyn StreamDialer>, host: impl Into<String>, port: u16) -> Self {
        Self {
            dialer,
            host: host.into(),
            port,
        }
    }

    /// Build from a `"host:port"` string.
    pub fn parse(dialer: Arc<dyn StreamDialer>, addr: &str) -> Result<Self, DialError> {
        let (host, port) = split_host_port(addr)?;
        Ok(Self::new(dialer, host, port))
    }

    pub async fn connect(&self) -> Result<IoStream, DialError> {
        self.dialer.connect(&self.host, self.port).await
    }

    pub fn address(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

impl fmt::Debug for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamEndpoint")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// A [`PacketDialer`] that always dials the same address.
#[derive(Clone)]
pub struct PacketEndpoint {
    dialer: Arc<dyn PacketDialer>,
    host: String,
    port: u16,
}

impl PacketEndpoint {
    pub fn new(dialer: Arc<dyn PacketDialer>, host: impl Into<String>, port: u16) -> Self {
        Self {
            dialer,
            host: host.into(),
            port,
        }
    }

    pub fn parse(dialer: Arc<dyn PacketDialer>, addr: &str) -> Result<Self, DialError> {
        let (host, port) = split_host_port(addr)?;
        Ok(Self::new(dialer, host, port))
    }

    pub async fn connect(&self) -> Result<BoxPacketConn, DialError> {
        self.dialer.connect(&self.host, self.port).await
    }

    pub fn address(&self) -> String {
        join_host_port(&self.host, self.port)
    }
}

impl fmt::Debug for PacketEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketEndpoint")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
