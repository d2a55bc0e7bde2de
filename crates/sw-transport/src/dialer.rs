//! # Dialer abstractions / 拨号器抽象
//!
//! - `DialError`: everything a dial can fail with
//! - `StreamDialer` / `PacketDialer`: the two dialer contracts every layer implements
//! - `TcpDialer` / `UdpDialer`: direct connections, the bottom of every chain
//! - `IoStream` / `PacketConn`: what a successful dial hands back

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tracing::debug;

/// 拨号过程中可能出现的错误类型
#[derive(Debug, Error)]
pub enum DialError {
    /// Underlying socket or stream I/O failed.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// The dialer cannot serve this request (e.g. a single-use dialer reused).
    #[error("not supported")]
    NotSupported,

    /// Anything else.
    #[error("other: {0}")]
    Other(String),
}

/// Marker for anything usable as a connected byte stream.
pub trait AsyncReadWrite: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}

impl<T> AsyncReadWrite for T where T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}

/// Boxed connected stream returned by every [`StreamDialer`].
pub type IoStream = Box<dyn AsyncReadWrite + 'static>;

/// Establishes byte-stream connections to `host:port`.
///
/// Implementations wrap one another: a Shadowsocks dialer dials its server
/// through an inner dialer, a fragmenting dialer wraps whatever stream its
/// inner dialer returns.
#[async_trait]
pub trait StreamDialer: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<IoStream, DialError>;
}

#[async_trait]
impl<D> StreamDialer for Box<D>
where
    D: StreamDialer + ?Sized,
{
    async fn connect(&self, host: &str, port: u16) -> Result<IoStream, DialError> {
        (**self).connect(host, port).await
    }
}

#[async_trait]
impl<D> StreamDialer for Arc<D>
where
    D: StreamDialer + ?Sized,
{
    async fn connect(&self, host: &str, port: u16) -> Result<IoStream, DialError> {
        (**self).connect(host, port).await
    }
}

/// A connected datagram socket. Each `send` is one datagram to the peer the
/// connection was dialed for; each `recv` returns one datagram from it.
#[async_trait]
pub trait PacketConn: Send + Sync {
    async fn send(&self, buf: &[u8]) -> io::Result<usize>;
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

#[async_trait]
impl PacketConn for UdpSocket {
    async fn send(&self, buf: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, buf).await
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        UdpSocket::recv(self, buf).await
    }
}

pub type BoxPacketConn = Box<dyn PacketConn>;

/// Establishes packet "connections" to `host:port`.
#[async_trait]
pub trait PacketDialer: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<BoxPacketConn, DialError>;
}

#[async_trait]
impl<D> PacketDialer for Box<D>
where
    D: PacketDialer + ?Sized,
{
    async fn connect(&self, host: &str, port: u16) -> Result<BoxPacketConn, DialError> {
        (**self).connect(host, port).await
    }
}

#[async_trait]
impl<D> PacketDialer for Arc<D>
where
    D: PacketDialer + ?Sized,
{
    async fn connect(&self, host: &str, port: u16) -> Result<BoxPacketConn, DialError> {
        (**self).connect(host, port).await
    }
}

async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, DialError> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port)).await?.collect();
    if addrs.is_empty() {
        return Err(DialError::Other(format!("no addresses found for {host}")));
    }
    Ok(addrs)
}

/// Direct TCP dialer. Tries each resolved address in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

#[async_trait]
impl StreamDialer for TcpDialer {
    async fn connect(&self, host: &str, port: u16) -> Result<IoStream, DialError> {
        let mut last_error = DialError::Other("no addresses provided".into());
        for addr in resolve(host, port).await? {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    // Small first writes (a ClientHello fragment) must not be coalesced.
                    stream.set_nodelay(true)?;
                    debug!(%addr, "tcp connected");
                    return Ok(Box::new(stream));
                }
                Err(e) => {
                    debug!(%addr, error = %e, "tcp connect failed");
                    last_error = DialError::from(e);
                }
            }
        }
        Err(last_error)
    }
}

/// Direct UDP dialer: binds the wildcard address of the target's family and
/// connects the socket to the first resolved address.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpDialer;

#[async_trait]
impl PacketDialer for UdpDialer {
    async fn connect(&self, host: &str, port: u16) -> Result<BoxPacketConn, DialError> {
        let addr = resolve(host, port).await?[0];
        let bind: SocketAddr = if addr.is_ipv6() {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(addr).await?;
        debug!(%addr, "udp connected");
        Ok(Box::new(socket))
    }
}
