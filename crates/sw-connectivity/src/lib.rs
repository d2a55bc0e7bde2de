//! # sw-connectivity: resolver reachability tests / 解析器连通性测试
//!
//! Checks that a DNS resolver can be reached through a dialer chain by
//! sending one A query and waiting for the matching response, over a stream
//! (RFC 1035 TCP framing) or over packets.

pub mod dns;

use std::error::Error as StdError;
use std::future::Future;
use std::io;

use rand::Rng;
use sw_transport::{PacketEndpoint, StreamEndpoint};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout_at, Duration, Instant};
use tracing::debug;

use crate::dns::{build_query, check_response, DnsError};

pub const OP_CONNECT: &str = "connect";
pub const OP_SEND: &str = "send";
pub const OP_RECEIVE: &str = "receive";
pub const OP_RESOLVE: &str = "resolve";

const MAX_DATAGRAM: usize = 4096;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A failed test: the step that failed and why.
#[derive(Debug, Error)]
#[error("{op}: {source}")]
pub struct TestError {
    /// One of `connect`, `send`, `receive`, `resolve`.
    pub op: &'static str,
    /// POSIX errno name, when the failure maps to one.
    pub posix_error: Option<&'static str>,
    #[source]
    pub source: BoxError,
}

impl TestError {
    fn new(op: &'static str, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        let posix_error = posix_error_in(&*source);
        Self {
            op,
            posix_error,
            source,
        }
    }

    fn timed_out(op: &'static str) -> Self {
        Self::new(op, io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded"))
    }
}

/// POSIX name of the first `io::Error` in the chain starting at `err`.
fn posix_error_in(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    let mut cur = Some(err);
    while let Some(e) = cur {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return posix_name(io_err.kind());
        }
        cur = e.source();
    }
    None
}

fn posix_name(kind: io::ErrorKind) -> Option<&'static str> {
    use io::ErrorKind::*;
    Some(match kind {
        ConnectionRefused => "ECONNREFUSED",
        ConnectionReset => "ECONNRESET",
        ConnectionAborted => "ECONNABORTED",
        NotConnected => "ENOTCONN",
        AddrInUse => "EADDRINUSE",
        AddrNotAvailable => "EADDRNOTAVAIL",
        NetworkUnreachable => "ENETUNREACH",
        HostUnreachable => "EHOSTUNREACH",
        NetworkDown => "ENETDOWN",
        BrokenPipe => "EPIPE",
        TimedOut => "ETIMEDOUT",
        PermissionDenied => "EACCES",
        WouldBlock => "EAGAIN",
        Interrupted => "EINTR",
        _ => return None,
    })
}

/// Run one step against the shared deadline, tagging failures with `op`.
async fn step<T, E, F>(op: &'static str, deadline: Instant, fut: F) -> Result<T, TestError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    match timeout_at(deadline, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(TestError::new(op, e)),
        Err(_) => Err(TestError::timed_out(op)),
    }
}

fn new_query(domain: &str) -> Result<(u16, Vec<u8>), TestError> {
    let id: u16 = rand::thread_rng().gen();
    let query = build_query(id, domain).map_err(|e| TestError::new(OP_RESOLVE, e))?;
    Ok((id, query))
}

/// Resolve `domain` over a stream to `resolver`, within `timeout`.
pub async fn test_resolver_stream_connectivity(
    resolver: &StreamEndpoint,
    domain: &str,
    timeout: Duration,
) -> (Duration, Result<(), TestError>) {
    let start = Instant::now();
    let result = stream_test(resolver, domain, start + timeout).await;
    (start.elapsed(), result)
}

async fn stream_test(resolver: &StreamEndpoint, domain: &str, deadline: Instant) -> Result<(), TestError> {
    let (id, query) = new_query(domain)?;
    let mut conn = step(OP_CONNECT, deadline, resolver.connect()).await?;
    debug!(resolver = %resolver.address(), id, "dns over stream");

    let mut framed = Vec::with_capacity(2 + query.len());
    framed.extend_from_slice(&(query.len() as u16).to_be_bytes());
    framed.extend_from_slice(&query);
    step(OP_SEND, deadline, async {
        conn.write_all(&framed).await?;
        conn.flush().await
    })
    .await?;

    let response = step(OP_RECEIVE, deadline, async {
        let len = conn.read_u16().await?;
        let mut msg = vec![0u8; usize::from(len)];
        conn.read_exact(&mut msg).await?;
        Ok::<_, io::Error>(msg)
    })
    .await?;

    let header = check_response(id, &response).map_err(|e| TestError::new(OP_RESOLVE, e))?;
    debug!(rcode = header.rcode(), "dns response");
    Ok(())
}

/// Resolve `domain` over packets to `resolver`, within `timeout`. Datagrams
/// that do not answer the query are skipped.
pub async fn test_resolver_packet_connectivity(
    resolver: &PacketEndpoint,
    domain: &str,
    timeout: Duration,
) -> (Duration, Result<(), TestError>) {
    let start = Instant::now();
    let result = packet_test(resolver, domain, start + timeout).await;
    (start.elapsed(), result)
}

async fn packet_test(resolver: &PacketEndpoint, domain: &str, deadline: Instant) -> Result<(), TestError> {
    let (id, query) = new_query(domain)?;
    let conn = step(OP_CONNECT, deadline, resolver.connect()).await?;
    debug!(resolver = %resolver.address(), id, "dns over packets");

    step(OP_SEND, deadline, conn.send(&query)).await?;

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let n = step(OP_RECEIVE, deadline, conn.recv(&mut buf)).await?;
        match check_response(id, &buf[..n]) {
            Ok(header) => {
                debug!(rcode = header.rcode(), "dns response");
                return Ok(());
            }
            Err(e @ (DnsError::IdMismatch { .. } | DnsError::NotResponse | DnsError::Short(_))) => {
                debug!(error = %e, "ignoring datagram");
            }
            Err(e) => return Err(TestError::new(OP_RESOLVE, e)),
        }
    }
}
