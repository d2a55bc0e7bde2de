use std::sync::Arc;
use std::time::Duration;

use sw_connectivity::{test_resolver_packet_connectivity, test_resolver_stream_connectivity};
use sw_transport::{PacketEndpoint, StreamEndpoint, TcpDialer, UdpDialer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

/// Turn a query into a bare response: same id and question, QR set.
fn answer(query: &[u8]) -> Vec<u8> {
    let mut resp = query.to_vec();
    resp[2] |= 0x80;
    resp
}

fn stream_endpoint(port: u16) -> StreamEndpoint {
    StreamEndpoint::new(Arc::new(TcpDialer), "127.0.0.1", port)
}

fn packet_endpoint(port: u16) -> PacketEndpoint {
    PacketEndpoint::new(Arc::new(UdpDialer), "127.0.0.1", port)
}

#[tokio::test]
async fn stream_resolver_answers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut s, _) = listener.accept().await.unwrap();
        let len = s.read_u16().await.unwrap();
        let mut q = vec![0u8; len as usize];
        s.read_exact(&mut q).await.unwrap();
        let resp = answer(&q);
        s.write_u16(resp.len() as u16).await.unwrap();
        s.write_all(&resp).await.unwrap();
        q
    });

    let (elapsed, result) =
        test_resolver_stream_connectivity(&stream_endpoint(port), "example.com.", Duration::from_secs(5))
            .await;
    result.unwrap();
    assert!(elapsed < Duration::from_secs(5));

    let q = server.await.unwrap();
    assert_eq!(&q[12..25], b"\x07example\x03com\x00");
}

#[tokio::test]
async fn stream_resolver_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (_, result) =
        test_resolver_stream_connectivity(&stream_endpoint(port), "example.com", Duration::from_secs(5))
            .await;
    let err = result.unwrap_err();
    assert_eq!(err.op, "connect");
    assert_eq!(err.posix_error, Some("ECONNREFUSED"));
}

#[tokio::test]
async fn stream_resolver_closing_early_fails_receive() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut s, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 64];
        let _ = s.read(&mut buf).await;
    });

    let (_, result) =
        test_resolver_stream_connectivity(&stream_endpoint(port), "example.com", Duration::from_secs(5))
            .await;
    assert_eq!(result.unwrap_err().op, "receive");
}

#[tokio::test]
async fn stream_resolver_wrong_id_fails_resolve() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut s, _) = listener.accept().await.unwrap();
        let len = s.read_u16().await.unwrap();
        let mut q = vec![0u8; len as usize];
        s.read_exact(&mut q).await.unwrap();
        let mut resp = answer(&q);
        resp[0] ^= 0xFF;
        s.write_u16(resp.len() as u16).await.unwrap();
        s.write_all(&resp).await.unwrap();
    });

    let (_, result) =
        test_resolver_stream_connectivity(&stream_endpoint(port), "example.com", Duration::from_secs(5))
            .await;
    let err = result.unwrap_err();
    assert_eq!(err.op, "resolve");
    assert_eq!(err.posix_error, None);
}

#[tokio::test]
async fn packet_resolver_skips_stray_datagrams() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (n, peer) = server.recv_from(&mut buf).await.unwrap();
        let q = &buf[..n];

        let mut stray = answer(q);
        stray[1] ^= 0x01;
        server.send_to(&stray, peer).await.unwrap();
        server.send_to(&[0u8; 3], peer).await.unwrap();
        server.send_to(&answer(q), peer).await.unwrap();
    });

    let (_, result) =
        test_resolver_packet_connectivity(&packet_endpoint(port), "example.com.", Duration::from_secs(5))
            .await;
    result.unwrap();
}

#[tokio::test]
async fn packet_resolver_silence_times_out() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();

    let (elapsed, result) =
        test_resolver_packet_connectivity(&packet_endpoint(port), "example.com", Duration::from_millis(200))
            .await;
    let err = result.unwrap_err();
    assert_eq!(err.op, "receive");
    assert_eq!(err.posix_error, Some("ETIMEDOUT"));
    assert!(elapsed >= Duration::from_millis(200));
    drop(server);
}

#[tokio::test]
async fn invalid_domain_fails_before_dialing() {
    let (_, result) =
        test_resolver_stream_connectivity(&stream_endpoint(9), "bad..name", Duration::from_secs(1)).await;
    assert_eq!(result.unwrap_err().op, "resolve");
}
