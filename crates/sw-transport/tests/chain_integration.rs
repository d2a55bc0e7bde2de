//! Dialer chains end to end over loopback TCP: tlsfrag on top of a
//! Shadowsocks tunnel, with an in-test server that decrypts the tunnel.

use std::sync::Arc;

use sw_transport::shadowsocks::{EncryptionKey, ShadowsocksStreamDialer, TAG_LEN};
use sw_transport::tlsfrag::TlsFragDialer;
use sw_transport::{StreamDialer, StreamEndpoint, TcpDialer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn read_chunk(s: &mut TcpStream, dec: &mut sw_transport::shadowsocks::SessionCipher) -> Vec<u8> {
    let mut len = [0u8; 2 + TAG_LEN];
    s.read_exact(&mut len).await.unwrap();
    let len = dec.open(&len).unwrap();
    let n = u16::from_be_bytes([len[0], len[1]]) as usize;
    let mut body = vec![0u8; n + TAG_LEN];
    s.read_exact(&mut body).await.unwrap();
    dec.open(&body).unwrap()
}

#[tokio::test]
async fn tlsfrag_over_shadowsocks_splits_inside_the_tunnel() {
    let key = EncryptionKey::new("chacha20-ietf-poly1305", "integration").unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server_key = key.clone();
    let server = tokio::spawn(async move {
        let (mut s, _) = listener.accept().await.unwrap();
        let mut salt = vec![0u8; server_key.salt_len()];
        s.read_exact(&mut salt).await.unwrap();
        let mut dec = server_key.session(&salt).unwrap();

        let first = read_chunk(&mut s, &mut dec).await;
        let mut plain = first;
        while plain.len() < 13 + 15 {
            plain.extend(read_chunk(&mut s, &mut dec).await);
        }
        plain
    });

    let endpoint = StreamEndpoint::new(Arc::new(TcpDialer), "127.0.0.1", port);
    let ss = ShadowsocksStreamDialer::new(endpoint, key);
    let dialer = TlsFragDialer::new(ss, 2).unwrap();

    let mut conn = dialer.connect("example.com", 443).await.unwrap();
    let hello = [22, 3, 1, 0, 5, b'h', b'e', b'l', b'l', b'o'];
    conn.write_all(&hello).await.unwrap();
    conn.flush().await.unwrap();

    let plain = server.await.unwrap();
    let mut addr = vec![0x03, 11];
    addr.extend_from_slice(b"example.com");
    addr.extend_from_slice(&443u16.to_be_bytes());
    assert_eq!(&plain[..13], &addr[..]);
    assert_eq!(
        &plain[13..],
        &[22, 3, 1, 0, 2, b'h', b'e', 22, 3, 1, 0, 3, b'l', b'l', b'o']
    );
}

#[tokio::test]
async fn direct_tlsfrag_reaches_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut s, _) = listener.accept().await.unwrap();
        let mut out = Vec::new();
        s.read_to_end(&mut out).await.unwrap();
        out
    });

    let dialer = TlsFragDialer::new(TcpDialer, 1).unwrap();
    let mut conn = dialer.connect("127.0.0.1", port).await.unwrap();
    conn.write_all(&[22, 3, 3, 0, 3, 7, 8, 9]).await.unwrap();
    conn.shutdown().await.unwrap();
    drop(conn);

    assert_eq!(
        server.await.unwrap(),
        [22, 3, 3, 0, 1, 7, 22, 3, 3, 0, 2, 8, 9]
    );
}
