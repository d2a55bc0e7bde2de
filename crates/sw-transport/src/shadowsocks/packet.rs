//! AEAD datagrams (SIP004 UDP): `salt || seal(address || payload)`, each
//! packet under a fresh salt with a zero nonce.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;

use super::address::{encode_target, encoded_len};
use super::cipher::{CipherError, EncryptionKey, TAG_LEN};
use super::salt::SaltGenerator;
use crate::dialer::{BoxPacketConn, PacketConn};

const MAX_DATAGRAM: usize = 64 * 1024;

fn cipher_io(e: CipherError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

/// Seal one datagram for `host:port`.
pub fn pack(
    key: &EncryptionKey,
    salt_generator: &dyn SaltGenerator,
    host: &str,
    port: u16,
    payload: &[u8],
) -> io::Result<Vec<u8>> {
    let mut salt = vec![0u8; key.salt_len()];
    salt_generator.fill_salt(&mut salt);

    let mut plain = Vec::with_capacity(1 + 1 + host.len() + 2 + payload.len());
    encode_target(host, port, &mut plain)?;
    plain.extend_from_slice(payload);

    let sealed = key.session(&salt).map_err(cipher_io)?.seal(&plain).map_err(cipher_io)?;
    let mut out = salt;
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Open one datagram, returning `address || payload`.
pub fn unpack(key: &EncryptionKey, packet: &[u8]) -> io::Result<Vec<u8>> {
    let salt_len = key.salt_len();
    if packet.len() < salt_len + TAG_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("packet of {} bytes is too short", packet.len()),
        ));
    }
    let (salt, sealed) = packet.split_at(salt_len);
    key.session(salt).map_err(cipher_io)?.open(sealed).map_err(cipher_io)
}

/// Packet connection that tunnels datagrams for one target through a
/// Shadowsocks server.
pub struct ShadowsocksPacketConn {
    inner: BoxPacketConn,
    key: Arc<EncryptionKey>,
    salt_generator: Arc<dyn SaltGenerator>,
    host: String,
    port: u16,
}

impl ShadowsocksPacketConn {
    pub fn new(
        inner: BoxPacketConn,
        key: Arc<EncryptionKey>,
        salt_generator: Arc<dyn SaltGenerator>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            inner,
            key,
            salt_generator,
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl PacketConn for ShadowsocksPacketConn {
    async fn send(&self, buf: &[u8]) -> io::Result<usize> {
        let packet = pack(&self.key, &*self.salt_generator, &self.host, self.port, buf)?;
        self.inner.send(&packet).await?;
        Ok(buf.len())
    }

    /// Drops the source address; payloads longer than `buf` are truncated.
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut raw = vec![0u8; MAX_DATAGRAM];
        let n = self.inner.recv(&mut raw).await?;
        let plain = unpack(&self.key, &raw[..n])?;
        let addr_len = encoded_len(&plain)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad address in packet"))?;
        let payload = &plain[addr_len..];
        let n = payload.len().min(buf.len());
        buf[..n].copy_from_slice(&payload[..n]);
        Ok(n)
    }
}
