use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::cipher::EncryptionKey;
use super::packet::ShadowsocksPacketConn;
use super::salt::{RandomSaltGenerator, SaltGenerator};
use super::stream::SsStream;
use crate::dialer::{BoxPacketConn, DialError, IoStream, PacketDialer, StreamDialer};
use crate::endpoint::{PacketEndpoint, StreamEndpoint};

/// Dials targets through a Shadowsocks server reached via `endpoint`.
#[derive(Debug, Clone)]
pub struct ShadowsocksStreamDialer {
    endpoint: StreamEndpoint,
    key: Arc<EncryptionKey>,
    salt_generator: Arc<dyn SaltGenerator>,
}

impl ShadowsocksStreamDialer {
    pub fn new(endpoint: StreamEndpoint, key: EncryptionKey) -> Self {
        Self {
            endpoint,
            key: Arc::new(key),
            salt_generator: Arc::new(RandomSaltGenerator),
        }
    }

    pub fn with_salt_generator(mut self, salt_generator: Arc<dyn SaltGenerator>) -> Self {
        self.salt_generator = salt_generator;
        self
    }
}

#[async_trait]
impl StreamDialer for ShadowsocksStreamDialer {
    async fn connect(&self, host: &str, port: u16) -> Result<IoStream, DialError> {
        let conn = self.endpoint.connect().await?;
        debug!(server = %self.endpoint.address(), %host, port, "shadowsocks stream");
        let stream = SsStream::new(conn, self.key.clone(), &*self.salt_generator, host, port)?;
        Ok(Box::new(stream))
    }
}

/// Sends datagrams through a Shadowsocks server reached via `endpoint`.
#[derive(Debug, Clone)]
pub struct ShadowsocksPacketDialer {
    endpoint: PacketEndpoint,
    key: Arc<EncryptionKey>,
}

impl ShadowsocksPacketDialer {
    pub fn new(endpoint: PacketEndpoint, key: EncryptionKey) -> Self {
        Self {
            endpoint,
            key: Arc::new(key),
        }
    }
}

#[async_trait]
impl PacketDialer for ShadowsocksPacketDialer {
    async fn connect(&self, host: &str, port: u16) -> Result<BoxPacketConn, DialError> {
        let conn = self.endpoint.connect().await?;
        debug!(server = %self.endpoint.address(), %host, port, "shadowsocks packets");
        Ok(Box::new(ShadowsocksPacketConn::new(
            conn,
            self.key.clone(),
            Arc::new(RandomSaltGenerator),
            host,
            port,
        )))
    }
}
