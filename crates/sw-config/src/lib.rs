//! # sw-config: transport configuration / 传输配置
//!
//! Turns a configuration string such as
//! `ss://<userinfo>@host:8388|tlsfrag:1` into a dialer chain.
//!
//! Parts are separated by `|`. The chain starts at a direct dialer and each
//! part wraps what has been built so far, so the leftmost part sits closest
//! to the network. An empty string yields the direct dialer.
//!
//! | part            | stream | packet |
//! |-----------------|--------|--------|
//! | `ss://...`      | yes    | yes    |
//! | `tlsfrag:<n>`   | yes    | no     |

mod shadowsocks;

use std::sync::Arc;

use sw_transport::shadowsocks::{
    CipherError, PrefixSaltGenerator, ShadowsocksPacketDialer, ShadowsocksStreamDialer,
};
use sw_transport::tlsfrag::TlsFragDialer;
use sw_transport::{
    PacketDialer, PacketEndpoint, StreamDialer, StreamEndpoint, TcpDialer, UdpDialer,
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::shadowsocks::parse_shadowsocks_url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config part {part:?}: {source}")]
    InvalidUrl {
        part: String,
        #[source]
        source: url::ParseError,
    },
    #[error("host not specified")]
    MissingHost,
    #[error("port not specified")]
    MissingPort,
    #[error("failed to decode cipher info [{0}]: {1}")]
    InvalidCipherInfoEncoding(String, #[source] base64::DecodeError),
    #[error("invalid cipher info: no ':' separator")]
    InvalidCipherInfo,
    #[error("failed to create cipher: {0}")]
    Cipher(#[from] CipherError),
    #[error("failed to parse prefix: character out of range: {0}")]
    InvalidPrefix(u32),
    #[error("invalid tlsfrag split offset {0:?}: expected an integer in 1..=65535")]
    InvalidSplitOffset(String),
    #[error("config scheme {0:?} is not supported for packet dialers")]
    UnsupportedForPackets(String),
    #[error("config scheme {0:?} is not supported")]
    UnsupportedScheme(String),
}

fn parts(config: &str) -> impl Iterator<Item = &str> {
    config.split('|').map(str::trim).filter(|p| !p.is_empty())
}

fn parse_part(part: &str) -> Result<Url, ConfigError> {
    Url::parse(part).map_err(|source| ConfigError::InvalidUrl {
        part: part.to_string(),
        source,
    })
}

fn parse_split_offset(url: &Url) -> Result<usize, ConfigError> {
    let raw = url.path();
    match raw.parse::<u16>() {
        Ok(n) if n > 0 => Ok(usize::from(n)),
        _ => Err(ConfigError::InvalidSplitOffset(raw.to_string())),
    }
}

/// Build a stream dialer from `config`.
pub fn new_stream_dialer(config: &str) -> Result<Arc<dyn StreamDialer>, ConfigError> {
    let mut dialer: Arc<dyn StreamDialer> = Arc::new(TcpDialer);
    for part in parts(config) {
        let url = parse_part(part)?;
        dialer = match url.scheme() {
            "ss" => {
                let cfg = parse_shadowsocks_url(&url)?;
                debug!(server = %cfg.host, port = cfg.port, prefix_len = cfg.prefix.len(), "config: shadowsocks stream");
                if cfg.prefix.len() > cfg.key.salt_len() {
                    warn!(
                        prefix_len = cfg.prefix.len(),
                        salt_len = cfg.key.salt_len(),
                        "config: salt prefix truncated to salt length"
                    );
                }
                let endpoint = StreamEndpoint::new(dialer, cfg.host, cfg.port);
                let mut ss = ShadowsocksStreamDialer::new(endpoint, cfg.key);
                if !cfg.prefix.is_empty() {
                    ss = ss.with_salt_generator(Arc::new(PrefixSaltGenerator::new(cfg.prefix)));
                }
                Arc::new(ss)
            }
            "tlsfrag" => {
                let offset = parse_split_offset(&url)?;
                debug!(offset, "config: tlsfrag");
                let frag = TlsFragDialer::new(dialer, offset)
                    .map_err(|_| ConfigError::InvalidSplitOffset(url.path().to_string()))?;
                Arc::new(frag)
            }
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
    }
    Ok(dialer)
}

/// Build a packet dialer from `config`. Salt prefixes are ignored here.
pub fn new_packet_dialer(config: &str) -> Result<Arc<dyn PacketDialer>, ConfigError> {
    let mut dialer: Arc<dyn PacketDialer> = Arc::new(UdpDialer);
    for part in parts(config) {
        let url = parse_part(part)?;
        dialer = match url.scheme() {
            "ss" => {
                let cfg = parse_shadowsocks_url(&url)?;
                debug!(server = %cfg.host, port = cfg.port, "config: shadowsocks packets");
                let endpoint = PacketEndpoint::new(dialer, cfg.host, cfg.port);
                Arc::new(ShadowsocksPacketDialer::new(endpoint, cfg.key))
            }
            "tlsfrag" => return Err(ConfigError::UnsupportedForPackets("tlsfrag".into())),
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        };
    }
    Ok(dialer)
}
