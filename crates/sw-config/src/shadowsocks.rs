//! `ss://` parts: `ss://<base64url(cipher:secret)>@host:port[?prefix=...]`

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sw_transport::shadowsocks::EncryptionKey;
use url::{Host, Url};

use crate::ConfigError;

#[derive(Debug)]
pub(crate) struct ShadowsocksConfig {
    pub host: String,
    pub port: u16,
    pub key: EncryptionKey,
    pub prefix: Vec<u8>,
}

pub(crate) fn parse_shadowsocks_url(url: &Url) -> Result<ShadowsocksConfig, ConfigError> {
    let host = match url.host() {
        Some(Host::Domain(d)) if !d.is_empty() => d.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        _ => return Err(ConfigError::MissingHost),
    };
    let port = url.port().ok_or(ConfigError::MissingPort)?;

    let info = decode_cipher_info(url.username())?;
    let (cipher, secret) = info.split_once(':').ok_or(ConfigError::InvalidCipherInfo)?;
    let key = EncryptionKey::new(cipher, secret)?;

    let prefix = match url.query_pairs().find(|(k, _)| k == "prefix") {
        Some((_, v)) => parse_prefix(&v)?,
        None => Vec::new(),
    };

    Ok(ShadowsocksConfig {
        host,
        port,
        key,
        prefix,
    })
}

/// URL-safe base64 without padding; `=` padding and the standard alphabet
/// are accepted as well.
fn decode_cipher_info(user: &str) -> Result<String, ConfigError> {
    let normalized: String = user
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|e| ConfigError::InvalidCipherInfoEncoding(user.to_string(), e))?;
    String::from_utf8(bytes).map_err(|_| ConfigError::InvalidCipherInfo)
}

/// Each character maps to one byte, so only U+0000..=U+00FF are allowed.
fn parse_prefix(s: &str) -> Result<Vec<u8>, ConfigError> {
    s.chars()
        .map(|c| u8::try_from(u32::from(c)).map_err(|_| ConfigError::InvalidPrefix(u32::from(c))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use sw_transport::shadowsocks::CipherKind;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn user(info: &str) -> String {
        URL_SAFE_NO_PAD.encode(info)
    }

    #[test]
    fn parses_full_url() {
        let u = url(&format!(
            "ss://{}@example.com:8388?prefix=%16%03%01",
            user("chacha20-ietf-poly1305:SECRET")
        ));
        let cfg = parse_shadowsocks_url(&u).unwrap();
        assert_eq!(cfg.host, "example.com");
        assert_eq!(cfg.port, 8388);
        assert_eq!(cfg.key.kind(), CipherKind::Chacha20IetfPoly1305);
        assert_eq!(cfg.prefix, [0x16, 0x03, 0x01]);
    }

    #[test]
    fn ipv6_host_loses_brackets() {
        let u = url(&format!("ss://{}@[::1]:8388", user("aes-128-gcm:pw")));
        assert_eq!(parse_shadowsocks_url(&u).unwrap().host, "::1");
    }

    #[test]
    fn secret_may_contain_colons() {
        let u = url(&format!("ss://{}@h:1", user("aes-256-gcm:a:b:c")));
        assert!(parse_shadowsocks_url(&u).is_ok());
    }

    #[test]
    fn padded_standard_base64_is_tolerated() {
        // Standard alphabet with padding; '/' and '+' would break the URL,
        // so pick input whose encoding only adds '='.
        let encoded = STANDARD.encode("aes-128-gcm:pw");
        assert!(encoded.ends_with('='));
        let u = url(&format!("ss://{encoded}@h:1"));
        assert!(parse_shadowsocks_url(&u).is_ok());
    }

    #[test]
    fn missing_port() {
        let u = url(&format!("ss://{}@h", user("aes-128-gcm:pw")));
        assert!(matches!(parse_shadowsocks_url(&u), Err(ConfigError::MissingPort)));
    }

    #[test]
    fn missing_separator() {
        let u = url(&format!("ss://{}@h:1", user("aes-128-gcm")));
        assert!(matches!(
            parse_shadowsocks_url(&u),
            Err(ConfigError::InvalidCipherInfo)
        ));
    }

    #[test]
    fn unknown_cipher() {
        let u = url(&format!("ss://{}@h:1", user("rc4:pw")));
        assert!(matches!(parse_shadowsocks_url(&u), Err(ConfigError::Cipher(_))));
    }

    #[test]
    fn bad_base64() {
        let u = url("ss://!!!@h:1");
        assert!(matches!(
            parse_shadowsocks_url(&u),
            Err(ConfigError::InvalidCipherInfoEncoding(..))
        ));
    }

    #[test]
    fn prefix_rejects_wide_characters() {
        assert_eq!(parse_prefix("\u{ff}a").unwrap(), [0xff, b'a']);
        assert!(matches!(parse_prefix("€"), Err(ConfigError::InvalidPrefix(0x20ac))));
    }
}
