//! AEAD ciphers and key derivation (SIP004).
//!
//! - master key: OpenSSL `EVP_BytesToKey` (MD5, no salt, one iteration)
//! - session subkey: HKDF-SHA1(master, salt, "ss-subkey")
//! - nonce: 12-byte little-endian counter, incremented after each seal/open

use std::fmt;

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use chacha20poly1305::ChaCha20Poly1305;
use hkdf::Hkdf;
use sha1::Sha1;
use thiserror::Error;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// AEAD tag length, identical for every supported cipher.
pub const TAG_LEN: usize = 16;

const NONCE_LEN: usize = 12;
const SUBKEY_INFO: &[u8] = b"ss-subkey";

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("unsupported cipher {0:?}")]
    Unsupported(String),
    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("aead seal failed")]
    Seal,
    #[error("aead authentication failed")]
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    Chacha20IetfPoly1305,
    Aes256Gcm,
    Aes192Gcm,
    Aes128Gcm,
}

impl CipherKind {
    /// Accepts both the SIP004 names and the `AEAD_*` aliases, case-insensitively.
    pub fn from_name(name: &str) -> Result<Self, CipherError> {
        match name.to_ascii_lowercase().as_str() {
            "chacha20-ietf-poly1305" | "aead_chacha20_poly1305" => Ok(Self::Chacha20IetfPoly1305),
            "aes-256-gcm" | "aead_aes_256_gcm" => Ok(Self::Aes256Gcm),
            "aes-192-gcm" | "aead_aes_192_gcm" => Ok(Self::Aes192Gcm),
            "aes-128-gcm" | "aead_aes_128_gcm" => Ok(Self::Aes128Gcm),
            _ => Err(CipherError::Unsupported(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Chacha20IetfPoly1305 => "chacha20-ietf-poly1305",
            Self::Aes256Gcm => "aes-256-gcm",
            Self::Aes192Gcm => "aes-192-gcm",
            Self::Aes128Gcm => "aes-128-gcm",
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            Self::Chacha20IetfPoly1305 | Self::Aes256Gcm => 32,
            Self::Aes192Gcm => 24,
            Self::Aes128Gcm => 16,
        }
    }

    /// Salt length equals key length for all SIP004 ciphers.
    pub fn salt_len(&self) -> usize {
        self.key_len()
    }
}

/// Cipher plus master key derived from a user secret.
#[derive(Clone)]
pub struct EncryptionKey {
    kind: CipherKind,
    master: Vec<u8>,
}

impl EncryptionKey {
    pub fn new(cipher_name: &str, secret: &str) -> Result<Self, CipherError> {
        let kind = CipherKind::from_name(cipher_name)?;
        Ok(Self {
            kind,
            master: evp_bytes_to_key(secret.as_bytes(), kind.key_len()),
        })
    }

    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    pub fn salt_len(&self) -> usize {
        self.kind.salt_len()
    }

    /// Cipher state for one direction of one session, keyed by `salt`.
    pub fn session(&self, salt: &[u8]) -> Result<SessionCipher, CipherError> {
        let mut subkey = vec![0u8; self.kind.key_len()];
        Hkdf::<Sha1>::new(Some(salt), &self.master)
            .expand(SUBKEY_INFO, &mut subkey)
            .map_err(|_| CipherError::InvalidKeyLength)?;
        SessionCipher::new(self.kind, &subkey)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("cipher", &self.kind.name())
            .finish_non_exhaustive()
    }
}

fn evp_bytes_to_key(secret: &[u8], key_len: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(key_len + 16);
    let mut prev: Vec<u8> = Vec::new();
    while key.len() < key_len {
        let mut ctx = md5::Context::new();
        ctx.consume(&prev);
        ctx.consume(secret);
        prev = ctx.compute().0.to_vec();
        key.extend_from_slice(&prev);
    }
    key.truncate(key_len);
    key
}

enum AeadImpl {
    Chacha(ChaCha20Poly1305),
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

/// Subkey-bound AEAD with its running nonce.
pub struct SessionCipher {
    aead: AeadImpl,
    nonce: [u8; NONCE_LEN],
}

impl SessionCipher {
    fn new(kind: CipherKind, subkey: &[u8]) -> Result<Self, CipherError> {
        let bad = |_| CipherError::InvalidKeyLength;
        let aead = match kind {
            CipherKind::Chacha20IetfPoly1305 => {
                AeadImpl::Chacha(ChaCha20Poly1305::new_from_slice(subkey).map_err(bad)?)
            }
            CipherKind::Aes128Gcm => AeadImpl::Aes128(Aes128Gcm::new_from_slice(subkey).map_err(bad)?),
            CipherKind::Aes192Gcm => AeadImpl::Aes192(Aes192Gcm::new_from_slice(subkey).map_err(bad)?),
            CipherKind::Aes256Gcm => AeadImpl::Aes256(Aes256Gcm::new_from_slice(subkey).map_err(bad)?),
        };
        Ok(Self {
            aead,
            nonce: [0u8; NONCE_LEN],
        })
    }

    /// Encrypt and append the tag, then advance the nonce.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = GenericArray::from_slice(&self.nonce);
        let sealed = match &self.aead {
            AeadImpl::Chacha(c) => c.encrypt(nonce, plaintext),
            AeadImpl::Aes128(c) => c.encrypt(nonce, plaintext),
            AeadImpl::Aes192(c) => c.encrypt(nonce, plaintext),
            AeadImpl::Aes256(c) => c.encrypt(nonce, plaintext),
        }
        .map_err(|_| CipherError::Seal)?;
        self.advance();
        Ok(sealed)
    }

    /// Verify and decrypt, then advance the nonce.
    pub fn open(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = GenericArray::from_slice(&self.nonce);
        let opened = match &self.aead {
            AeadImpl::Chacha(c) => c.decrypt(nonce, ciphertext),
            AeadImpl::Aes128(c) => c.decrypt(nonce, ciphertext),
            AeadImpl::Aes192(c) => c.decrypt(nonce, ciphertext),
            AeadImpl::Aes256(c) => c.decrypt(nonce, ciphertext),
        }
        .map_err(|_| CipherError::Open)?;
        self.advance();
        Ok(opened)
    }

    fn advance(&mut self) {
        for b in self.nonce.iter_mut() {
            *b = b.wrapping_add(1);
            if *b != 0 {
                break;
            }
        }
    }
}
