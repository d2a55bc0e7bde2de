//! Salt generation for new sessions.

use std::fmt;

use rand::RngCore;

/// Fills the salt that opens each client-to-server session.
pub trait SaltGenerator: Send + Sync + fmt::Debug {
    fn fill_salt(&self, salt: &mut [u8]);
}

/// Uniformly random salt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSaltGenerator;

impl SaltGenerator for RandomSaltGenerator {
    fn fill_salt(&self, salt: &mut [u8]) {
        rand::thread_rng().fill_bytes(salt);
    }
}

/// Salt that starts with fixed bytes, e.g. to look like another protocol
/// to middleboxes. A prefix longer than the salt is truncated.
#[derive(Debug, Clone)]
pub struct PrefixSaltGenerator {
    prefix: Vec<u8>,
}

impl PrefixSaltGenerator {
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

impl SaltGenerator for PrefixSaltGenerator {
    fn fill_salt(&self, salt: &mut [u8]) {
        let n = self.prefix.len().min(salt.len());
        salt[..n].copy_from_slice(&self.prefix[..n]);
        rand::thread_rng().fill_bytes(&mut salt[n..]);
    }
}
