//! Stream key type and generator
//!
//! A stream key is the credential an encoder presents when publishing
//! (`rtmp://host/live/<key>`). Keys are drawn from the OS CSPRNG over
//! `[A-Za-z0-9]`; at the default length of 12 there are 62^12 possible keys,
//! so collisions are not checked for.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Default number of characters in a generated key
pub const DEFAULT_KEY_LENGTH: usize = 12;

/// Shortest key length the registry will issue
pub const MIN_KEY_LENGTH: usize = DEFAULT_KEY_LENGTH;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Opaque credential identifying one ingest slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamKey(String);

impl StreamKey {
    /// Wrap an existing key string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generate a fresh random key of `length` characters
    pub fn generate(length: usize) -> Self {
        let mut rng = OsRng;
        let key = (0..length)
            .filter_map(|_| ALPHABET.choose(&mut rng))
            .map(|&b| b as char)
            .collect();
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}
