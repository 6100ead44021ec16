//! Content digests.
//!
//! A [`Digest`] is the lowercase hex SHA-256 of an object's exact byte
//! content. It is the system's only notion of identity: two blobs with equal
//! content are the same object, and a commit's digest is computed over its
//! canonical serialized form.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// A lowercase hex SHA-256 digest naming one stored object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Length of the hex representation.
    pub const HEX_LEN: usize = 64;

    /// Digest of the given bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Parse a full-length hex digest. Returns `None` for anything that is
    /// not exactly [`Self::HEX_LEN`] lowercase hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() == Self::HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviation to the first `len` hex digits.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
