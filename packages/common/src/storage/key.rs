use std::fmt;

use sha2::{Digest, Sha256};

/// SHA-256 digest of an opaque record id.
///
/// Record ids come from uploads and from imported documents, so they can hold
/// any characters. The digest gives every id a filesystem-safe location.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageKey([u8; 32]);

impl StorageKey {
    /// Compute the storage key for a record id.
    pub fn for_id(id: &str) -> Self {
        let hash = Sha256::digest(id.as_bytes());
        Self(hash.into())
    }

    /// Return the key as a 64-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Return the first 2 hex characters (shard directory).
    pub fn shard_prefix(&self) -> String {
        hex::encode(&self.0[..1])
    }

    /// Return the remaining 62 hex characters (file stem within the shard).
    pub fn shard_suffix(&self) -> String {
        hex::encode(&self.0[1..])
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({})", self.to_hex())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
