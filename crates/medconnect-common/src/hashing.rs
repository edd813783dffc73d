//! One-way hashing for sensitive values
//!
//! Encrypted columns cannot be searched or joined on. When a lookup key is
//! needed for PHI (for example de-duplicating contact numbers), store the
//! SHA-256 digest produced here next to the encrypted value.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `data`.
///
/// Returns `None` for empty input so that "no data" never produces a digest
/// that could collide across records.
pub fn hash_sensitive_data(data: &str) -> Option<String> {
    if data.is_empty() {
        return None;
    }

    Some(hash_bytes(data.as_bytes()))
}

/// Hex-encoded SHA-256 digest of raw bytes
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
