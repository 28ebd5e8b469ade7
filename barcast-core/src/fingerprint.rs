//! Request fingerprinting — deterministic identity for response caching.
//!
//! The fingerprint is a blake3 digest of the request's canonical JSON form.
//! Canonical here means the struct's fixed field order with absent optional
//! fields skipped, so a request that round-trips through the wire hashes the
//! same as the original.

use std::fmt;

use serde::Serialize;

/// Hex-encoded blake3 digest identifying one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of any serializable value. Falls back to hashing the
    /// `Debug` rendering when serialization fails, so a fingerprint is always
    /// produced.
    pub fn of<T: Serialize + fmt::Debug>(value: &T) -> Self {
        let digest = match serde_json::to_vec(value) {
            Ok(bytes) => blake3::hash(&bytes),
            Err(_) => blake3::hash(format!("{value:?}").as_bytes()),
        };
        Self(digest.to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
