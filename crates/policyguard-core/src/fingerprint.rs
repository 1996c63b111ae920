//! Content fingerprinting for re-analysis avoidance.
//!
//! A fingerprint is the sole staleness signal for cached classifications:
//! the orchestrator treats a request as a cache hit iff the stored digest
//! equals the digest of the freshly fetched document. There is no
//! timestamp-based invalidation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A stable SHA-256 digest of normalized policy text, lowercase hex.
///
/// Used purely as an equality oracle; never decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digest the exact byte sequence of `text`.
    pub fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Wrap an already-computed hex digest, e.g. one read back from the store.
    pub fn from_hex(digest: impl Into<String>) -> Self {
        Fingerprint(digest.into())
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

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
