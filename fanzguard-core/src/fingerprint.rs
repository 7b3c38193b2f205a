//! Content fingerprinting for fast exact and truncation-tolerant lookup.
//!
//! A fingerprint is three SHA3-256 digests side by side: the whole buffer,
//! the leading window, and the trailing window, each truncated to a fixed
//! hex segment. Cutting bytes off either end of a file changes the full
//! segment but leaves the opposite window's segment intact, which is enough
//! to shortlist truncated re-uploads. Re-encoding resistance is the
//! perceptual hash's job, not this one's.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{ProvenanceError, Result};

/// Bytes hashed for the leading and trailing segments.
pub const FINGERPRINT_WINDOW: usize = 4096;

/// Hex characters kept per segment.
pub const SEGMENT_HEX_LEN: usize = 16;

/// A three-segment content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintDigest {
    /// Truncated SHA3-256 of the whole buffer.
    pub full: String,
    /// Truncated SHA3-256 of the leading window.
    pub head: String,
    /// Truncated SHA3-256 of the trailing window.
    pub tail: String,
}

impl FingerprintDigest {
    /// The concatenated storage form: `full + head + tail`.
    pub fn compact(&self) -> String {
        format!("{}{}{}", self.full, self.head, self.tail)
    }
}

impl fmt::Display for FingerprintDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact())
    }
}

/// Computes fingerprints over raw media bytes.
pub struct ContentFingerprint;

impl ContentFingerprint {
    /// Digest a buffer. Deterministic; the same bytes always produce the
    /// same fingerprint. Buffers shorter than the window use the whole
    /// buffer for the affected segments.
    pub fn digest(data: &[u8]) -> Result<FingerprintDigest> {
        if data.is_empty() {
            return Err(ProvenanceError::Generation(
                "cannot fingerprint empty content".into(),
            ));
        }

        let head_window = &data[..data.len().min(FINGERPRINT_WINDOW)];
        let tail_window = &data[data.len().saturating_sub(FINGERPRINT_WINDOW)..];

        Ok(FingerprintDigest {
            full: segment_hash(data),
            head: segment_hash(head_window),
            tail: segment_hash(tail_window),
        })
    }
}

fn segment_hash(data: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    hex::encode(&digest[..SEGMENT_HEX_LEN / 2])
}
