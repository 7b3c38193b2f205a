//! Wire envelope shared by every embedding strategy.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::{ProvenanceError, Result};
use crate::payload::ForensicPayload;
use crate::signature::ForensicSignature;

/// Current envelope schema version.
pub const CURRENT_ENVELOPE_VERSION: u32 = 1;

/// Confidence reported when the integrity digest verifies.
pub const EXACT_MATCH_CONFIDENCE: f64 = 95.0;

/// Confidence reported for a parseable envelope whose digest does not match
/// (typically after lossy re-encoding mangled part of the carrier).
pub const PARTIAL_MATCH_CONFIDENCE: f64 = 60.0;

/// What a strategy actually writes into a carrier: the payload plus the
/// watermark identifier, stamped and check-summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkEnvelope {
    pub watermark_id: ForensicSignature,
    pub payload: ForensicPayload,
    /// Unix timestamp in milliseconds.
    pub embedded_at: i64,
    #[serde(default = "default_envelope_version")]
    pub version: u32,
    /// SHA3-256 over the identifying fields, hex-encoded.
    pub digest: String,
}

fn default_envelope_version() -> u32 {
    CURRENT_ENVELOPE_VERSION
}

impl WatermarkEnvelope {
    /// Build an envelope stamped with the current time.
    pub fn new(watermark_id: ForensicSignature, payload: ForensicPayload) -> Result<Self> {
        let embedded_at = Utc::now().timestamp_millis();
        let digest = integrity_digest(&watermark_id, &payload, embedded_at)?;
        Ok(Self {
            watermark_id,
            payload,
            embedded_at,
            version: CURRENT_ENVELOPE_VERSION,
            digest,
        })
    }

    /// Recompute the digest and compare against the stored one.
    pub fn verify_integrity(&self) -> Result<bool> {
        let expected = integrity_digest(&self.watermark_id, &self.payload, self.embedded_at)?;
        Ok(expected == self.digest)
    }

    /// Extraction confidence for this envelope: exact when the digest
    /// verifies, partial when the structure parsed but the digest does not.
    pub fn confidence(&self) -> f64 {
        match self.verify_integrity() {
            Ok(true) => EXACT_MATCH_CONFIDENCE,
            _ => PARTIAL_MATCH_CONFIDENCE,
        }
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProvenanceError::Serialization(e.to_string()))
    }

    /// Parse an envelope from its JSON wire form.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProvenanceError::Serialization(e.to_string()))
    }
}

fn integrity_digest(
    watermark_id: &ForensicSignature,
    payload: &ForensicPayload,
    embedded_at: i64,
) -> Result<String> {
    let payload_json =
        serde_json::to_vec(payload).map_err(|e| ProvenanceError::Serialization(e.to_string()))?;

    let mut hasher = Sha3_256::new();
    hasher.update(watermark_id.as_str().as_bytes());
    hasher.update(&payload_json);
    hasher.update(embedded_at.to_le_bytes());
    Ok(hex::encode(hasher.finalize()))
}
