//! Metadata-tag embedding: a delimited JSON block appended to the carrier.
//!
//! Works on any byte stream and survives pixel-exact storage, but is
//! trivially stripped by anything that rewrites the container. It is the
//! universal fallback when no steganographic strategy supports the carrier,
//! and the lowest rung of the extraction priority order.

use crate::error::{ProvenanceError, Result};
use crate::watermark::{EmbeddingMethod, WatermarkEnvelope, WatermarkStrategy};

/// Opens a watermark block.
pub const BLOCK_BEGIN: &[u8] = b"--FANZGUARD-WM-BEGIN--";

/// Closes a watermark block.
pub const BLOCK_END: &[u8] = b"--FANZGUARD-WM-END--";

/// Appends and recovers delimited envelope blocks.
///
/// The envelope JSON sits uncompressed between the markers so the raw
/// signature string stays byte-searchable in the marked file. Re-stamping
/// appends a new block; extraction reads the last one.
pub struct MetadataStrategy;

impl WatermarkStrategy for MetadataStrategy {
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Metadata
    }

    fn supports(&self, data: &[u8]) -> bool {
        !data.is_empty()
    }

    fn embed(&self, data: &[u8], envelope: &WatermarkEnvelope) -> Result<Vec<u8>> {
        let body = envelope.to_json()?;

        let mut out = Vec::with_capacity(data.len() + BLOCK_BEGIN.len() + body.len() + BLOCK_END.len());
        out.extend_from_slice(data);
        out.extend_from_slice(BLOCK_BEGIN);
        out.extend_from_slice(&body);
        out.extend_from_slice(BLOCK_END);
        Ok(out)
    }

    fn try_extract(&self, data: &[u8]) -> Result<Option<WatermarkEnvelope>> {
        let Some(begin) = rfind_subsequence(data, BLOCK_BEGIN) else {
            return Ok(None);
        };

        let body_start = begin + BLOCK_BEGIN.len();
        let Some(end_offset) = find_subsequence(&data[body_start..], BLOCK_END) else {
            return Err(ProvenanceError::Extraction(
                "watermark block opened but never closed".into(),
            ));
        };

        let body = &data[body_start..body_start + end_offset];
        let envelope = WatermarkEnvelope::from_json(body).map_err(|e| {
            ProvenanceError::Extraction(format!("malformed watermark block: {e}"))
        })?;

        Ok(Some(envelope))
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
