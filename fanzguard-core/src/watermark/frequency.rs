//! Transform-domain strategy slots (DCT and DWT).
//!
//! Both slots hold their place in the priority order but decline every
//! carrier: `supports` is false, embedding reports the method unavailable,
//! extraction finds nothing. A real coefficient-domain codec drops into
//! either slot by replacing the strategy body; the dispatch table and the
//! extraction order do not change.

use crate::error::{ProvenanceError, Result};
use crate::watermark::{EmbeddingMethod, WatermarkEnvelope, WatermarkStrategy};

/// Discrete cosine transform slot.
pub struct DctStrategy;

impl WatermarkStrategy for DctStrategy {
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Dct
    }

    fn supports(&self, _data: &[u8]) -> bool {
        false
    }

    fn embed(&self, _data: &[u8], _envelope: &WatermarkEnvelope) -> Result<Vec<u8>> {
        Err(ProvenanceError::Embedding {
            method: "dct".to_string(),
            reason: "transform-domain embedding not available".to_string(),
        })
    }

    fn try_extract(&self, _data: &[u8]) -> Result<Option<WatermarkEnvelope>> {
        Ok(None)
    }
}

/// Discrete wavelet transform slot.
pub struct DwtStrategy;

impl WatermarkStrategy for DwtStrategy {
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Dwt
    }

    fn supports(&self, _data: &[u8]) -> bool {
        false
    }

    fn embed(&self, _data: &[u8], _envelope: &WatermarkEnvelope) -> Result<Vec<u8>> {
        Err(ProvenanceError::Embedding {
            method: "dwt".to_string(),
            reason: "transform-domain embedding not available".to_string(),
        })
    }

    fn try_extract(&self, _data: &[u8]) -> Result<Option<WatermarkEnvelope>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ForensicPayload;
    use crate::signature::SignatureGenerator;

    #[test]
    fn test_slots_decline_everything() {
        let payload = ForensicPayload::new("c", "p", "a");
        let envelope = WatermarkEnvelope::new(SignatureGenerator::generate(), payload).unwrap();

        for strategy in [&DctStrategy as &dyn WatermarkStrategy, &DwtStrategy] {
            assert!(!strategy.supports(b"anything"));
            assert!(strategy.embed(b"anything", &envelope).is_err());
            assert!(strategy.try_extract(b"anything").unwrap().is_none());
        }
    }

    #[test]
    fn test_slot_methods() {
        assert_eq!(DctStrategy.method(), EmbeddingMethod::Dct);
        assert_eq!(DwtStrategy.method(), EmbeddingMethod::Dwt);
    }
}
