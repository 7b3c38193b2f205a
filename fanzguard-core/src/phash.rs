//! Sampled-byte perceptual hashing.
//!
//! A deliberately coarse similarity hash: a fixed number of evenly spaced
//! byte samples, hex-encoded positionally so that nearby inputs produce
//! nearby strings. Similarity is the character-equality rate between two
//! equal-length hashes, expressed as a percentage. Hashes from different
//! sampling generations have different lengths and always compare to 0.
//!
//! Production-grade DCT or wavelet hashing can replace this behind the same
//! two-operation contract (`compute` + `similarity`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProvenanceError, Result};

/// Number of evenly spaced byte samples, independent of buffer length.
pub const SAMPLE_COUNT: usize = 64;

/// Default similarity percentage treated as "same content".
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 85.0;

/// A locality-preserving content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerceptualHash(String);

impl PerceptualHash {
    /// Compute the hash of a buffer.
    ///
    /// Samples `SAMPLE_COUNT` bytes at even stride and hex-encodes them in
    /// position, so a localized edit perturbs only the characters near it.
    pub fn compute(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ProvenanceError::Generation(
                "cannot hash empty content".into(),
            ));
        }

        let mut samples = Vec::with_capacity(SAMPLE_COUNT);
        for i in 0..SAMPLE_COUNT {
            let index = (i * data.len()) / SAMPLE_COUNT;
            samples.push(data[index]);
        }

        Ok(Self(hex::encode(samples)))
    }

    /// Reconstruct a hash from its stored hex form.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.is_empty() || !hex_str.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ProvenanceError::Generation(format!(
                "invalid perceptual hash: {hex_str:?}"
            )));
        }
        Ok(Self(hex_str.to_ascii_lowercase()))
    }

    /// Percentage of matching characters between two hashes (0-100).
    ///
    /// Hashes of different lengths come from incompatible sampling
    /// generations and score 0.
    pub fn similarity(&self, other: &Self) -> f64 {
        if self.0.is_empty() || self.0.len() != other.0.len() {
            return 0.0;
        }

        let matching = self
            .0
            .chars()
            .zip(other.0.chars())
            .filter(|(a, b)| a == b)
            .count();

        (matching as f64 / self.0.len() as f64) * 100.0
    }

    /// Whether two hashes meet the similarity threshold (default 85%).
    pub fn is_similar(&self, other: &Self, threshold: Option<f64>) -> bool {
        self.similarity(other) >= threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD)
    }

    /// The hex string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_hash_length_is_fixed() {
        for len in [1, 63, 64, 100, 10_000] {
            let hash = PerceptualHash::compute(&patterned(len)).unwrap();
            assert_eq!(hash.as_str().len(), SAMPLE_COUNT * 2, "len {len}");
        }
    }

    #[test]
    fn test_empty_content_rejected() {
        assert!(PerceptualHash::compute(&[]).is_err());
    }

    #[test]
    fn test_identical_hashes_score_100() {
        let hash = PerceptualHash::compute(&patterned(4096)).unwrap();
        assert_eq!(hash.similarity(&hash), 100.0);
    }

    #[test]
    fn test_length_mismatch_scores_0() {
        let a = PerceptualHash::compute(&patterned(4096)).unwrap();
        let b = PerceptualHash::from_hex("aabb").unwrap();
        assert_eq!(a.similarity(&b), 0.0);
        assert_eq!(b.similarity(&a), 0.0);
    }

    #[test]
    fn test_localized_edit_scores_high() {
        let original = patterned(8192);
        let mut edited = original.clone();
        // Flip a handful of bytes in one region.
        for byte in &mut edited[100..110] {
            *byte = byte.wrapping_add(97);
        }

        let a = PerceptualHash::compute(&original).unwrap();
        let b = PerceptualHash::compute(&edited).unwrap();

        let score = a.similarity(&b);
        assert!(score > 90.0, "localized edit scored {score}");
        assert!(a.is_similar(&b, None));
    }

    #[test]
    fn test_unrelated_content_scores_low() {
        let a = PerceptualHash::compute(&patterned(4096)).unwrap();
        let b = PerceptualHash::compute(&vec![0xEE; 4096]).unwrap();
        assert!(a.similarity(&b) < 50.0);
        assert!(!a.is_similar(&b, None));
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = PerceptualHash::compute(&patterned(2000)).unwrap();
        let b = PerceptualHash::compute(&patterned(2001)).unwrap();
        assert_eq!(a.similarity(&b), b.similarity(&a));
    }

    #[test]
    fn test_from_hex_validation() {
        assert!(PerceptualHash::from_hex("deadbeef").is_ok());
        assert!(PerceptualHash::from_hex("DEADBEEF").is_ok());
        assert!(PerceptualHash::from_hex("").is_err());
        assert!(PerceptualHash::from_hex("not hex!").is_err());
    }

    #[test]
    fn test_from_hex_normalizes_case() {
        let upper = PerceptualHash::from_hex("DEADBEEF").unwrap();
        let lower = PerceptualHash::from_hex("deadbeef").unwrap();
        assert_eq!(upper.similarity(&lower), 100.0);
    }

    #[test]
    fn test_threshold_override() {
        let a = PerceptualHash::from_hex("aaaa").unwrap();
        let b = PerceptualHash::from_hex("aaab").unwrap();
        // 3 of 4 characters match = 75%.
        assert_eq!(a.similarity(&b), 75.0);
        assert!(a.is_similar(&b, Some(70.0)));
        assert!(!a.is_similar(&b, Some(80.0)));
    }
}
