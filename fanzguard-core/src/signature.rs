//! Forensic signature generation.
//!
//! Every watermarked asset carries a globally unique, human-shareable
//! identifier of the form `FANZ-` followed by 20 uppercase hex characters
//! (10 bytes of OS entropy). Signatures are never derived from content, so
//! two uploads of the same file get distinct identifiers.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{ProvenanceError, Result};

/// Prefix shared by every forensic signature.
pub const SIGNATURE_PREFIX: &str = "FANZ-";

/// Number of random bytes behind the hex portion.
pub const SIGNATURE_BYTES: usize = 10;

/// Length of the hex portion (two characters per byte).
pub const SIGNATURE_HEX_LEN: usize = SIGNATURE_BYTES * 2;

/// A validated forensic signature.
///
/// The wire form is the plain string (`FANZ-AABB...`), kept uppercase so the
/// extractor can locate it with a raw byte-pattern search even inside
/// otherwise opaque carriers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForensicSignature(String);

impl ForensicSignature {
    /// Validate an externally supplied signature string.
    pub fn parse(input: &str) -> Result<Self> {
        let hex_part = input.strip_prefix(SIGNATURE_PREFIX).ok_or_else(|| {
            ProvenanceError::Generation(format!(
                "signature must start with {SIGNATURE_PREFIX}, got {input:?}"
            ))
        })?;

        if hex_part.len() != SIGNATURE_HEX_LEN {
            return Err(ProvenanceError::Generation(format!(
                "signature hex portion must be {SIGNATURE_HEX_LEN} characters, got {}",
                hex_part.len()
            )));
        }

        if !hex_part
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        {
            return Err(ProvenanceError::Generation(format!(
                "signature hex portion must be uppercase hex, got {hex_part:?}"
            )));
        }

        Ok(Self(input.to_string()))
    }

    /// The full signature string, including the prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 20-character hex portion without the prefix.
    pub fn hex_part(&self) -> &str {
        &self.0[SIGNATURE_PREFIX.len()..]
    }
}

impl fmt::Display for ForensicSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ForensicSignature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mints fresh forensic signatures from OS entropy.
pub struct SignatureGenerator;

impl SignatureGenerator {
    /// Generate a new signature. Pure and infallible: no content, no state.
    pub fn generate() -> ForensicSignature {
        let mut bytes = [0u8; SIGNATURE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        ForensicSignature(format!("{SIGNATURE_PREFIX}{}", hex::encode_upper(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generated_signature_format() {
        let sig = SignatureGenerator::generate();
        assert!(sig.as_str().starts_with(SIGNATURE_PREFIX));
        assert_eq!(sig.hex_part().len(), SIGNATURE_HEX_LEN);
        assert!(sig
            .hex_part()
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_generated_signature_parses_back() {
        let sig = SignatureGenerator::generate();
        let parsed = ForensicSignature::parse(sig.as_str()).unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn test_parse_rejects_bad_prefix() {
        assert!(ForensicSignature::parse("GUARD-AABBCCDDEEFF00112233").is_err());
        assert!(ForensicSignature::parse("AABBCCDDEEFF00112233").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_length() {
        assert!(ForensicSignature::parse("FANZ-AABB").is_err());
        assert!(ForensicSignature::parse("FANZ-AABBCCDDEEFF0011223344").is_err());
    }

    #[test]
    fn test_parse_rejects_lowercase_and_nonhex() {
        assert!(ForensicSignature::parse("FANZ-aabbccddeeff00112233").is_err());
        assert!(ForensicSignature::parse("FANZ-AABBCCDDEEFF001122GG").is_err());
    }

    #[test]
    fn test_parse_accepts_valid() {
        let sig = ForensicSignature::parse("FANZ-AABBCCDDEEFF00112233").unwrap();
        assert_eq!(sig.hex_part(), "AABBCCDDEEFF00112233");
        assert_eq!(sig.to_string(), "FANZ-AABBCCDDEEFF00112233");
    }

    #[test]
    fn test_ten_thousand_signatures_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let sig = SignatureGenerator::generate();
            assert!(
                seen.insert(sig.as_str().to_string()),
                "duplicate signature generated: {sig}"
            );
        }
        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn test_serde_is_transparent() {
        let sig = ForensicSignature::parse("FANZ-AABBCCDDEEFF00112233").unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, "\"FANZ-AABBCCDDEEFF00112233\"");

        let back: ForensicSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
