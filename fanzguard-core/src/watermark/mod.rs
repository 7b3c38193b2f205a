//! Watermark embedding and extraction.
//!
//! Strategies implement [`WatermarkStrategy`] and are dispatched through an
//! ordered table, highest assurance first:
//!
//! - **lsb** - bit-plane steganography for decodable images (`stego` feature)
//! - **dct** / **dwt** - transform-domain slots; registered but decline every
//!   carrier until a per-codec implementation is wired in
//! - **metadata** - delimited trailing JSON block; always available, lowest
//!   assurance
//!
//! Extraction walks the same order and returns the first hit. Strategy
//! faults never escape [`WatermarkExtractor::extract`]; a failing strategy
//! simply counts as a miss.

pub mod envelope;
pub mod frequency;
#[cfg(feature = "stego")]
pub mod lsb;
pub mod metadata;

pub use envelope::{
    WatermarkEnvelope, CURRENT_ENVELOPE_VERSION, EXACT_MATCH_CONFIDENCE, PARTIAL_MATCH_CONFIDENCE,
};
pub use frequency::{DctStrategy, DwtStrategy};
#[cfg(feature = "stego")]
pub use lsb::LsbStrategy;
pub use metadata::MetadataStrategy;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ProvenanceError, Result};
use crate::payload::ForensicPayload;
use crate::signature::ForensicSignature;

/// How a watermark is hidden in the carrier bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMethod {
    Lsb,
    Dct,
    Dwt,
    Metadata,
}

impl EmbeddingMethod {
    /// Stable string form, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lsb => "lsb",
            Self::Dct => "dct",
            Self::Dwt => "dwt",
            Self::Metadata => "metadata",
        }
    }

    /// The record classification for this method.
    pub fn watermark_type(&self) -> WatermarkType {
        match self {
            Self::Lsb | Self::Dct | Self::Dwt => WatermarkType::InvisibleSteganography,
            Self::Metadata => WatermarkType::MetadataTag,
        }
    }
}

impl fmt::Display for EmbeddingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingMethod {
    type Err = ProvenanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lsb" => Ok(Self::Lsb),
            "dct" => Ok(Self::Dct),
            "dwt" => Ok(Self::Dwt),
            "metadata" => Ok(Self::Metadata),
            other => Err(ProvenanceError::Generation(format!(
                "unknown embedding method: {other:?}"
            ))),
        }
    }
}

/// Coarse watermark classification stored on every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkType {
    InvisibleSteganography,
    MetadataTag,
}

impl WatermarkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvisibleSteganography => "invisible-steganography",
            Self::MetadataTag => "metadata-tag",
        }
    }
}

impl fmt::Display for WatermarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatermarkType {
    type Err = ProvenanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "invisible-steganography" => Ok(Self::InvisibleSteganography),
            "metadata-tag" => Ok(Self::MetadataTag),
            other => Err(ProvenanceError::Generation(format!(
                "unknown watermark type: {other:?}"
            ))),
        }
    }
}

/// A single embedding technique.
///
/// Implementations must be thread-safe (`Send + Sync`); embedding and
/// extraction are pure over the input buffer and safe to run in parallel
/// across assets.
pub trait WatermarkStrategy: Send + Sync {
    /// The method this strategy implements.
    fn method(&self) -> EmbeddingMethod;

    /// Whether this strategy can embed into the given carrier.
    fn supports(&self, data: &[u8]) -> bool;

    /// Produce a new buffer carrying the envelope. The input is never
    /// modified in place.
    fn embed(&self, data: &[u8], envelope: &WatermarkEnvelope) -> Result<Vec<u8>>;

    /// Attempt to recover an envelope. `Ok(None)` means this strategy found
    /// nothing; `Err` means the carrier looked marked but could not be
    /// decoded.
    fn try_extract(&self, data: &[u8]) -> Result<Option<WatermarkEnvelope>>;
}

/// Outcome of an extraction pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_id: Option<ForensicSignature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ForensicPayload>,
    /// Detection confidence, 0-100.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<EmbeddingMethod>,
}

impl ExtractionResult {
    /// The all-miss result.
    pub fn not_found() -> Self {
        Self {
            found: false,
            watermark_id: None,
            payload: None,
            confidence: 0.0,
            method: None,
        }
    }

    fn from_envelope(envelope: WatermarkEnvelope, method: EmbeddingMethod) -> Self {
        let confidence = envelope.confidence();
        Self {
            found: true,
            watermark_id: Some(envelope.watermark_id),
            payload: Some(envelope.payload),
            confidence,
            method: Some(method),
        }
    }
}

/// The built-in strategy table in extraction priority order.
fn default_strategies() -> Vec<Arc<dyn WatermarkStrategy>> {
    let mut strategies: Vec<Arc<dyn WatermarkStrategy>> = Vec::new();
    #[cfg(feature = "stego")]
    strategies.push(Arc::new(LsbStrategy));
    strategies.push(Arc::new(DctStrategy));
    strategies.push(Arc::new(DwtStrategy));
    strategies.push(Arc::new(MetadataStrategy));
    strategies
}

/// Embeds watermarks by dispatching over the strategy table.
#[derive(Clone)]
pub struct WatermarkEmbedder {
    strategies: Vec<Arc<dyn WatermarkStrategy>>,
}

impl WatermarkEmbedder {
    pub fn new() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }

    /// Build an embedder with a custom strategy table (priority order).
    pub fn with_strategies(strategies: Vec<Arc<dyn WatermarkStrategy>>) -> Self {
        Self { strategies }
    }

    /// The highest-assurance method that supports the given carrier.
    pub fn preferred_method(&self, data: &[u8]) -> EmbeddingMethod {
        self.strategies
            .iter()
            .find(|s| s.supports(data))
            .map(|s| s.method())
            .unwrap_or(EmbeddingMethod::Metadata)
    }

    /// Embed an envelope, returning the marked buffer and the method used.
    ///
    /// With `method = None` the table is walked in priority order and the
    /// first strategy that supports the carrier and succeeds wins, so an
    /// image too small for `lsb` still lands on `metadata`. An explicit
    /// method is strict: if it cannot handle the carrier the call fails with
    /// [`ProvenanceError::Embedding`] and the caller decides whether to fall
    /// back. Embedding never persists anything.
    pub fn embed(
        &self,
        data: &[u8],
        envelope: &WatermarkEnvelope,
        method: Option<EmbeddingMethod>,
    ) -> Result<(Vec<u8>, EmbeddingMethod)> {
        match method {
            Some(method) => {
                let strategy = self
                    .strategies
                    .iter()
                    .find(|s| s.method() == method)
                    .ok_or_else(|| ProvenanceError::Embedding {
                        method: method.as_str().to_string(),
                        reason: "method not registered".to_string(),
                    })?;

                if !strategy.supports(data) {
                    return Err(ProvenanceError::Embedding {
                        method: method.as_str().to_string(),
                        reason: "carrier not supported by this method".to_string(),
                    });
                }

                let marked = strategy.embed(data, envelope)?;
                tracing::debug!(method = %method, input_bytes = data.len(), output_bytes = marked.len(), "Embedded watermark");
                Ok((marked, method))
            }
            None => {
                let mut last_error = None;
                for strategy in &self.strategies {
                    if !strategy.supports(data) {
                        continue;
                    }
                    match strategy.embed(data, envelope) {
                        Ok(marked) => {
                            let method = strategy.method();
                            tracing::debug!(method = %method, input_bytes = data.len(), output_bytes = marked.len(), "Embedded watermark");
                            return Ok((marked, method));
                        }
                        Err(error) => {
                            tracing::debug!(method = %strategy.method(), %error, "Strategy declined carrier, trying next");
                            last_error = Some(error);
                        }
                    }
                }
                Err(last_error.unwrap_or_else(|| ProvenanceError::Embedding {
                    method: "auto".to_string(),
                    reason: "no strategy supports this carrier".to_string(),
                }))
            }
        }
    }
}

impl Default for WatermarkEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// Recovers watermarks by walking the strategy table in priority order.
#[derive(Clone)]
pub struct WatermarkExtractor {
    strategies: Vec<Arc<dyn WatermarkStrategy>>,
}

impl WatermarkExtractor {
    pub fn new() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }

    /// Build an extractor with a custom strategy table (priority order).
    pub fn with_strategies(strategies: Vec<Arc<dyn WatermarkStrategy>>) -> Self {
        Self { strategies }
    }

    /// Run every strategy in order and return the first hit.
    ///
    /// Never fails: a strategy error is logged and treated as a miss for
    /// that strategy, and an all-miss pass yields `found = false` with
    /// confidence 0.
    pub fn extract(&self, data: &[u8]) -> ExtractionResult {
        for strategy in &self.strategies {
            match strategy.try_extract(data) {
                Ok(Some(envelope)) => {
                    let result = ExtractionResult::from_envelope(envelope, strategy.method());
                    tracing::debug!(
                        method = %strategy.method(),
                        confidence = result.confidence,
                        "Watermark recovered"
                    );
                    return result;
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::debug!(method = %strategy.method(), %error, "Strategy failed, continuing");
                }
            }
        }
        ExtractionResult::not_found()
    }
}

impl Default for WatermarkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureGenerator;

    fn sample_envelope() -> WatermarkEnvelope {
        let payload = ForensicPayload::new("creator-1", "platform-1", "asset-1");
        WatermarkEnvelope::new(SignatureGenerator::generate(), payload).unwrap()
    }

    #[test]
    fn test_method_serde_is_lowercase() {
        let json = serde_json::to_string(&EmbeddingMethod::Lsb).unwrap();
        assert_eq!(json, "\"lsb\"");
        let back: EmbeddingMethod = serde_json::from_str("\"metadata\"").unwrap();
        assert_eq!(back, EmbeddingMethod::Metadata);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!(
            "dct".parse::<EmbeddingMethod>().unwrap(),
            EmbeddingMethod::Dct
        );
        assert!("jpeg".parse::<EmbeddingMethod>().is_err());
    }

    #[test]
    fn test_watermark_type_classification() {
        assert_eq!(
            EmbeddingMethod::Lsb.watermark_type(),
            WatermarkType::InvisibleSteganography
        );
        assert_eq!(
            EmbeddingMethod::Dwt.watermark_type(),
            WatermarkType::InvisibleSteganography
        );
        assert_eq!(
            EmbeddingMethod::Metadata.watermark_type(),
            WatermarkType::MetadataTag
        );
    }

    #[test]
    fn test_watermark_type_string_roundtrip() {
        for ty in [WatermarkType::InvisibleSteganography, WatermarkType::MetadataTag] {
            assert_eq!(ty.as_str().parse::<WatermarkType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_preferred_method_for_plain_bytes_is_metadata() {
        let embedder = WatermarkEmbedder::new();
        assert_eq!(
            embedder.preferred_method(b"just some text"),
            EmbeddingMethod::Metadata
        );
    }

    #[test]
    fn test_embed_auto_selects_and_roundtrips() {
        let embedder = WatermarkEmbedder::new();
        let extractor = WatermarkExtractor::new();
        let envelope = sample_envelope();

        let (marked, method) = embedder.embed(b"carrier bytes", &envelope, None).unwrap();
        assert_eq!(method, EmbeddingMethod::Metadata);

        let result = extractor.extract(&marked);
        assert!(result.found);
        assert_eq!(result.watermark_id, Some(envelope.watermark_id.clone()));
        assert_eq!(result.method, Some(EmbeddingMethod::Metadata));
        assert_eq!(result.confidence, EXACT_MATCH_CONFIDENCE);
    }

    #[test]
    fn test_explicit_unsupported_method_errors() {
        let embedder = WatermarkEmbedder::new();
        let envelope = sample_envelope();

        let err = embedder
            .embed(b"plain text", &envelope, Some(EmbeddingMethod::Dct))
            .unwrap_err();
        assert!(matches!(err, ProvenanceError::Embedding { .. }));
    }

    #[test]
    fn test_extract_unmarked_is_clean_miss() {
        let extractor = WatermarkExtractor::new();
        let result = extractor.extract(b"nothing embedded here");
        assert!(!result.found);
        assert_eq!(result.confidence, 0.0);
        assert!(result.watermark_id.is_none());
        assert!(result.payload.is_none());
        assert!(result.method.is_none());
    }

    #[test]
    fn test_extraction_result_serde_shape() {
        let result = ExtractionResult::not_found();
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, "{\"found\":false,\"confidence\":0.0}");
    }

    /// A strategy that always errors; the extractor must treat it as a miss.
    struct PoisonStrategy;

    impl WatermarkStrategy for PoisonStrategy {
        fn method(&self) -> EmbeddingMethod {
            EmbeddingMethod::Dct
        }

        fn supports(&self, _data: &[u8]) -> bool {
            true
        }

        fn embed(&self, _data: &[u8], _envelope: &WatermarkEnvelope) -> Result<Vec<u8>> {
            Err(ProvenanceError::Embedding {
                method: "dct".into(),
                reason: "poisoned".into(),
            })
        }

        fn try_extract(&self, _data: &[u8]) -> Result<Option<WatermarkEnvelope>> {
            Err(ProvenanceError::Extraction("poisoned".into()))
        }
    }

    #[test]
    fn test_failing_strategy_does_not_abort_extraction() {
        let envelope = sample_envelope();
        let embedder = WatermarkEmbedder::new();
        let (marked, _) = embedder
            .embed(b"carrier", &envelope, Some(EmbeddingMethod::Metadata))
            .unwrap();

        let extractor = WatermarkExtractor::with_strategies(vec![
            Arc::new(PoisonStrategy),
            Arc::new(MetadataStrategy),
        ]);

        let result = extractor.extract(&marked);
        assert!(result.found, "later strategy should still run");
        assert_eq!(result.method, Some(EmbeddingMethod::Metadata));
    }

    #[test]
    fn test_priority_order_first_hit_wins() {
        // Two metadata-capable strategies in a custom table; the earlier one
        // must win even though both would extract.
        let envelope_a = sample_envelope();
        let envelope_b = sample_envelope();

        let embedder = WatermarkEmbedder::new();
        let (marked_a, _) = embedder
            .embed(b"carrier", &envelope_a, Some(EmbeddingMethod::Metadata))
            .unwrap();
        // Stamp the already-marked buffer again with a second envelope.
        let (marked_both, _) = embedder
            .embed(&marked_a, &envelope_b, Some(EmbeddingMethod::Metadata))
            .unwrap();

        let extractor = WatermarkExtractor::new();
        let result = extractor.extract(&marked_both);
        assert!(result.found);
        // The metadata strategy reads the last block appended.
        assert_eq!(result.watermark_id, Some(envelope_b.watermark_id));
    }

    /// A carrier holding both an lsb frame and a metadata block must yield
    /// the lsb envelope: higher-assurance strategies run first.
    #[cfg(feature = "stego")]
    #[test]
    fn test_lsb_outranks_metadata_on_dual_marked_carrier() {
        use image::{DynamicImage, ImageFormat, RgbaImage};
        use std::io::Cursor;

        let img = RgbaImage::from_fn(128, 128, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        let mut carrier = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut carrier, ImageFormat::Png)
            .unwrap();

        let pixel_envelope = sample_envelope();
        let trailing_envelope = sample_envelope();

        let lsb_marked = LsbStrategy
            .embed(&carrier.into_inner(), &pixel_envelope)
            .unwrap();
        let dual_marked = MetadataStrategy
            .embed(&lsb_marked, &trailing_envelope)
            .unwrap();

        let result = WatermarkExtractor::new().extract(&dual_marked);
        assert!(result.found);
        assert_eq!(result.method, Some(EmbeddingMethod::Lsb));
        assert_eq!(result.watermark_id, Some(pixel_envelope.watermark_id));
    }
}
