//! High-level provenance service.
//!
//! One entry point for the stamp-and-register path: fingerprint the
//! content, mint a signature, embed the watermark and persist the record,
//! retrying on the (vanishingly rare) signature collision. Extraction,
//! verification and theft investigation are exposed from the same facade.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::error::{ProvenanceError, Result};
use crate::fingerprint::{ContentFingerprint, FingerprintDigest};
use crate::payload::ForensicPayload;
use crate::phash::PerceptualHash;
use crate::registry::{
    CreateWatermark, RegistryStats, WatermarkRegistry, WatermarkStore, WatermarkVerification,
};
use crate::signature::{ForensicSignature, SignatureGenerator};
use crate::watermark::{
    EmbeddingMethod, ExtractionResult, WatermarkEmbedder, WatermarkEnvelope, WatermarkExtractor,
};
use crate::workflow::{Investigation, TheftReport, TheftWorkflow, WorkflowConfig};

/// How many fresh signatures to try when an insert collides.
const MAX_SIGNATURE_ATTEMPTS: u32 = 3;

/// Uploader context recorded alongside a new watermark.
#[derive(Debug, Clone, Default)]
pub struct EmbedContext {
    pub ip_address: Option<String>,
    pub device_fingerprint: Option<String>,
}

/// Everything produced by a stamp-and-register call.
#[derive(Debug, Clone)]
pub struct EmbedOutcome {
    /// The carrier with the watermark applied.
    pub watermarked_content: Vec<u8>,
    pub watermark_id: ForensicSignature,
    /// Storage id of the registered record.
    pub record_id: Uuid,
    /// The method that actually carried the watermark.
    pub method: EmbeddingMethod,
    pub fingerprint: FingerprintDigest,
    pub perceptual_hash: PerceptualHash,
}

/// Facade over embedding, extraction, the registry and investigations.
#[derive(Clone)]
pub struct ProvenanceService {
    registry: WatermarkRegistry,
    embedder: WatermarkEmbedder,
    extractor: WatermarkExtractor,
    workflow: TheftWorkflow,
}

impl ProvenanceService {
    pub fn new(backend: Arc<dyn WatermarkStore>) -> Self {
        Self::with_config(backend, WorkflowConfig::default())
    }

    pub fn with_config(backend: Arc<dyn WatermarkStore>, config: WorkflowConfig) -> Self {
        let registry = WatermarkRegistry::new(backend);
        Self {
            workflow: TheftWorkflow::with_config(registry.clone(), config),
            embedder: WatermarkEmbedder::new(),
            extractor: WatermarkExtractor::new(),
            registry,
        }
    }

    /// Service over a fresh in-memory store (development and tests).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(crate::registry::MemoryWatermarkStore::new()))
    }

    /// Stamp content with a fresh forensic watermark and register it.
    ///
    /// `method = None` picks the highest-assurance method the carrier
    /// supports. An explicit method that fails is retried once as a
    /// metadata tag so the asset never leaves unmarked; the outcome
    /// reports the method actually used.
    #[instrument(level = "info", skip(self, content, payload, context), fields(asset_id = %payload.asset_id, bytes = content.len()))]
    pub async fn embed_for_asset(
        &self,
        content: &[u8],
        payload: ForensicPayload,
        method: Option<EmbeddingMethod>,
        context: EmbedContext,
    ) -> Result<EmbedOutcome> {
        let fingerprint = ContentFingerprint::digest(content)?;
        let perceptual_hash = PerceptualHash::compute(content)?;

        for attempt in 1..=MAX_SIGNATURE_ATTEMPTS {
            let watermark_id = SignatureGenerator::generate();
            let envelope = WatermarkEnvelope::new(watermark_id.clone(), payload.clone())?;

            let (marked, used_method) = match self.embedder.embed(content, &envelope, method) {
                Ok(pair) => pair,
                Err(ProvenanceError::Embedding { method: failed, reason })
                    if failed != EmbeddingMethod::Metadata.as_str() =>
                {
                    tracing::warn!(
                        method = %failed,
                        %reason,
                        "Embedding failed, falling back to metadata tag"
                    );
                    self.embedder
                        .embed(content, &envelope, Some(EmbeddingMethod::Metadata))?
                }
                Err(e) => return Err(e),
            };

            let input = CreateWatermark {
                media_asset_id: payload.asset_id.clone(),
                watermark_id: watermark_id.clone(),
                watermark_type: used_method.watermark_type(),
                embedding_method: used_method,
                payload: payload.clone(),
                detection_confidence: envelope.confidence(),
                ip_address: context.ip_address.clone(),
                device_fingerprint: context.device_fingerprint.clone(),
            };

            match self.registry.store(input).await {
                Ok(record) => {
                    tracing::info!(
                        watermark_id = %watermark_id,
                        method = %used_method,
                        "Asset watermarked and registered"
                    );
                    return Ok(EmbedOutcome {
                        watermarked_content: marked,
                        watermark_id,
                        record_id: record.id,
                        method: used_method,
                        fingerprint,
                        perceptual_hash,
                    });
                }
                Err(ProvenanceError::DuplicateWatermark(id)) => {
                    tracing::warn!(attempt, watermark_id = %id, "Signature collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProvenanceError::Generation(format!(
            "could not allocate a unique watermark id after {MAX_SIGNATURE_ATTEMPTS} attempts"
        )))
    }

    /// Recover a watermark from content, if any strategy finds one.
    pub fn extract(&self, content: &[u8]) -> ExtractionResult {
        self.extractor.extract(content)
    }

    /// Verify a recovered watermark id against the registry.
    pub async fn verify(&self, watermark_id: &str) -> Result<WatermarkVerification> {
        self.registry.verify(watermark_id).await
    }

    /// Run a suspected-theft report through the investigation workflow.
    pub async fn investigate(&self, report: &TheftReport) -> Result<Investigation> {
        self.workflow.investigate(report).await
    }

    /// Attach a takedown case to a flagged investigation.
    pub async fn link_case(
        &self,
        investigation: &mut Investigation,
        dmca_case_id: &str,
    ) -> Result<bool> {
        self.workflow.link_case(investigation, dmca_case_id).await
    }

    /// Perceptual similarity between two buffers, 0-100.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Result<f64> {
        let hash_a = PerceptualHash::compute(a)?;
        let hash_b = PerceptualHash::compute(b)?;
        Ok(hash_a.similarity(&hash_b))
    }

    /// Three-segment fingerprint of a buffer.
    pub fn fingerprint(&self, content: &[u8]) -> Result<FingerprintDigest> {
        ContentFingerprint::digest(content)
    }

    /// Aggregate registry statistics.
    pub async fn stats(&self) -> Result<RegistryStats> {
        self.registry.stats().await
    }

    /// Direct access to the registry for record-level operations.
    pub fn registry(&self) -> &WatermarkRegistry {
        &self.registry
    }
}
