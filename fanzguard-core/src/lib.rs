//! FanzGuard Core - Forensic content-provenance library
//!
//! This crate provides the primitives for protecting creator media:
//! forensic watermarks that survive in the content itself, a registry that
//! ties every watermark to its creator, and an investigation workflow for
//! content found in the wild.
//!
//! # Features
//!
//! - Globally unique forensic signatures (`FANZ-` + 20 hex characters)
//! - Tamper-evident three-segment content fingerprints (SHA3-256)
//! - Sampled-byte perceptual hashing for re-upload detection
//! - Steganographic watermark embedding with automatic strategy selection
//!   (LSB for images, metadata tag for everything else)
//! - Watermark registry with in-memory and PostgreSQL backends
//! - Theft investigation workflow with a full state history per case
//!
//! # Example
//!
//! ```no_run
//! use fanzguard_core::{EmbedContext, ForensicPayload, ProvenanceService};
//!
//! # async fn example() -> fanzguard_core::Result<()> {
//! let service = ProvenanceService::in_memory();
//!
//! // Stamp an upload with a forensic watermark and register it
//! let content = b"creator content".to_vec();
//! let payload = ForensicPayload::new("creator-1", "fanz", "asset-1");
//! let outcome = service
//!     .embed_for_asset(&content, payload, None, EmbedContext::default())
//!     .await?;
//!
//! // Later: recover the watermark and check it against the registry
//! let extraction = service.extract(&outcome.watermarked_content);
//! assert!(extraction.found);
//!
//! let verification = service.verify(outcome.watermark_id.as_str()).await?;
//! assert!(verification.valid);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fingerprint;
pub mod payload;
pub mod phash;
pub mod registry;
pub mod service;
pub mod signature;
pub mod watermark;
pub mod workflow;

// Re-export main types for convenience
pub use error::{ProvenanceError, Result};
pub use fingerprint::{ContentFingerprint, FingerprintDigest, FINGERPRINT_WINDOW};
pub use payload::{ForensicPayload, CURRENT_PAYLOAD_VERSION};
pub use phash::{PerceptualHash, DEFAULT_SIMILARITY_THRESHOLD, SAMPLE_COUNT};
pub use registry::{
    CreateWatermark, MemoryWatermarkStore, RegistryStats, StolenMark, WatermarkRecord,
    WatermarkRegistry, WatermarkStore, WatermarkVerification,
};
pub use service::{EmbedContext, EmbedOutcome, ProvenanceService};
pub use signature::{ForensicSignature, SignatureGenerator, SIGNATURE_PREFIX};
pub use watermark::{
    EmbeddingMethod, ExtractionResult, MetadataStrategy, WatermarkEmbedder, WatermarkEnvelope,
    WatermarkExtractor, WatermarkStrategy, WatermarkType, EXACT_MATCH_CONFIDENCE,
    PARTIAL_MATCH_CONFIDENCE,
};
pub use workflow::{Investigation, InvestigationState, TheftReport, TheftWorkflow, WorkflowConfig};

// PostgreSQL-backed registry (requires a database)
#[cfg(feature = "postgres")]
pub use registry::{PostgresStoreConfig, PostgresWatermarkStore};

// Image steganography exports
#[cfg(feature = "stego")]
pub use watermark::LsbStrategy;
