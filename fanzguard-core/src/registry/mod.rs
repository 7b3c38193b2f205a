//! Watermark registry: persistence and lifecycle for watermark records.
//!
//! The registry owns the domain rules (asset binding, idempotent theft
//! flags, audit-friendly retirement) and delegates persistence to a
//! [`WatermarkStore`] backend. Two backends ship: an in-memory store for
//! development and tests, and a PostgreSQL store behind the `postgres`
//! feature.
//!
//! Records are never physically deleted; a superseded watermark is retired
//! by clearing `is_valid` so the audit trail stays intact.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;

pub use memory::MemoryWatermarkStore;
#[cfg(feature = "postgres")]
pub use postgres::{PostgresStoreConfig, PostgresWatermarkStore};
pub use store::WatermarkStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ProvenanceError, Result};
use crate::payload::ForensicPayload;
use crate::signature::ForensicSignature;
use crate::watermark::{EmbeddingMethod, WatermarkType};

/// A watermark record as persisted.
///
/// One record per embedding event. After creation only the validity,
/// theft, case-linkage and verification-time fields change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkRecord {
    /// Storage-assigned identifier.
    pub id: Uuid,
    /// The asset this watermark was embedded into.
    pub media_asset_id: String,
    /// The forensic signature recovered during extraction.
    pub watermark_id: ForensicSignature,
    pub watermark_type: WatermarkType,
    pub embedding_method: EmbeddingMethod,
    /// The embedded payload, stored verbatim for later comparison.
    pub payload: ForensicPayload,
    /// Detection confidence at embed time, 0-100.
    pub detection_confidence: f64,
    pub is_valid: bool,
    pub is_stolen: bool,
    pub stolen_detected_at: Option<DateTime<Utc>>,
    pub stolen_platform: Option<String>,
    pub stolen_url: Option<String>,
    pub dmca_case_id: Option<String>,
    /// Uploader context captured at embed time.
    pub ip_address: Option<String>,
    pub device_fingerprint: Option<String>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new watermark.
#[derive(Debug, Clone)]
pub struct CreateWatermark {
    pub media_asset_id: String,
    pub watermark_id: ForensicSignature,
    pub watermark_type: WatermarkType,
    pub embedding_method: EmbeddingMethod,
    pub payload: ForensicPayload,
    pub detection_confidence: f64,
    pub ip_address: Option<String>,
    pub device_fingerprint: Option<String>,
}

/// Theft details applied when a record is flagged.
#[derive(Debug, Clone)]
pub struct StolenMark {
    pub detected_at: DateTime<Utc>,
    pub platform: String,
    pub url: String,
    /// Overwrites an existing case id only when set.
    pub dmca_case_id: Option<String>,
}

/// Result of verifying a recovered watermark identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkVerification {
    pub valid: bool,
    pub is_stolen: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dmca_case_id: Option<String>,
}

impl WatermarkVerification {
    /// The answer for an identifier the registry has never seen.
    pub fn unknown() -> Self {
        Self {
            valid: false,
            is_stolen: false,
            original_creator: None,
            dmca_case_id: None,
        }
    }
}

/// Aggregate registry statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_watermarks: u64,
    pub stolen_content: u64,
    /// Stolen records that already carry a takedown case id.
    pub active_dmca_cases: u64,
}

/// Domain facade over a watermark store backend.
#[derive(Clone)]
pub struct WatermarkRegistry {
    backend: Arc<dyn WatermarkStore>,
}

impl WatermarkRegistry {
    pub fn new(backend: Arc<dyn WatermarkStore>) -> Self {
        Self { backend }
    }

    /// Registry over a fresh in-memory store (development and tests).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryWatermarkStore::new()))
    }

    /// Registry from environment configuration.
    ///
    /// Uses PostgreSQL when `DATABASE_URL` is set, otherwise falls back to
    /// the in-memory store.
    #[cfg(feature = "postgres")]
    pub async fn from_env() -> Result<Self> {
        match PostgresStoreConfig::from_env() {
            Ok(config) => {
                let store = PostgresWatermarkStore::new(&config).await?;
                tracing::info!("Using PostgreSQL watermark store");
                Ok(Self::new(Arc::new(store)))
            }
            Err(_) => {
                tracing::warn!("DATABASE_URL not set, using in-memory watermark store");
                Ok(Self::in_memory())
            }
        }
    }

    /// Register one watermark record.
    ///
    /// The payload must reference the asset the record is attached to;
    /// a mismatch is an integrity fault, not a storage one. Identifier
    /// uniqueness is enforced atomically by the backend.
    pub async fn store(&self, input: CreateWatermark) -> Result<WatermarkRecord> {
        if input.payload.asset_id != input.media_asset_id {
            return Err(ProvenanceError::Integrity {
                watermark_id: input.watermark_id.to_string(),
                expected: input.media_asset_id.clone(),
                found: input.payload.asset_id.clone(),
            });
        }

        let record = self.backend.insert(input).await?;
        tracing::debug!(
            watermark_id = %record.watermark_id,
            media_asset_id = %record.media_asset_id,
            "Registered watermark"
        );
        Ok(record)
    }

    /// Point lookup by forensic signature.
    pub async fn find(&self, watermark_id: &str) -> Result<Option<WatermarkRecord>> {
        self.backend.find_by_watermark_id(watermark_id).await
    }

    /// Verify a recovered identifier against the registry.
    ///
    /// Unknown identifiers yield the default not-valid/not-stolen answer
    /// rather than an error. Known records get their `last_verified_at`
    /// refreshed.
    pub async fn verify(&self, watermark_id: &str) -> Result<WatermarkVerification> {
        let Some(record) = self.backend.find_by_watermark_id(watermark_id).await? else {
            tracing::debug!(watermark_id, "Verification miss: unknown watermark");
            return Ok(WatermarkVerification::unknown());
        };

        self.backend.touch_verified(watermark_id, Utc::now()).await?;

        Ok(WatermarkVerification {
            valid: record.is_valid,
            is_stolen: record.is_stolen,
            original_creator: Some(record.payload.creator_id),
            dmca_case_id: record.dmca_case_id,
        })
    }

    /// Flag a watermark as found on stolen content. Idempotent: re-flagging
    /// refreshes the detection time, platform and URL.
    ///
    /// Returns whether a record was updated.
    pub async fn flag_stolen(
        &self,
        watermark_id: &str,
        stolen_platform: &str,
        stolen_url: &str,
        dmca_case_id: Option<&str>,
    ) -> Result<bool> {
        let mark = StolenMark {
            detected_at: Utc::now(),
            platform: stolen_platform.to_string(),
            url: stolen_url.to_string(),
            dmca_case_id: dmca_case_id.map(str::to_string),
        };

        let updated = self.backend.mark_stolen(watermark_id, mark).await?;
        if updated {
            tracing::info!(watermark_id, stolen_platform, "Watermark flagged as stolen");
        } else {
            tracing::warn!(watermark_id, "Flag requested for unknown watermark");
        }
        Ok(updated)
    }

    /// Attach a takedown case id to a record.
    pub async fn link_case(&self, watermark_id: &str, dmca_case_id: &str) -> Result<bool> {
        let updated = self.backend.link_case(watermark_id, dmca_case_id).await?;
        if updated {
            tracing::info!(watermark_id, dmca_case_id, "DMCA case linked");
        }
        Ok(updated)
    }

    /// Retire a watermark (superseded by a re-stamp). The record stays in
    /// the registry for the audit trail.
    pub async fn retire(&self, watermark_id: &str) -> Result<bool> {
        let updated = self.backend.retire(watermark_id).await?;
        if updated {
            tracing::info!(watermark_id, "Watermark retired");
        }
        Ok(updated)
    }

    /// Every record embedded into the given asset, oldest first.
    pub async fn list_for_asset(&self, media_asset_id: &str) -> Result<Vec<WatermarkRecord>> {
        self.backend.list_for_asset(media_asset_id).await
    }

    /// Aggregate statistics.
    pub async fn stats(&self) -> Result<RegistryStats> {
        self.backend.stats().await
    }
}
