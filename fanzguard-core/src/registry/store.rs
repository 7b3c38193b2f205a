//! Storage boundary for watermark records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

use super::{CreateWatermark, RegistryStats, StolenMark, WatermarkRecord};

/// Persistence backend for the watermark registry.
///
/// Backends enforce watermark-id uniqueness atomically on insert and
/// return [`crate::error::ProvenanceError::DuplicateWatermark`] on a
/// collision. Update operations return whether a record matched; an
/// unknown id is `Ok(false)`, never an error.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateWatermark` if the
    /// watermark id is already registered.
    async fn insert(&self, input: CreateWatermark) -> Result<WatermarkRecord>;

    /// Fetch a record by its forensic signature.
    async fn find_by_watermark_id(&self, watermark_id: &str) -> Result<Option<WatermarkRecord>>;

    /// All records for an asset, oldest first.
    async fn list_for_asset(&self, media_asset_id: &str) -> Result<Vec<WatermarkRecord>>;

    /// Apply a theft mark. Re-marking refreshes the detection details;
    /// an existing case id is kept unless the mark carries a new one.
    async fn mark_stolen(&self, watermark_id: &str, mark: StolenMark) -> Result<bool>;

    /// Attach a takedown case id.
    async fn link_case(&self, watermark_id: &str, dmca_case_id: &str) -> Result<bool>;

    /// Clear `is_valid`, keeping the record.
    async fn retire(&self, watermark_id: &str) -> Result<bool>;

    /// Record a successful verification at the given time.
    async fn touch_verified(&self, watermark_id: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Aggregate counts over all records.
    async fn stats(&self) -> Result<RegistryStats>;
}
