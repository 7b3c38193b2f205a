//! In-memory watermark store backed by a concurrent map.
//!
//! Suitable for development, tests and single-process deployments where
//! persistence across restarts is not required.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{ProvenanceError, Result};

use super::store::WatermarkStore;
use super::{CreateWatermark, RegistryStats, StolenMark, WatermarkRecord};

/// Concurrent map keyed by the watermark id string.
#[derive(Default)]
pub struct MemoryWatermarkStore {
    records: DashMap<String, WatermarkRecord>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, watermark_id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut WatermarkRecord),
    {
        match self.records.get_mut(watermark_id) {
            Some(mut record) => {
                apply(&mut record);
                record.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn insert(&self, input: CreateWatermark) -> Result<WatermarkRecord> {
        // Entry keeps the uniqueness check and the insert atomic.
        match self.records.entry(input.watermark_id.as_str().to_string()) {
            Entry::Occupied(_) => Err(ProvenanceError::DuplicateWatermark(
                input.watermark_id.to_string(),
            )),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let record = WatermarkRecord {
                    id: Uuid::new_v4(),
                    media_asset_id: input.media_asset_id,
                    watermark_id: input.watermark_id,
                    watermark_type: input.watermark_type,
                    embedding_method: input.embedding_method,
                    payload: input.payload,
                    detection_confidence: input.detection_confidence,
                    is_valid: true,
                    is_stolen: false,
                    stolen_detected_at: None,
                    stolen_platform: None,
                    stolen_url: None,
                    dmca_case_id: None,
                    ip_address: input.ip_address,
                    device_fingerprint: input.device_fingerprint,
                    last_verified_at: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn find_by_watermark_id(&self, watermark_id: &str) -> Result<Option<WatermarkRecord>> {
        Ok(self.records.get(watermark_id).map(|r| r.clone()))
    }

    async fn list_for_asset(&self, media_asset_id: &str) -> Result<Vec<WatermarkRecord>> {
        let mut records: Vec<WatermarkRecord> = self
            .records
            .iter()
            .filter(|r| r.media_asset_id == media_asset_id)
            .map(|r| r.clone())
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn mark_stolen(&self, watermark_id: &str, mark: StolenMark) -> Result<bool> {
        Ok(self.update(watermark_id, |record| {
            record.is_stolen = true;
            record.stolen_detected_at = Some(mark.detected_at);
            record.stolen_platform = Some(mark.platform);
            record.stolen_url = Some(mark.url);
            if let Some(case) = mark.dmca_case_id {
                record.dmca_case_id = Some(case);
            }
        }))
    }

    async fn link_case(&self, watermark_id: &str, dmca_case_id: &str) -> Result<bool> {
        Ok(self.update(watermark_id, |record| {
            record.dmca_case_id = Some(dmca_case_id.to_string());
        }))
    }

    async fn retire(&self, watermark_id: &str) -> Result<bool> {
        Ok(self.update(watermark_id, |record| {
            record.is_valid = false;
        }))
    }

    async fn touch_verified(&self, watermark_id: &str, at: DateTime<Utc>) -> Result<bool> {
        Ok(self.update(watermark_id, |record| {
            record.last_verified_at = Some(at);
        }))
    }

    async fn stats(&self) -> Result<RegistryStats> {
        let mut stats = RegistryStats {
            total_watermarks: 0,
            stolen_content: 0,
            active_dmca_cases: 0,
        };
        for record in self.records.iter() {
            stats.total_watermarks += 1;
            if record.is_stolen {
                stats.stolen_content += 1;
                if record.dmca_case_id.is_some() {
                    stats.active_dmca_cases += 1;
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ForensicPayload;
    use crate::signature::{ForensicSignature, SignatureGenerator};
    use crate::watermark::{EmbeddingMethod, WatermarkType};

    fn input_with_id(watermark_id: ForensicSignature) -> CreateWatermark {
        CreateWatermark {
            media_asset_id: "asset-1".to_string(),
            watermark_id,
            watermark_type: WatermarkType::MetadataTag,
            embedding_method: EmbeddingMethod::Metadata,
            payload: ForensicPayload::new("creator-1", "platform-1", "asset-1"),
            detection_confidence: 95.0,
            ip_address: Some("203.0.113.7".to_string()),
            device_fingerprint: None,
        }
    }

    fn mark(platform: &str, case: Option<&str>) -> StolenMark {
        StolenMark {
            detected_at: Utc::now(),
            platform: platform.to_string(),
            url: format!("https://{platform}/leak"),
            dmca_case_id: case.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_keeps_first_record() {
        let store = MemoryWatermarkStore::new();
        let id = SignatureGenerator::generate();

        let first = store.insert(input_with_id(id.clone())).await.unwrap();

        let mut second = input_with_id(id.clone());
        second.media_asset_id = "asset-other".to_string();
        second.payload.asset_id = "asset-other".to_string();
        let err = store.insert(second).await.unwrap_err();
        assert!(matches!(err, ProvenanceError::DuplicateWatermark(_)));

        let stored = store
            .find_by_watermark_id(id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.media_asset_id, "asset-1");
    }

    #[tokio::test]
    async fn test_remark_refreshes_detection_keeps_case() {
        let store = MemoryWatermarkStore::new();
        let id = SignatureGenerator::generate();
        store.insert(input_with_id(id.clone())).await.unwrap();

        assert!(store
            .mark_stolen(id.as_str(), mark("pirate.example", Some("DMCA-1")))
            .await
            .unwrap());
        let first = store
            .find_by_watermark_id(id.as_str())
            .await
            .unwrap()
            .unwrap();

        // Second sighting on a different platform, no case supplied.
        assert!(store
            .mark_stolen(id.as_str(), mark("mirror.example", None))
            .await
            .unwrap());
        let second = store
            .find_by_watermark_id(id.as_str())
            .await
            .unwrap()
            .unwrap();

        assert!(second.is_stolen);
        assert_eq!(second.stolen_platform.as_deref(), Some("mirror.example"));
        assert!(second.stolen_detected_at >= first.stolen_detected_at);
        // The original case id survives a mark without one.
        assert_eq!(second.dmca_case_id.as_deref(), Some("DMCA-1"));
    }

    #[tokio::test]
    async fn test_updates_on_unknown_id_return_false() {
        let store = MemoryWatermarkStore::new();
        assert!(!store
            .mark_stolen("FANZ-AABBCCDDEEFF00112233", mark("x", None))
            .await
            .unwrap());
        assert!(!store
            .link_case("FANZ-AABBCCDDEEFF00112233", "DMCA-1")
            .await
            .unwrap());
        assert!(!store.retire("FANZ-AABBCCDDEEFF00112233").await.unwrap());
        assert!(!store
            .touch_verified("FANZ-AABBCCDDEEFF00112233", Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_touch_verified_bumps_updated_at() {
        let store = MemoryWatermarkStore::new();
        let id = SignatureGenerator::generate();
        let created = store.insert(input_with_id(id.clone())).await.unwrap();

        let at = Utc::now();
        assert!(store.touch_verified(id.as_str(), at).await.unwrap());

        let stored = store
            .find_by_watermark_id(id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_verified_at, Some(at));
        assert!(stored.updated_at >= created.updated_at);
    }
}
