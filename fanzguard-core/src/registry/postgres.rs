//! PostgreSQL implementation of the watermark store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{ProvenanceError, Result};
use crate::signature::ForensicSignature;
use crate::watermark::{EmbeddingMethod, WatermarkType};

use super::store::WatermarkStore;
use super::{CreateWatermark, RegistryStats, StolenMark, WatermarkRecord};

/// Connection settings, typically read from the environment.
#[derive(Debug, Clone)]
pub struct PostgresStoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl PostgresStoreConfig {
    /// Read `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS`
    /// (optional, default 10).
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ProvenanceError::Storage("DATABASE_URL is not set".to_string()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

/// PostgreSQL-backed watermark store.
#[derive(Clone)]
pub struct PostgresWatermarkStore {
    pool: PgPool,
}

/// Row type for database queries.
#[derive(FromRow)]
struct WatermarkRow {
    id: Uuid,
    media_asset_id: String,
    watermark_id: String,
    watermark_type: String,
    embedding_method: String,
    payload: serde_json::Value,
    detection_confidence: f64,
    is_valid: bool,
    is_stolen: bool,
    stolen_detected_at: Option<DateTime<Utc>>,
    stolen_platform: Option<String>,
    stolen_url: Option<String>,
    dmca_case_id: Option<String>,
    ip_address: Option<String>,
    device_fingerprint: Option<String>,
    last_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WatermarkRow> for WatermarkRecord {
    type Error = ProvenanceError;

    fn try_from(row: WatermarkRow) -> Result<Self> {
        let watermark_id = ForensicSignature::parse(&row.watermark_id)
            .map_err(|e| ProvenanceError::Storage(format!("corrupt row {}: {e}", row.id)))?;
        let watermark_type = row
            .watermark_type
            .parse::<WatermarkType>()
            .map_err(|e| ProvenanceError::Storage(format!("corrupt row {}: {e}", row.id)))?;
        let embedding_method = row
            .embedding_method
            .parse::<EmbeddingMethod>()
            .map_err(|e| ProvenanceError::Storage(format!("corrupt row {}: {e}", row.id)))?;
        let payload = serde_json::from_value(row.payload).map_err(|e| {
            ProvenanceError::Serialization(format!("payload in row {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            media_asset_id: row.media_asset_id,
            watermark_id,
            watermark_type,
            embedding_method,
            payload,
            detection_confidence: row.detection_confidence,
            is_valid: row.is_valid,
            is_stolen: row.is_stolen,
            stolen_detected_at: row.stolen_detected_at,
            stolen_platform: row.stolen_platform,
            stolen_url: row.stolen_url,
            dmca_case_id: row.dmca_case_id,
            ip_address: row.ip_address,
            device_fingerprint: row.device_fingerprint,
            last_verified_at: row.last_verified_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl PostgresWatermarkStore {
    /// Connect and run migrations.
    pub async fn new(config: &PostgresStoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| ProvenanceError::Storage(format!("connection failed: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ProvenanceError::Storage(format!("migration failed: {e}")))?;

        tracing::info!("Watermark store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Wrap an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify the database connection is alive.
    pub async fn check_health(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl WatermarkStore for PostgresWatermarkStore {
    async fn insert(&self, input: CreateWatermark) -> Result<WatermarkRecord> {
        let payload = serde_json::to_value(&input.payload)
            .map_err(|e| ProvenanceError::Serialization(e.to_string()))?;

        let row: Option<WatermarkRow> = sqlx::query_as(
            r#"
            INSERT INTO watermarks (
                media_asset_id, watermark_id, watermark_type, embedding_method,
                payload, detection_confidence, ip_address, device_fingerprint
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (watermark_id) DO NOTHING
            RETURNING id, media_asset_id, watermark_id, watermark_type, embedding_method,
                      payload, detection_confidence, is_valid, is_stolen,
                      stolen_detected_at, stolen_platform, stolen_url, dmca_case_id,
                      ip_address, device_fingerprint, last_verified_at,
                      created_at, updated_at
            "#,
        )
        .bind(&input.media_asset_id)
        .bind(input.watermark_id.as_str())
        .bind(input.watermark_type.as_str())
        .bind(input.embedding_method.as_str())
        .bind(&payload)
        .bind(input.detection_confidence)
        .bind(&input.ip_address)
        .bind(&input.device_fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        // DO NOTHING means a conflict returns no row.
        let row = row.ok_or_else(|| {
            ProvenanceError::DuplicateWatermark(input.watermark_id.to_string())
        })?;

        tracing::debug!(watermark_id = %input.watermark_id, "Inserted watermark record");

        row.try_into()
    }

    async fn find_by_watermark_id(&self, watermark_id: &str) -> Result<Option<WatermarkRecord>> {
        let row: Option<WatermarkRow> = sqlx::query_as(
            r#"
            SELECT id, media_asset_id, watermark_id, watermark_type, embedding_method,
                   payload, detection_confidence, is_valid, is_stolen,
                   stolen_detected_at, stolen_platform, stolen_url, dmca_case_id,
                   ip_address, device_fingerprint, last_verified_at,
                   created_at, updated_at
            FROM watermarks
            WHERE watermark_id = $1
            "#,
        )
        .bind(watermark_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_asset(&self, media_asset_id: &str) -> Result<Vec<WatermarkRecord>> {
        let rows: Vec<WatermarkRow> = sqlx::query_as(
            r#"
            SELECT id, media_asset_id, watermark_id, watermark_type, embedding_method,
                   payload, detection_confidence, is_valid, is_stolen,
                   stolen_detected_at, stolen_platform, stolen_url, dmca_case_id,
                   ip_address, device_fingerprint, last_verified_at,
                   created_at, updated_at
            FROM watermarks
            WHERE media_asset_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(media_asset_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_stolen(&self, watermark_id: &str, mark: StolenMark) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE watermarks
            SET is_stolen = TRUE,
                stolen_detected_at = $2,
                stolen_platform = $3,
                stolen_url = $4,
                dmca_case_id = COALESCE($5, dmca_case_id),
                updated_at = NOW()
            WHERE watermark_id = $1
            "#,
        )
        .bind(watermark_id)
        .bind(mark.detected_at)
        .bind(&mark.platform)
        .bind(&mark.url)
        .bind(&mark.dmca_case_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn link_case(&self, watermark_id: &str, dmca_case_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE watermarks SET dmca_case_id = $2, updated_at = NOW() WHERE watermark_id = $1",
        )
        .bind(watermark_id)
        .bind(dmca_case_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn retire(&self, watermark_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE watermarks SET is_valid = FALSE, updated_at = NOW() WHERE watermark_id = $1",
        )
        .bind(watermark_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn touch_verified(&self, watermark_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE watermarks SET last_verified_at = $2, updated_at = NOW() WHERE watermark_id = $1",
        )
        .bind(watermark_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> Result<RegistryStats> {
        let (total, stolen, cases): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE is_stolen),
                   COUNT(*) FILTER (WHERE is_stolen AND dmca_case_id IS NOT NULL)
            FROM watermarks
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RegistryStats {
            total_watermarks: total as u64,
            stolen_content: stolen as u64,
            active_dmca_cases: cases as u64,
        })
    }
}
