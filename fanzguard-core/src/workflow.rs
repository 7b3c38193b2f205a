//! Theft investigation workflow.
//!
//! Drives a suspected-theft report through extraction, registry
//! verification and, when the sighting is external, the stolen flag. Each
//! investigation keeps its full state history so case reviews can see how
//! an outcome was reached.
//!
//! Terminal states:
//!
//! - `NO_MARK_FOUND` - no watermark recovered from the suspect content
//! - `VERIFICATION_FAILED` - a mark was recovered but the registry could
//!   not confirm ownership (unknown id, retired record, payload mismatch)
//! - `CONFIRMED_OWNER` - ownership confirmed; also terminal for sightings
//!   on the original platform, which are re-uploads rather than theft
//! - `FLAGGED_STOLEN` - confirmed and sighted on a foreign platform
//! - `CASE_LINKED` - a takedown case was attached to a flagged result

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ProvenanceError, Result};
use crate::registry::WatermarkRegistry;
use crate::signature::ForensicSignature;
use crate::watermark::WatermarkExtractor;

/// Investigation lifecycle states, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvestigationState {
    Submitted,
    Extracting,
    NoMarkFound,
    MarkFound,
    Verifying,
    ConfirmedOwner,
    VerificationFailed,
    FlaggedStolen,
    CaseLinked,
}

/// A suspected-theft report submitted for investigation.
#[derive(Debug, Clone)]
pub struct TheftReport {
    /// The content as found in the wild.
    pub suspect_content: Vec<u8>,
    /// Platform the content was sighted on.
    pub source_platform: String,
    /// Where it was sighted.
    pub source_url: String,
}

/// Workflow tuning.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    /// Extractions below this confidence are routed to manual review
    /// instead of auto-flagging. Zero accepts everything.
    pub min_confidence: f64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { min_confidence: 0.0 }
    }
}

/// The record of one investigation, including its state history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Investigation {
    pub state: InvestigationState,
    /// Every state entered, in order, starting with `SUBMITTED`.
    pub history: Vec<InvestigationState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_id: Option<ForensicSignature>,
    /// Extraction confidence, 0-100.
    pub confidence: f64,
    /// True when the extraction fell below the configured confidence floor.
    pub needs_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dmca_case_id: Option<String>,
    pub source_platform: String,
    pub source_url: String,
}

impl Investigation {
    fn open(report: &TheftReport) -> Self {
        Self {
            state: InvestigationState::Submitted,
            history: vec![InvestigationState::Submitted],
            watermark_id: None,
            confidence: 0.0,
            needs_review: false,
            original_creator: None,
            media_asset_id: None,
            dmca_case_id: None,
            source_platform: report.source_platform.clone(),
            source_url: report.source_url.clone(),
        }
    }

    fn advance(&mut self, next: InvestigationState) {
        tracing::debug!(from = ?self.state, to = ?next, "Investigation state change");
        self.state = next;
        self.history.push(next);
    }
}

/// Orchestrates theft investigations against a registry.
#[derive(Clone)]
pub struct TheftWorkflow {
    registry: WatermarkRegistry,
    extractor: WatermarkExtractor,
    config: WorkflowConfig,
}

impl TheftWorkflow {
    pub fn new(registry: WatermarkRegistry) -> Self {
        Self::with_config(registry, WorkflowConfig::default())
    }

    pub fn with_config(registry: WatermarkRegistry, config: WorkflowConfig) -> Self {
        Self {
            registry,
            extractor: WatermarkExtractor::new(),
            config,
        }
    }

    /// Run a report through the full investigation pipeline.
    ///
    /// Extraction and verification misses are outcomes, not errors; `Err`
    /// is reserved for storage faults.
    #[instrument(level = "info", skip(self, report), fields(platform = %report.source_platform, bytes = report.suspect_content.len()))]
    pub async fn investigate(&self, report: &TheftReport) -> Result<Investigation> {
        let mut investigation = Investigation::open(report);

        investigation.advance(InvestigationState::Extracting);
        let extraction = self.extractor.extract(&report.suspect_content);

        let Some(watermark_id) = extraction.watermark_id else {
            investigation.advance(InvestigationState::NoMarkFound);
            tracing::info!("Investigation closed: no watermark recovered");
            return Ok(investigation);
        };

        investigation.advance(InvestigationState::MarkFound);
        investigation.confidence = extraction.confidence;
        investigation.needs_review = extraction.confidence < self.config.min_confidence;
        investigation.watermark_id = Some(watermark_id.clone());

        investigation.advance(InvestigationState::Verifying);
        let Some(record) = self.registry.find(watermark_id.as_str()).await? else {
            investigation.advance(InvestigationState::VerificationFailed);
            tracing::warn!(watermark_id = %watermark_id, "Recovered watermark is not registered");
            return Ok(investigation);
        };

        // A retired record cannot confirm ownership, and the embedded
        // payload must match what was registered at stamp time.
        if !record.is_valid || extraction.payload.as_ref() != Some(&record.payload) {
            investigation.advance(InvestigationState::VerificationFailed);
            tracing::warn!(watermark_id = %watermark_id, "Registry could not confirm ownership");
            return Ok(investigation);
        }

        let verification = self.registry.verify(watermark_id.as_str()).await?;
        investigation.advance(InvestigationState::ConfirmedOwner);
        investigation.original_creator = verification.original_creator;
        investigation.dmca_case_id = verification.dmca_case_id;
        investigation.media_asset_id = Some(record.media_asset_id.clone());

        // Same-platform sightings are re-uploads, not theft.
        let external = report.source_platform != record.payload.platform_id;
        if !external {
            tracing::info!(watermark_id = %watermark_id, "Sighting on home platform, not flagging");
            return Ok(investigation);
        }

        if investigation.needs_review {
            tracing::info!(
                watermark_id = %watermark_id,
                confidence = investigation.confidence,
                "Low-confidence match routed to manual review"
            );
            return Ok(investigation);
        }

        let flagged = self
            .registry
            .flag_stolen(
                watermark_id.as_str(),
                &report.source_platform,
                &report.source_url,
                None,
            )
            .await?;
        if !flagged {
            return Err(ProvenanceError::Storage(format!(
                "watermark {watermark_id} disappeared during investigation"
            )));
        }
        investigation.advance(InvestigationState::FlaggedStolen);
        tracing::info!(watermark_id = %watermark_id, "Content flagged as stolen");

        Ok(investigation)
    }

    /// Attach a takedown case to a flagged investigation.
    ///
    /// Only valid from `FLAGGED_STOLEN`; any other state returns `Ok(false)`
    /// without touching the registry.
    pub async fn link_case(
        &self,
        investigation: &mut Investigation,
        dmca_case_id: &str,
    ) -> Result<bool> {
        if investigation.state != InvestigationState::FlaggedStolen {
            return Ok(false);
        }
        let Some(watermark_id) = &investigation.watermark_id else {
            return Ok(false);
        };

        let linked = self
            .registry
            .link_case(watermark_id.as_str(), dmca_case_id)
            .await?;
        if !linked {
            return Err(ProvenanceError::Storage(format!(
                "watermark {watermark_id} disappeared before case link"
            )));
        }

        investigation.advance(InvestigationState::CaseLinked);
        investigation.dmca_case_id = Some(dmca_case_id.to_string());
        Ok(true)
    }
}
