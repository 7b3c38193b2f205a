//! Forensic payload carried inside every watermark.
//!
//! The JSON field names are part of the wire contract with the upload and
//! report pipelines; do not rename them.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current payload schema version.
pub const CURRENT_PAYLOAD_VERSION: u32 = 1;

/// Provenance data embedded into a media asset.
///
/// `viewer_id` and `session_id` identify the distribution context for
/// per-viewer stamping (who received this copy); both are omitted from the
/// wire form when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForensicPayload {
    pub creator_id: String,
    pub platform_id: String,
    pub asset_id: String,
    /// Unix timestamp in milliseconds.
    pub upload_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Schema version; older payloads without the field decode as version 1.
    #[serde(default = "default_payload_version")]
    pub version: u32,
}

fn default_payload_version() -> u32 {
    CURRENT_PAYLOAD_VERSION
}

impl ForensicPayload {
    /// Create a payload for an upload happening now.
    pub fn new(
        creator_id: impl Into<String>,
        platform_id: impl Into<String>,
        asset_id: impl Into<String>,
    ) -> Self {
        Self {
            creator_id: creator_id.into(),
            platform_id: platform_id.into(),
            asset_id: asset_id.into(),
            upload_timestamp: Utc::now().timestamp_millis(),
            viewer_id: None,
            session_id: None,
            version: CURRENT_PAYLOAD_VERSION,
        }
    }

    /// Set the upload timestamp (Unix milliseconds).
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.upload_timestamp = timestamp_ms;
        self
    }

    /// Attach the viewer this copy was delivered to.
    pub fn with_viewer(mut self, viewer_id: impl Into<String>) -> Self {
        self.viewer_id = Some(viewer_id.into());
        self
    }

    /// Attach the delivery session identifier.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let payload = ForensicPayload::new("creator-1", "platform-1", "asset-1")
            .with_timestamp(1_700_000_000_000)
            .with_viewer("viewer-9")
            .with_session("session-4");

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"creatorId\":\"creator-1\""));
        assert!(json.contains("\"platformId\":\"platform-1\""));
        assert!(json.contains("\"assetId\":\"asset-1\""));
        assert!(json.contains("\"uploadTimestamp\":1700000000000"));
        assert!(json.contains("\"viewerId\":\"viewer-9\""));
        assert!(json.contains("\"sessionId\":\"session-4\""));
        assert!(json.contains("\"version\":1"));
    }

    #[test]
    fn test_absent_optionals_are_omitted() {
        let payload = ForensicPayload::new("c", "p", "a");
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("viewerId"));
        assert!(!json.contains("sessionId"));
    }

    #[test]
    fn test_version_defaults_when_missing() {
        // Payloads written before the version field existed.
        let json = r#"{
            "creatorId": "c",
            "platformId": "p",
            "assetId": "a",
            "uploadTimestamp": 1700000000000
        }"#;
        let payload: ForensicPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.version, CURRENT_PAYLOAD_VERSION);
        assert_eq!(payload.viewer_id, None);
    }

    #[test]
    fn test_roundtrip_preserves_equality() {
        let payload = ForensicPayload::new("c", "p", "a")
            .with_timestamp(42)
            .with_viewer("v");
        let json = serde_json::to_string(&payload).unwrap();
        let back: ForensicPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_new_uses_current_time() {
        let before = Utc::now().timestamp_millis();
        let payload = ForensicPayload::new("c", "p", "a");
        let after = Utc::now().timestamp_millis();
        assert!(payload.upload_timestamp >= before && payload.upload_timestamp <= after);
    }
}
