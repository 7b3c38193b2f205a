//! Common utility functions shared across CLI commands.

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use fanzguard_core::EmbeddingMethod;

/// Build the default output path for a stamped file.
///
/// LSB embedding re-encodes the carrier as PNG, so `photo.jpg` becomes
/// `photo.stamped.png`. Every other method keeps the carrier format:
/// `video.mp4` becomes `video.stamped.mp4`.
pub fn build_stamped_path(file: &Path, method: EmbeddingMethod) -> PathBuf {
    let extension = match method {
        EmbeddingMethod::Lsb => "png".to_string(),
        _ => file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_string(),
    };
    file.with_extension(format!("stamped.{extension}"))
}

/// Format a Unix timestamp (milliseconds) as a human-readable UTC string.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    let secs = timestamp_ms.div_euclid(1000);
    let nsecs = (timestamp_ms.rem_euclid(1000) * 1_000_000) as u32;
    match Utc.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => format!("{timestamp_ms}ms"),
    }
}
