//! Extract command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::info;

use fanzguard_core::WatermarkExtractor;

use crate::utils::format_timestamp;

/// Execute the extract command.
pub fn execute(file: PathBuf, json: bool, quiet: bool) -> Result<()> {
    let content = std::fs::read(&file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    info!(path = %file.display(), bytes = content.len(), "Read file");

    let extractor = WatermarkExtractor::new();
    let result = extractor.extract(&content);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.found {
            bail!("No watermark found in {}", file.display());
        }
        return Ok(());
    }

    if !result.found {
        if !quiet {
            println!();
            println!("{}", "╔════════════════════════════════════════╗".red());
            println!("{}", "║             NO WATERMARK               ║".red().bold());
            println!("{}", "╚════════════════════════════════════════╝".red());
        }
        bail!("No watermark found in {}", file.display());
    }

    if quiet {
        if let Some(id) = &result.watermark_id {
            println!("{id}");
        }
        return Ok(());
    }

    println!();
    println!("{}", "╔════════════════════════════════════════╗".green());
    println!("{}", "║           WATERMARK FOUND              ║".green().bold());
    println!("{}", "╚════════════════════════════════════════╝".green());
    println!();
    if let Some(id) = &result.watermark_id {
        println!("   {} {}", "Watermark:".dimmed(), id.to_string().cyan());
    }
    if let Some(method) = result.method {
        println!("   {} {}", "Method:".dimmed(), method);
    }
    println!("   {} {:.1}%", "Confidence:".dimmed(), result.confidence);
    if let Some(payload) = &result.payload {
        println!("   {} {}", "Creator:".dimmed(), payload.creator_id);
        println!("   {} {}", "Platform:".dimmed(), payload.platform_id);
        println!("   {} {}", "Asset:".dimmed(), payload.asset_id);
        println!(
            "   {} {}",
            "Uploaded:".dimmed(),
            format_timestamp(payload.upload_timestamp)
        );
        if let Some(viewer) = &payload.viewer_id {
            println!("   {} {}", "Viewer:".dimmed(), viewer);
        }
        if let Some(session) = &payload.session_id {
            println!("   {} {}", "Session:".dimmed(), session);
        }
    }

    Ok(())
}
