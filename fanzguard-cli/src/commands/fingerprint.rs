//! Fingerprint command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use fanzguard_core::{ContentFingerprint, PerceptualHash};

/// Execute the fingerprint command.
pub fn execute(file: PathBuf, quiet: bool) -> Result<()> {
    let content = std::fs::read(&file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    info!(path = %file.display(), bytes = content.len(), "Read file");

    let digest = ContentFingerprint::digest(&content)?;
    let phash = PerceptualHash::compute(&content)?;

    if quiet {
        // Machine-readable: the compact digest.
        println!("{}", digest.compact());
        return Ok(());
    }

    println!();
    println!("   {} {}", "File:".dimmed(), file.display());
    println!("   {} {} bytes", "Size:".dimmed(), content.len());
    println!();
    println!("   {} {}", "Full:".dimmed(), digest.full);
    println!("   {} {}", "Head:".dimmed(), digest.head);
    println!("   {} {}", "Tail:".dimmed(), digest.tail);
    println!("   {} {}", "Compact:".dimmed(), digest.compact().cyan());
    println!("   {} {}", "Perceptual:".dimmed(), phash);

    Ok(())
}
