//! Compare command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::info;

use fanzguard_core::PerceptualHash;

/// Execute the compare command.
pub fn execute(file_a: PathBuf, file_b: PathBuf, threshold: f64, quiet: bool) -> Result<()> {
    let content_a = std::fs::read(&file_a)
        .with_context(|| format!("Failed to read file: {}", file_a.display()))?;
    let content_b = std::fs::read(&file_b)
        .with_context(|| format!("Failed to read file: {}", file_b.display()))?;

    let hash_a = PerceptualHash::compute(&content_a)?;
    let hash_b = PerceptualHash::compute(&content_b)?;
    let score = hash_a.similarity(&hash_b);

    info!(score, threshold, "Compared files");

    if quiet {
        println!("{score:.1}");
    } else {
        println!();
        if score >= threshold {
            println!("{}", "╔════════════════════════════════════════╗".green());
            println!("{}", "║               SIMILAR                  ║".green().bold());
            println!("{}", "╚════════════════════════════════════════╝".green());
        } else {
            println!("{}", "╔════════════════════════════════════════╗".red());
            println!("{}", "║              DIFFERENT                 ║".red().bold());
            println!("{}", "╚════════════════════════════════════════╝".red());
        }
        println!();
        println!("   {} {:.1}%", "Similarity:".dimmed(), score);
        println!("   {} {:.1}%", "Threshold:".dimmed(), threshold);
        println!("   {} {}", "File A:".dimmed(), file_a.display());
        println!("   {} {}", "File B:".dimmed(), file_b.display());
    }

    if score < threshold {
        bail!("Similarity {score:.1}% below threshold {threshold:.1}%");
    }

    Ok(())
}
