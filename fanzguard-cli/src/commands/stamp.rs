//! Stamp command implementation.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::{debug, info};

use fanzguard_core::{
    ContentFingerprint, EmbeddingMethod, ForensicPayload, SignatureGenerator, WatermarkEmbedder,
    WatermarkEnvelope,
};

use crate::utils::build_stamped_path;

#[derive(Args)]
pub struct StampArgs {
    /// Path to the file to stamp
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Creator identifier recorded in the watermark
    #[arg(long)]
    pub creator: String,

    /// Platform identifier recorded in the watermark
    #[arg(long)]
    pub platform: String,

    /// Asset identifier recorded in the watermark
    #[arg(long)]
    pub asset: String,

    /// Embedding method (lsb, dct, dwt, metadata); picked automatically when omitted
    #[arg(short, long)]
    pub method: Option<String>,

    /// Output path (defaults to <FILE> with a .stamped extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Viewer this copy is delivered to (per-viewer stamping)
    #[arg(long)]
    pub viewer: Option<String>,

    /// Delivery session identifier
    #[arg(long)]
    pub session: Option<String>,
}

/// Execute the stamp command.
pub fn execute(args: StampArgs, quiet: bool) -> Result<()> {
    let content = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;

    info!(path = %args.file.display(), bytes = content.len(), "Read file");

    let method = args
        .method
        .as_deref()
        .map(|name| {
            name.parse::<EmbeddingMethod>()
                .map_err(|_| anyhow!("Unknown embedding method: {name}"))
        })
        .transpose()?;

    let mut payload = ForensicPayload::new(&args.creator, &args.platform, &args.asset);
    if let Some(viewer) = args.viewer {
        payload = payload.with_viewer(viewer);
    }
    if let Some(session) = args.session {
        payload = payload.with_session(session);
    }

    let watermark_id = SignatureGenerator::generate();
    let envelope = WatermarkEnvelope::new(watermark_id.clone(), payload)?;

    let embedder = WatermarkEmbedder::new();
    let (marked, used_method) = embedder.embed(&content, &envelope, method)?;
    debug!(method = %used_method, "Watermark embedded");

    let fingerprint = ContentFingerprint::digest(&content)?;

    let output = args
        .output
        .unwrap_or_else(|| build_stamped_path(&args.file, used_method));
    std::fs::write(&output, &marked)
        .with_context(|| format!("Failed to write output: {}", output.display()))?;

    info!(
        watermark_id = %watermark_id,
        method = %used_method,
        path = %output.display(),
        "Stamped file saved"
    );

    if quiet {
        // Machine-readable: just the signature.
        println!("{watermark_id}");
        return Ok(());
    }

    println!();
    println!("{}", "File stamped with forensic watermark!".green().bold());
    println!();
    println!(
        "   {} {}",
        "Watermark:".dimmed(),
        watermark_id.to_string().cyan()
    );
    println!("   {} {}", "Method:".dimmed(), used_method);
    println!("   {} {}", "Fingerprint:".dimmed(), fingerprint.compact());
    println!("   {} {}", "Saved to:".dimmed(), output.display());
    println!("   {} {} bytes", "Size:".dimmed(), marked.len());

    Ok(())
}
