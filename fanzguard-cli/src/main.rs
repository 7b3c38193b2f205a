//! FanzGuard CLI - forensic watermarking tool.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use fanzguard_core::DEFAULT_SIMILARITY_THRESHOLD;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "fanzguard")]
#[command(author, version, about = "Forensic watermarking and content provenance", long_about = None)]
#[command(after_help = "Exit codes:
  0   success
  1   general error
  64  usage error
  65  no watermark found / similarity below threshold
  66  cannot read input file
  74  cannot write output file")]
struct Cli {
    /// Suppress decorative output (machine-readable results only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp a file with a forensic watermark
    Stamp(commands::stamp::StampArgs),

    /// Recover and display the watermark from a file
    Extract {
        /// Path to the file to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the extraction result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the forensic fingerprint of a file
    Fingerprint {
        /// Path to the file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Compare two files by perceptual similarity
    Compare {
        /// First file
        #[arg(value_name = "FILE_A")]
        file_a: PathBuf,

        /// Second file
        #[arg(value_name = "FILE_B")]
        file_b: PathBuf,

        /// Similarity percentage required to count as a match
        #[arg(short, long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f64,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    match cli.command {
        Commands::Stamp(args) => commands::stamp::execute(args, quiet),
        Commands::Extract { file, json } => commands::extract::execute(file, json, quiet),
        Commands::Fingerprint { file } => commands::fingerprint::execute(file, quiet),
        Commands::Compare {
            file_a,
            file_b,
            threshold,
        } => commands::compare::execute(file_a, file_b, threshold, quiet),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = &exit.message {
            eprintln!("{} {message}", "error:".red().bold());
        }
        process::exit(exit.code);
    }
}
