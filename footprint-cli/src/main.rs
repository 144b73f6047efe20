// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Footprint CLI - energy, carbon and water estimates for LLM chat usage.
//!
//! # Examples
//!
//! ```bash
//! # Today's totals and impact
//! footprint
//!
//! # Record a turn from its text
//! footprint track --role user --provider Claude "How do I reverse a list?"
//!
//! # Estimate without recording
//! footprint estimate "The quick brown fox jumps over the lazy dog"
//!
//! # Replay a browser capture
//! footprint ingest capture.jsonl
//!
//! # Serve the extension message protocol on stdin/stdout
//! footprint serve
//!
//! # Live view
//! footprint watch --interval 15
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use footprint_store::LogLevel;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, estimate, history, ingest, providers, reset, serve, status, track, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// Footprint CLI - environmental impact of LLM chat usage.
#[derive(Parser)]
#[command(name = "footprint")]
#[command(about = "Energy, carbon and water estimates for LLM chat usage")]
#[command(long_about = r"
Footprint estimates the tokens exchanged with hosted chat models and keeps a
daily ledger of their energy, carbon and water impact.

Tracked sites:
  • ChatGPT (chatgpt)
  • Claude (claude)
  • Gemini (gemini)
  • Bard (bard)

Examples:
  footprint                        # Today's impact
  footprint history                # Archived days
  footprint estimate 'some text'   # Token estimate only
  footprint ingest capture.jsonl   # Replay observations
  footprint --format json          # JSON output
")]
#[command(version)]
#[command(author = "Footprint Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'status' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Ledger data directory (overrides the configured one).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Show today's totals and impact (default if no command specified).
    #[command(visible_alias = "s")]
    Status,

    /// Record one turn.
    #[command(visible_alias = "t")]
    Track(track::TrackArgs),

    /// Estimate tokens and impact for some text without recording it.
    #[command(visible_alias = "e")]
    Estimate(estimate::EstimateArgs),

    /// Archive today and start again from zero.
    Reset,

    /// List archived days.
    #[command(visible_alias = "h")]
    History(history::HistoryArgs),

    /// Extract turns from a JSON-lines observation feed.
    #[command(visible_alias = "i")]
    Ingest(ingest::IngestArgs),

    /// Answer extension protocol messages on stdin/stdout.
    Serve,

    /// Live view of today's impact.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),

    /// List site adapters and tracked API hosts.
    #[command(visible_alias = "p")]
    Providers,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Invalid input such as a negative token count.
    InvalidInput = 2,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("footprint=debug,info")
    } else {
        EnvFilter::new(format!("footprint={level}"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = commands::context::configured_log_level(&cli).await;
    setup_logging(cli.verbose, cli.quiet, level);

    let result = match &cli.command {
        Some(Commands::Status) | None => status::run(&cli).await,
        Some(Commands::Track(args)) => track::run(args, &cli).await,
        Some(Commands::Estimate(args)) => estimate::run(args, &cli).await,
        Some(Commands::Reset) => reset::run(&cli).await,
        Some(Commands::History(args)) => history::run(args, &cli).await,
        Some(Commands::Ingest(args)) => ingest::run(args, &cli).await,
        Some(Commands::Serve) => serve::run(&cli).await,
        Some(Commands::Watch(args)) => watch::run(args, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
        Some(Commands::Providers) => providers::run(&cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        let code = match e.downcast_ref::<footprint_store::StoreError>() {
            Some(store_err) if store_err.is_invalid_input() => ExitCode::InvalidInput,
            _ => ExitCode::Error,
        };
        std::process::exit(code as i32);
    }

    Ok(())
}
