//! Ingest command - extract turns from an observation feed.

use anyhow::{Context, Result};
use clap::Args;
use footprint_ingest::{AdapterSession, SessionStats, feed};
use footprint_store::{PumpStats, Settings};
use std::path::PathBuf;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::info;

use super::context::{AppContext, TurnSink, session_options};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the ingest command.
#[derive(Args)]
pub struct IngestArgs {
    /// JSON-lines capture file. Reads stdin when omitted.
    pub file: Option<PathBuf>,
}

/// Feeds one observation source through an adapter session into `sink`.
///
/// The session and the pump run concurrently over a bounded queue sized
/// from settings.
pub async fn ingest_feed(
    file: Option<&PathBuf>,
    settings: &Settings,
    sink: &TurnSink,
) -> Result<(PumpStats, SessionStats)> {
    let (tx, rx) = mpsc::channel(settings.service_config().queue_capacity);
    let session = AdapterSession::new(session_options(settings));

    let producer = match file {
        Some(path) => {
            let observations = feed::open_file(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            tokio::spawn(session.run(observations, tx))
        }
        None => {
            let observations = feed::observations(BufReader::new(tokio::io::stdin()));
            tokio::spawn(session.run(observations, tx))
        }
    };

    let pumped = sink.pump(rx).await;
    let session_stats = producer.await.context("adapter session panicked")??;
    Ok((pumped, session_stats))
}

/// Runs the ingest command.
pub async fn run(args: &IngestArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::open(cli).await?;
    let result = ingest_feed(args.file.as_ref(), &ctx.settings, &ctx.sink()).await;
    ctx.close().await?;
    let (pumped, session) = result?;

    info!(
        recorded = pumped.recorded,
        duplicates = pumped.duplicates,
        queued = pumped.queued,
        invalid = session.invalid,
        "Ingest finished"
    );

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_pump_stats(&pumped));
            if session.invalid > 0 {
                let notice = format!("{} invalid line(s) skipped", session.invalid);
                println!("{}", formatter.format_notice(&notice));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_ingest(&pumped, session.invalid)?);
        }
    }

    Ok(())
}
