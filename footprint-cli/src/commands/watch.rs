//! Watch command - live view of today's impact.
//!
//! The view refreshes on a fixed pull interval and, when this process hosts
//! the ledger, on every change pushed by the service. When another process
//! already hosts it, watch only reads the store and any feed it ingests is
//! queued for that host. A failed refresh shows a notice that clears itself
//! after a few seconds.

use anyhow::Result;
use clap::Args;
use footprint_core::{DailyLedger, ImpactSummary};
use footprint_store::{LedgerHandle, MAX_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS};
use std::io::{Write, stdout};
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval, sleep_until};
use tracing::{info, warn};

use super::context::AppContext;
use super::ingest::ingest_feed;
use crate::Cli;
use crate::output::TextFormatter;

/// How long a failure notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Refresh interval in seconds (defaults to the configured interval).
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Ingest this JSON-lines feed while watching.
    #[arg(long)]
    pub feed: Option<PathBuf>,
}

// ============================================================================
// Transient Notice
// ============================================================================

/// A message that expires after a fixed time.
#[derive(Debug, Default)]
pub struct TransientNotice {
    current: Option<(String, Instant)>,
}

impl TransientNotice {
    /// Shows `message` until `now + NOTICE_TTL`.
    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        self.current = Some((message.into(), now + NOTICE_TTL));
    }

    /// Returns the message if it has not expired, dropping it otherwise.
    pub fn visible(&mut self, now: Instant) -> Option<&str> {
        if self.current.as_ref().is_some_and(|(_, until)| now >= *until) {
            self.current = None;
        }
        self.current.as_ref().map(|(msg, _)| msg.as_str())
    }

    /// When the current message expires.
    pub fn expires_at(&self) -> Option<Instant> {
        self.current.as_ref().map(|(_, until)| *until)
    }
}

/// Clamps a requested refresh interval to the supported range.
pub fn refresh_interval(requested: u64) -> Duration {
    Duration::from_secs(requested.clamp(MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS))
}

// ============================================================================
// Command
// ============================================================================

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::open_host(cli).await?;
    if let Some(host) = ctx.host() {
        info!(pid = host.pid, "Watching ledger hosted by another process");
    }
    let period = match args.interval {
        Some(secs) => refresh_interval(secs),
        None => ctx.settings.refresh_interval(),
    };
    info!(interval = period.as_secs(), "Starting watch mode");

    if let Some(path) = args.feed.clone() {
        let settings = ctx.settings.clone();
        let sink = ctx.sink();
        tokio::spawn(async move {
            match ingest_feed(Some(&path), &settings, &sink).await {
                Ok((stats, _)) => {
                    info!(recorded = stats.recorded, queued = stats.queued, "Feed finished");
                }
                Err(e) => warn!(error = %e, "Feed stopped"),
            }
        });
    }

    let formatter = TextFormatter::new(!cli.no_color);
    let goal = ctx.settings.daily_goal();
    let mut updates = ctx.handle().map(LedgerHandle::subscribe);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut notice = TransientNotice::default();
    let mut ledger = match ctx.handle() {
        Some(handle) => handle.latest(),
        None => ctx.daily_data().await?,
    };

    loop {
        let expiry = notice.expires_at();

        tokio::select! {
            _ = ticker.tick() => {
                match ctx.daily_data().await {
                    Ok(fresh) => ledger = fresh,
                    Err(e) => notice.show(format!("Refresh failed: {e}"), Instant::now()),
                }
            }
            pushed = next_update(&mut updates) => {
                let Some(fresh) = pushed else {
                    warn!("Ledger service stopped");
                    break;
                };
                ledger = fresh;
            }
            () = sleep_until(expiry.unwrap_or_else(Instant::now)), if expiry.is_some() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        render(&formatter, &ledger, goal, period, notice.visible(Instant::now()))?;
    }

    ctx.close().await
}

/// Waits for the next pushed ledger. Never resolves without a service.
async fn next_update(updates: &mut Option<watch::Receiver<DailyLedger>>) -> Option<DailyLedger> {
    match updates {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

fn render(
    formatter: &TextFormatter,
    ledger: &DailyLedger,
    goal: f64,
    period: Duration,
    notice: Option<&str>,
) -> Result<()> {
    print!("\x1b[2J\x1b[H");
    stdout().flush()?;

    let now = chrono::Local::now();
    println!(
        "Footprint Watch Mode - {} (refresh: {}s)",
        now.format("%H:%M:%S"),
        period.as_secs()
    );
    println!("{}", "─".repeat(50));
    println!();
    println!("{}", formatter.format_status(&ImpactSummary::new(ledger, goal)));
    println!();
    if let Some(message) = notice {
        println!("{}", formatter.format_notice(message));
    }
    println!("Press Ctrl+C to exit");
    Ok(())
}
