//! Shared setup for commands that touch the ledger.

use anyhow::{Context, Result, bail};
use footprint_core::{ArchivedLedger, Clock, DailyLedger, SystemClock, TrackTokensPayload};
use footprint_ingest::SessionOptions;
use footprint_store::{
    HostRecord, LedgerHandle, LedgerService, LedgerStore, LogLevel, PumpStats, Settings,
    SettingsStore, TrackOutcome, default_settings_path,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::Cli;

/// Settings file path for this invocation.
pub fn settings_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(default_settings_path)
}

/// Loads the settings store for this invocation.
pub async fn load_settings(cli: &Cli) -> Result<SettingsStore> {
    SettingsStore::load(settings_path(cli))
        .await
        .context("failed to load settings")
}

/// Log level from settings, read before logging is set up.
pub async fn configured_log_level(cli: &Cli) -> LogLevel {
    match load_settings(cli).await {
        Ok(store) => store.get().await.log_level,
        Err(_) => LogLevel::default(),
    }
}

/// Adapter session options derived from settings.
pub fn session_options(settings: &Settings) -> SessionOptions {
    SessionOptions {
        enabled: settings.enabled_adapters.clone(),
        settle_overrides: settings
            .settle_overrides_ms
            .keys()
            .filter_map(|kind| settings.settle_override(*kind).map(|d| (*kind, d)))
            .collect(),
    }
}

// ============================================================================
// Ledger Access
// ============================================================================

/// Where this invocation sends turns.
#[derive(Clone)]
pub enum TurnSink {
    /// The service running in this process.
    Service(LedgerHandle),
    /// The holding area drained by the service another process hosts.
    Host(LedgerStore),
}

impl TurnSink {
    /// Drains `rx` into the ledger or the holding area.
    pub async fn pump(&self, rx: mpsc::Receiver<TrackTokensPayload>) -> PumpStats {
        match self {
            Self::Service(handle) => handle.pump(rx).await,
            Self::Host(store) => store.pump_pending(rx).await,
        }
    }
}

/// What happened to a single tracked turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// Applied by this process's service.
    Applied(TrackOutcome),
    /// Queued for the host with this pid.
    Queued(u32),
}

/// Settings plus access to the ledger.
///
/// Only one process writes the ledger at a time. When another process is
/// hosting it, this context starts no service of its own: turns go to the
/// holding area and reads come straight from the store.
pub struct AppContext {
    /// Effective settings.
    pub settings: Settings,
    store: LedgerStore,
    clock: Arc<dyn Clock>,
    service: Option<LedgerHandle>,
    host: Option<HostRecord>,
}

impl AppContext {
    /// Opens the ledger for a short-lived command.
    pub async fn open(cli: &Cli) -> Result<Self> {
        Self::start(cli, false).await
    }

    /// Opens the ledger for a long-lived command that hosts it when no other
    /// process does.
    pub async fn open_host(cli: &Cli) -> Result<Self> {
        Self::start(cli, true).await
    }

    async fn start(cli: &Cli, hosting: bool) -> Result<Self> {
        let settings = load_settings(cli).await?.get().await;
        let data_dir = cli
            .data_dir
            .clone()
            .unwrap_or_else(|| settings.resolved_data_dir());
        debug!(data_dir = %data_dir.display(), "Opening ledger store");

        let store = LedgerStore::open_dir(&data_dir)
            .await
            .with_context(|| format!("failed to open ledger at {}", data_dir.display()))?;
        Self::attach(settings, store, Arc::new(SystemClock), hosting).await
    }

    /// Attaches to `store`, starting a service unless another process hosts it.
    pub async fn attach(
        settings: Settings,
        store: LedgerStore,
        clock: Arc<dyn Clock>,
        hosting: bool,
    ) -> Result<Self> {
        let host = store
            .live_host(clock.now())
            .await
            .context("failed to read ledger host")?
            .filter(|record| !record.is_current_process());

        let service = if let Some(record) = &host {
            info!(pid = record.pid, "Ledger is hosted by another process");
            None
        } else {
            let mut config = settings.service_config();
            config.host = hosting;
            Some(LedgerService::spawn(store.clone(), clock.clone(), config).await)
        };

        Ok(Self {
            settings,
            store,
            clock,
            service,
            host,
        })
    }

    /// The service running in this process, if it owns the ledger.
    pub fn handle(&self) -> Option<&LedgerHandle> {
        self.service.as_ref()
    }

    /// The other process hosting the ledger, if any.
    pub fn host(&self) -> Option<&HostRecord> {
        self.host.as_ref()
    }

    /// Where turns from this invocation go.
    pub fn sink(&self) -> TurnSink {
        match &self.service {
            Some(handle) => TurnSink::Service(handle.clone()),
            None => TurnSink::Host(self.store.clone()),
        }
    }

    /// Records one turn, or queues it for the host.
    pub async fn submit(&self, payload: TrackTokensPayload) -> Result<Submitted> {
        match (&self.service, &self.host) {
            (Some(handle), _) => Ok(Submitted::Applied(handle.track_tokens(payload).await?)),
            (None, Some(host)) => {
                self.store.enqueue_pending(&payload).await?;
                Ok(Submitted::Queued(host.pid))
            }
            (None, None) => bail!("no ledger service is running"),
        }
    }

    /// Today's ledger as last saved by whoever owns it.
    pub async fn daily_data(&self) -> Result<DailyLedger> {
        if let Some(handle) = &self.service {
            return Ok(handle.daily_data().await?);
        }

        let today = self.clock.today();
        Ok(self
            .store
            .load_current()
            .await?
            .filter(|record| record.is_for(today))
            .unwrap_or_else(|| DailyLedger::new(today)))
    }

    /// Archived days, most recent first.
    pub async fn history(&self) -> Result<Vec<ArchivedLedger>> {
        Ok(self.store.history().await?)
    }

    /// Archives today and starts from zero.
    ///
    /// Refused while another process hosts the ledger.
    pub async fn reset(&self) -> Result<()> {
        match (&self.service, &self.host) {
            (Some(handle), _) => Ok(handle.reset().await?),
            (None, Some(host)) => bail!(
                "the ledger is hosted by process {}; reset it from there",
                host.pid
            ),
            (None, None) => bail!("no ledger service is running"),
        }
    }

    /// Flushes and stops the service, if this process runs one.
    pub async fn close(self) -> Result<()> {
        match self.service {
            Some(handle) => handle
                .shutdown()
                .await
                .context("failed to flush ledger on shutdown"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint_core::{ManualClock, Role, TokenCount};

    fn clock() -> ManualClock {
        ManualClock::at_noon(chrono::NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
    }

    fn foreign_host(clock: &ManualClock) -> HostRecord {
        HostRecord {
            pid: std::process::id().wrapping_add(1),
            heartbeat: clock.now(),
            stale_after_secs: 90,
        }
    }

    fn turn(tokens: u64) -> TrackTokensPayload {
        TrackTokensPayload::new(TokenCount::new(tokens), "Claude", Role::User)
    }

    #[tokio::test]
    async fn test_defers_to_live_host() {
        let clock = clock();
        let store = LedgerStore::in_memory();
        store.save_host(&foreign_host(&clock)).await.unwrap();

        let ctx = AppContext::attach(Settings::default(), store.clone(), Arc::new(clock), false)
            .await
            .unwrap();
        assert!(ctx.handle().is_none());

        let submitted = ctx.submit(turn(25)).await.unwrap();
        assert_eq!(submitted, Submitted::Queued(std::process::id().wrapping_add(1)));
        assert!(ctx.reset().await.is_err());

        let today = ctx.daily_data().await.unwrap();
        assert_eq!(today.total_tokens, 0);
        assert!(store.load_current().await.unwrap().is_none());
        ctx.close().await.unwrap();

        assert_eq!(store.take_pending().await.unwrap(), vec![turn(25)]);
    }

    #[tokio::test]
    async fn test_stale_host_is_ignored() {
        let clock = clock();
        let store = LedgerStore::in_memory();
        store.save_host(&foreign_host(&clock)).await.unwrap();
        clock.advance(chrono::Duration::minutes(5));

        let ctx = AppContext::attach(Settings::default(), store.clone(), Arc::new(clock), false)
            .await
            .unwrap();
        assert!(ctx.host().is_none());

        let submitted = ctx.submit(turn(25)).await.unwrap();
        assert_eq!(submitted, Submitted::Applied(TrackOutcome::Recorded));
        assert_eq!(ctx.daily_data().await.unwrap().total_tokens, 25);
        ctx.close().await.unwrap();

        assert_eq!(store.load_current().await.unwrap().unwrap().total_tokens, 25);
    }

    #[tokio::test]
    async fn test_queued_turns_drained_by_host() {
        let clock = clock();
        let store = LedgerStore::in_memory();
        store.save_host(&foreign_host(&clock)).await.unwrap();
        let shared = Arc::new(clock);

        let viewer = AppContext::attach(Settings::default(), store.clone(), shared.clone(), false)
            .await
            .unwrap();
        let (tx, rx) = mpsc::channel(4);
        tx.send(turn(10)).await.unwrap();
        tx.send(turn(20)).await.unwrap();
        drop(tx);
        let stats = viewer.sink().pump(rx).await;
        assert_eq!(stats.queued, 2);

        store.release_host(std::process::id().wrapping_add(1)).await.unwrap();
        let host = AppContext::attach(Settings::default(), store.clone(), shared, true)
            .await
            .unwrap();
        assert!(host.handle().is_some());

        let today = host.daily_data().await.unwrap();
        assert_eq!(today.total_tokens, 30);
        assert_eq!(today.queries, 2);
        host.close().await.unwrap();
    }
}
