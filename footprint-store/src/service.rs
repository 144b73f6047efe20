//! The ledger service.
//!
//! A [`LedgerService`] runs as one tokio task that owns the [`Ledger`].
//! Everything else talks to it through a cloneable [`LedgerHandle`]:
//! commands go over an mpsc channel with oneshot replies, and every change
//! to the current record is published on a watch channel.
//!
//! Besides commands the task reacts to three event sources:
//!
//! - a timer that fires at local midnight and triggers a rollover
//! - a retry timer that flushes unsaved state and drains the pending
//!   holding area
//! - store notifications for the holding area key
//!
//! A service started with [`ServiceConfig::host`] also keeps a
//! [`HostRecord`] heartbeat in the store so other processes queue their turns
//! in the holding area instead of writing the ledger directly.

use chrono::NaiveDate;
use footprint_core::{ArchivedLedger, Clock, DailyLedger, TrackTokensPayload, until_next_midnight};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::host::HostRecord;
use crate::kv::ChangeKind;
use crate::ledger::Ledger;
use crate::ledger_store::{LedgerStore, PENDING_KEY};
use crate::protocol::{Ack, Request, Response};

/// Shortest wait before re-arming the midnight timer.
const MIN_MIDNIGHT_WAIT: Duration = Duration::from_secs(1);

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for the service task.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Capacity of the command channel.
    pub queue_capacity: usize,
    /// How often unsaved state is retried and the holding area drained.
    pub retry_interval: Duration,
    /// Advertise this process as the ledger host.
    pub host: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            retry_interval: Duration::from_secs(30),
            host: false,
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Result of submitting a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The turn was added to today's totals.
    Recorded,
    /// The turn's key was already counted today; nothing changed.
    Duplicate,
}

enum Command {
    GetDailyData {
        reply: oneshot::Sender<DailyLedger>,
    },
    ResetData {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    TrackTokens {
        payload: TrackTokensPayload,
        reply: oneshot::Sender<Result<TrackOutcome, StoreError>>,
    },
    GetHistory {
        reply: oneshot::Sender<Result<Vec<ArchivedLedger>, StoreError>>,
    },
    Rollover {
        reply: oneshot::Sender<Result<bool, StoreError>>,
    },
    Shutdown {
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
}

// ============================================================================
// Handle
// ============================================================================

/// Counters from [`LedgerHandle::pump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Turns added to the ledger.
    pub recorded: usize,
    /// Turns dropped as already counted.
    pub duplicates: usize,
    /// Turns refused as invalid.
    pub rejected: usize,
    /// Turns recorded in memory whose save failed, or that could not be
    /// handed to the holding area.
    pub unsaved: usize,
    /// Turns handed to the holding area for the hosting process.
    pub queued: usize,
}

/// Cloneable access to a running [`LedgerService`].
#[derive(Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<DailyLedger>,
}

impl LedgerHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| StoreError::ServiceClosed)?;
        rx.await.map_err(|_| StoreError::ServiceClosed)
    }

    /// Returns the current day's totals.
    ///
    /// Picks up changes other processes made to the stored record.
    ///
    /// # Errors
    ///
    /// Returns error if the service has stopped.
    pub async fn daily_data(&self) -> Result<DailyLedger, StoreError> {
        self.request(|reply| Command::GetDailyData { reply }).await
    }

    /// Archives today and starts from zero.
    ///
    /// # Errors
    ///
    /// Returns error if the service has stopped or the reset could not be
    /// saved. In the latter case the reset has still happened in memory.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.request(|reply| Command::ResetData { reply }).await?
    }

    /// Submits one observed turn.
    ///
    /// # Errors
    ///
    /// Returns error if the payload is invalid, the service has stopped, or
    /// the updated ledger could not be saved.
    pub async fn track_tokens(
        &self,
        payload: TrackTokensPayload,
    ) -> Result<TrackOutcome, StoreError> {
        self.request(|reply| Command::TrackTokens { payload, reply })
            .await?
    }

    /// Lists archived days, most recent first.
    ///
    /// # Errors
    ///
    /// Returns error if the service has stopped or the archives cannot be read.
    pub async fn history(&self) -> Result<Vec<ArchivedLedger>, StoreError> {
        self.request(|reply| Command::GetHistory { reply }).await?
    }

    /// Rolls over if the calendar day has changed.
    ///
    /// # Errors
    ///
    /// Returns error if the service has stopped or the rollover could not
    /// be saved.
    pub async fn rollover(&self) -> Result<bool, StoreError> {
        self.request(|reply| Command::Rollover { reply }).await?
    }

    /// Flushes state and stops the service.
    ///
    /// # Errors
    ///
    /// Returns error if the final flush fails or the service already stopped.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.request(|reply| Command::Shutdown { reply }).await?
    }

    /// Subscribes to snapshots of the current record.
    pub fn subscribe(&self) -> watch::Receiver<DailyLedger> {
        self.snapshots.clone()
    }

    /// Returns the most recently published snapshot without a round trip.
    pub fn latest(&self) -> DailyLedger {
        self.snapshots.borrow().clone()
    }

    /// Feeds payloads from `rx` to the service in arrival order.
    ///
    /// Runs until `rx` closes or the service stops.
    pub async fn pump(&self, mut rx: mpsc::Receiver<TrackTokensPayload>) -> PumpStats {
        let mut stats = PumpStats::default();

        while let Some(payload) = rx.recv().await {
            match self.track_tokens(payload).await {
                Ok(TrackOutcome::Recorded) => stats.recorded += 1,
                Ok(TrackOutcome::Duplicate) => stats.duplicates += 1,
                Err(StoreError::ServiceClosed) => {
                    warn!("Ledger service stopped, ending pump");
                    break;
                }
                Err(e) if e.is_invalid_input() => {
                    debug!(error = %e, "Rejected payload");
                    stats.rejected += 1;
                }
                Err(e) => {
                    debug!(error = %e, "Payload recorded but not saved");
                    stats.unsaved += 1;
                }
            }
        }

        debug!(?stats, "Pump finished");
        stats
    }

    /// Executes a protocol request.
    ///
    /// Failures become a failed [`Ack`]; this never returns an error.
    pub async fn dispatch(&self, request: Request) -> Response {
        debug!(action = request.action(), "Dispatching request");

        match request {
            Request::GetDailyData => match self.daily_data().await {
                Ok(ledger) => Response::DailyData(ledger),
                Err(e) => Response::Ack(Ack::failed(e)),
            },
            Request::ResetData => match self.reset().await {
                Ok(()) => Response::Ack(Ack::ok()),
                Err(e) => Response::Ack(Ack::failed(e)),
            },
            Request::TrackTokens { data } => match self.track_tokens(data).await {
                Ok(TrackOutcome::Recorded) => Response::Ack(Ack::ok()),
                Ok(TrackOutcome::Duplicate) => Response::Ack(Ack::duplicate()),
                Err(e) => Response::Ack(Ack::failed(e)),
            },
            Request::GetHistory => match self.history().await {
                Ok(history) => Response::History(history),
                Err(e) => Response::Ack(Ack::failed(e)),
            },
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Single-owner ledger task.
pub struct LedgerService {
    ledger: Ledger,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<DailyLedger>,
    /// Turn keys accepted on `seen_date`.
    seen: HashSet<String>,
    seen_date: NaiveDate,
}

impl LedgerService {
    /// Loads the ledger and starts the service task.
    pub async fn spawn(
        store: LedgerStore,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> LedgerHandle {
        let ledger = Ledger::load(store, Arc::clone(&clock)).await;
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (snapshots, snapshot_rx) = watch::channel(ledger.snapshot());

        let service = Self {
            seen_date: ledger.date(),
            ledger,
            clock,
            config,
            commands: rx,
            snapshots,
            seen: HashSet::new(),
        };

        tokio::spawn(service.run());

        LedgerHandle {
            commands: tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(mut self) {
        info!(date = %self.ledger.date(), "Ledger service started");

        let mut changes = self.ledger.store().subscribe();
        let mut changes_open = true;

        let midnight = tokio::time::sleep(self.until_midnight());
        tokio::pin!(midnight);

        let mut retry = tokio::time::interval_at(
            Instant::now() + self.config.retry_interval,
            self.config.retry_interval,
        );
        retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.heartbeat().await;
        self.drain_pending().await;
        self.publish();

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            if self.handle(command).await.is_break() {
                                break;
                            }
                        }
                        None => {
                            debug!("All handles dropped");
                            if let Err(e) = self.ledger.flush().await {
                                warn!(error = %e, "Final flush failed");
                            }
                            self.release_host().await;
                            break;
                        }
                    }
                }
                () = &mut midnight => {
                    match self.ledger.rollover().await {
                        Ok(rolled) => debug!(rolled, "Scheduled rollover check"),
                        Err(e) => warn!(error = %e, "Scheduled rollover not saved"),
                    }
                    self.sync_seen();
                    midnight.as_mut().reset(Instant::now() + self.until_midnight());
                }
                _ = retry.tick() => {
                    if self.ledger.is_dirty() {
                        match self.ledger.flush().await {
                            Ok(()) => info!("Retried save succeeded"),
                            Err(e) => debug!(error = %e, "Retried save failed"),
                        }
                    }
                    self.ledger.refresh().await;
                    self.heartbeat().await;
                    self.drain_pending().await;
                }
                change = changes.recv(), if changes_open => {
                    match change {
                        Ok(change) if change.key == PENDING_KEY && change.kind == ChangeKind::Set => {
                            self.drain_pending().await;
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Store notifications lagged");
                            self.drain_pending().await;
                        }
                        Err(broadcast::error::RecvError::Closed) => changes_open = false,
                    }
                }
            }

            self.publish();
        }

        info!("Ledger service stopped");
    }

    fn until_midnight(&self) -> Duration {
        until_next_midnight(self.clock.now()).max(MIN_MIDNIGHT_WAIT)
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::GetDailyData { reply } => {
                self.ledger.refresh().await;
                let _ = reply.send(self.ledger.snapshot());
            }
            Command::ResetData { reply } => {
                let result = self.ledger.reset_today().await;
                self.seen.clear();
                self.sync_seen();
                let _ = reply.send(result);
            }
            Command::TrackTokens { payload, reply } => {
                let _ = reply.send(self.track(payload).await);
            }
            Command::GetHistory { reply } => {
                let _ = reply.send(self.ledger.store().history().await);
            }
            Command::Rollover { reply } => {
                let result = self.ledger.rollover().await;
                self.sync_seen();
                let _ = reply.send(result);
            }
            Command::Shutdown { reply } => {
                let result = self.ledger.flush().await;
                self.release_host().await;
                let _ = reply.send(result);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn track(&mut self, payload: TrackTokensPayload) -> Result<TrackOutcome, StoreError> {
        let tokens = payload.token_count()?;

        self.sync_seen();
        if let Some(key) = &payload.turn_key {
            if self.seen.contains(key) {
                debug!(turn_key = %key, "Dropping duplicate turn");
                return Ok(TrackOutcome::Duplicate);
            }
        }

        // A failed save still leaves the turn counted in memory.
        let saved = self.ledger.record_turn(tokens, payload.message_type).await;

        self.sync_seen();
        if let Some(key) = payload.turn_key {
            self.seen.insert(key);
        }

        debug!(
            provider = %payload.provider,
            role = %payload.message_type,
            tokens = tokens.get(),
            "Tracked turn"
        );
        saved.map(|()| TrackOutcome::Recorded)
    }

    /// Clears the turn-key set when the ledger has moved to a new day.
    fn sync_seen(&mut self) {
        let date = self.ledger.date();
        if date != self.seen_date {
            self.seen.clear();
            self.seen_date = date;
        }
    }

    async fn drain_pending(&mut self) {
        let pending = match self.ledger.store().take_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                debug!(error = %e, "Could not read pending holding area");
                return;
            }
        };
        if pending.is_empty() {
            return;
        }

        info!(count = pending.len(), "Picking up pending turns");
        for payload in pending {
            if let Err(e) = self.track(payload).await {
                debug!(error = %e, "Pending turn not fully applied");
            }
        }
    }

    async fn heartbeat(&self) {
        if !self.config.host {
            return;
        }
        let record = HostRecord::current_process(self.clock.now(), self.config.retry_interval);
        if let Err(e) = self.ledger.store().save_host(&record).await {
            debug!(error = %e, "Host heartbeat not saved");
        }
    }

    async fn release_host(&self) {
        if !self.config.host {
            return;
        }
        if let Err(e) = self.ledger.store().release_host(std::process::id()).await {
            warn!(error = %e, "Could not release host record");
        }
    }

    fn publish(&self) {
        let snapshot = self.ledger.current();
        self.snapshots.send_if_modified(|published| {
            if published == snapshot {
                false
            } else {
                *published = snapshot.clone();
                true
            }
        });
    }
}
