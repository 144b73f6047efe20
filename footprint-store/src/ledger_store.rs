//! Typed access to ledger records in a key-value store.
//!
//! Layout:
//!
//! | Key | Contents |
//! |-----|----------|
//! | `dailyData` | The current [`DailyLedger`] |
//! | `history_YYYY-MM-DD` | One [`ArchivedLedger`] per closed-out day |
//! | `tokenData` | Pending [`TrackTokensPayload`]s awaiting pickup |
//! | `host` | The [`HostRecord`] of the process hosting the service, if any |

use chrono::{NaiveDate, NaiveDateTime};
use footprint_core::{ArchivedLedger, DailyLedger, TrackTokensPayload};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::host::HostRecord;
use crate::kv::{FileStore, KeyValueStore, MemoryStore, StoreChange};
use crate::service::PumpStats;

/// Key of the current ledger record.
pub const CURRENT_KEY: &str = "dailyData";

/// Prefix of archive record keys.
pub const ARCHIVE_PREFIX: &str = "history_";

/// Key of the pending holding area.
pub const PENDING_KEY: &str = "tokenData";

/// Key of the hosting process marker.
pub const HOST_KEY: &str = "host";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns the archive key for `date`.
pub fn archive_key(date: NaiveDate) -> String {
    format!("{ARCHIVE_PREFIX}{}", date.format(DATE_FORMAT))
}

/// Parses the date out of an archive key.
pub fn parse_archive_key(key: &str) -> Option<NaiveDate> {
    let date = key.strip_prefix(ARCHIVE_PREFIX)?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

// ============================================================================
// Ledger Store
// ============================================================================

/// Ledger persistence on top of any [`KeyValueStore`].
#[derive(Clone)]
pub struct LedgerStore {
    kv: Arc<dyn KeyValueStore>,
}

impl LedgerStore {
    /// Wraps an existing backend.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Opens a file-backed store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub async fn open_dir(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = FileStore::open(dir).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Creates a store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Subscribes to raw key change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.kv.subscribe()
    }

    // ========================================================================
    // Current Record
    // ========================================================================

    /// Loads the current ledger record, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be read or does not parse.
    pub async fn load_current(&self) -> Result<Option<DailyLedger>, StoreError> {
        match self.kv.get(CURRENT_KEY).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Saves the current ledger record.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn save_current(&self, ledger: &DailyLedger) -> Result<(), StoreError> {
        self.kv.set(CURRENT_KEY, serde_json::to_value(ledger)?).await?;
        debug!(date = %ledger.date, total_tokens = ledger.total_tokens, "Saved current ledger");
        Ok(())
    }

    // ========================================================================
    // Archives
    // ========================================================================

    /// Writes `ledger` as the archive for its date.
    ///
    /// An existing archive for the same date is replaced.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn archive(&self, ledger: &ArchivedLedger) -> Result<(), StoreError> {
        let key = archive_key(ledger.date);
        self.kv.set(&key, serde_json::to_value(ledger)?).await?;
        info!(
            date = %ledger.date,
            queries = ledger.queries,
            total_tokens = ledger.total_tokens,
            "Archived day"
        );
        Ok(())
    }

    /// Loads the archive for `date`, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be read or does not parse.
    pub async fn load_archive(&self, date: NaiveDate) -> Result<Option<ArchivedLedger>, StoreError> {
        match self.kv.get(&archive_key(date)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Lists archived days, most recent first.
    ///
    /// Archives that fail to parse are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the key listing or a read fails.
    pub async fn history(&self) -> Result<Vec<ArchivedLedger>, StoreError> {
        let mut dates: Vec<NaiveDate> = self
            .kv
            .keys()
            .await?
            .iter()
            .filter_map(|k| parse_archive_key(k))
            .collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));

        let mut history = Vec::with_capacity(dates.len());
        for date in dates {
            match self.load_archive(date).await {
                Ok(Some(archived)) => history.push(archived),
                Ok(None) => {}
                Err(StoreError::Serialization(e)) => {
                    warn!(%date, error = %e, "Skipping unreadable archive");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(history)
    }

    // ========================================================================
    // Pending Holding Area
    // ========================================================================

    /// Appends a payload to the holding area.
    ///
    /// # Errors
    ///
    /// Returns error if the read-modify-write fails.
    pub async fn enqueue_pending(&self, payload: &TrackTokensPayload) -> Result<(), StoreError> {
        let mut pending = match self.kv.get(PENDING_KEY).await? {
            Some(Value::Array(items)) => items,
            Some(_) | None => Vec::new(),
        };
        pending.push(serde_json::to_value(payload)?);
        let count = pending.len();
        self.kv.set(PENDING_KEY, Value::Array(pending)).await?;
        debug!(pending = count, "Queued payload for pickup");
        Ok(())
    }

    /// Moves payloads from `rx` into the holding area in arrival order.
    ///
    /// Used when another process hosts the service. Validation happens when
    /// the host picks the payloads up.
    pub async fn pump_pending(&self, mut rx: mpsc::Receiver<TrackTokensPayload>) -> PumpStats {
        let mut stats = PumpStats::default();

        while let Some(payload) = rx.recv().await {
            match self.enqueue_pending(&payload).await {
                Ok(()) => stats.queued += 1,
                Err(e) => {
                    warn!(error = %e, "Could not queue payload for the host");
                    stats.unsaved += 1;
                }
            }
        }

        debug!(?stats, "Pending pump finished");
        stats
    }

    /// Removes and returns everything in the holding area, oldest first.
    ///
    /// Entries that do not parse as payloads are dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the read or the clear fails.
    pub async fn take_pending(&self) -> Result<Vec<TrackTokensPayload>, StoreError> {
        let Some(value) = self.kv.get(PENDING_KEY).await? else {
            return Ok(Vec::new());
        };
        self.kv.remove(PENDING_KEY).await?;

        let Value::Array(items) = value else {
            warn!("Pending holding area is not a list, discarding");
            return Ok(Vec::new());
        };

        let payloads = items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(error = %e, "Dropping malformed pending payload");
                    None
                }
            })
            .collect();
        Ok(payloads)
    }

    // ========================================================================
    // Host Marker
    // ========================================================================

    /// Returns the host record if one exists and is live at `now`.
    ///
    /// An unreadable record is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read.
    pub async fn live_host(&self, now: NaiveDateTime) -> Result<Option<HostRecord>, StoreError> {
        let Some(value) = self.kv.get(HOST_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<HostRecord>(value) {
            Ok(record) if record.is_live(now) => Ok(Some(record)),
            Ok(record) => {
                debug!(pid = record.pid, heartbeat = %record.heartbeat, "Ignoring stale host record");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Ignoring malformed host record");
                Ok(None)
            }
        }
    }

    /// Writes the host record.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn save_host(&self, record: &HostRecord) -> Result<(), StoreError> {
        self.kv.set(HOST_KEY, serde_json::to_value(record)?).await
    }

    /// Removes the host record if it belongs to `pid`.
    ///
    /// # Errors
    ///
    /// Returns error if the read or the removal fails.
    pub async fn release_host(&self, pid: u32) -> Result<(), StoreError> {
        let owned = match self.kv.get(HOST_KEY).await? {
            Some(value) => serde_json::from_value::<HostRecord>(value).is_ok_and(|r| r.pid == pid),
            None => false,
        };
        if owned {
            self.kv.remove(HOST_KEY).await?;
            debug!(pid, "Released host record");
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
