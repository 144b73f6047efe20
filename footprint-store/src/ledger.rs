//! The daily ledger state machine.
//!
//! [`Ledger`] owns the current [`DailyLedger`] and is the only thing that
//! mutates it. Every mutation is applied in memory first and then persisted.
//! If persistence fails, the in-memory state stays authoritative: the
//! ledger remembers that it is dirty, holds on to any closed-out day it
//! could not archive, and [`Ledger::flush`] writes everything on the next
//! attempt.
//!
//! Other processes may write the same store. Before every mutation, and
//! whenever asked to [`Ledger::refresh`], a clean ledger adopts the
//! persisted record if it is for the same or a later day, so turns written
//! elsewhere are built on instead of overwritten.

use chrono::NaiveDate;
use footprint_core::{ArchivedLedger, Clock, DailyLedger, Role, TokenCount};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::ledger_store::LedgerStore;

/// Single-owner daily ledger.
pub struct Ledger {
    store: LedgerStore,
    clock: Arc<dyn Clock>,
    current: DailyLedger,
    /// Current record differs from what was last saved.
    dirty: bool,
    /// Closed-out days not yet written as archives, oldest first.
    unarchived: Vec<ArchivedLedger>,
}

impl Ledger {
    /// Loads the ledger from `store`.
    ///
    /// A missing or unreadable record starts a fresh day. A record left over
    /// from an earlier day is closed out and archived before today's record
    /// is created. Storage failures here are logged and retried later.
    pub async fn load(store: LedgerStore, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();

        let loaded = store.load_current().await;

        let mut ledger = Self {
            store,
            clock,
            current: DailyLedger::new(today),
            dirty: false,
            unarchived: Vec::new(),
        };

        match loaded {
            Ok(Some(record)) if record.is_for(today) => {
                debug!(date = %today, queries = record.queries, "Resumed today's ledger");
                ledger.current = record;
            }
            Ok(Some(record)) => {
                info!(stale = %record.date, today = %today, "Closing out ledger from earlier day");
                ledger.unarchived.push(record);
                ledger.dirty = true;
            }
            Ok(None) => {
                ledger.dirty = true;
            }
            // Nothing is written until the first mutation.
            Err(e) => {
                warn!(error = %e, "Could not read current ledger, starting fresh");
            }
        }

        if let Err(e) = ledger.flush().await {
            warn!(error = %e, "Initial ledger save failed, will retry");
        }
        ledger
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns a copy of the current record.
    pub fn snapshot(&self) -> DailyLedger {
        self.current.clone()
    }

    /// Returns the current record.
    pub fn current(&self) -> &DailyLedger {
        &self.current
    }

    /// Returns the day the current record belongs to.
    pub fn date(&self) -> NaiveDate {
        self.current.date
    }

    /// Returns true if some state has not reached the store yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty || !self.unarchived.is_empty()
    }

    /// Number of closed-out days still waiting to be archived.
    pub fn unarchived_count(&self) -> usize {
        self.unarchived.len()
    }

    /// Returns the store this ledger persists to.
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Adopts the persisted current record if another writer changed it.
    ///
    /// Does nothing while local state is unsaved, or when the persisted
    /// record belongs to an earlier day. Returns true if the record was
    /// replaced.
    pub async fn refresh(&mut self) -> bool {
        if self.is_dirty() {
            return false;
        }

        match self.store.load_current().await {
            Ok(Some(record)) if record.date >= self.current.date && record != self.current => {
                debug!(
                    date = %record.date,
                    total_tokens = record.total_tokens,
                    "Adopted ledger written by another process"
                );
                self.current = record;
                true
            }
            Ok(_) => false,
            Err(e) => {
                debug!(error = %e, "Could not re-read current ledger");
                false
            }
        }
    }

    /// Records one turn.
    ///
    /// Rolls over first if the calendar day has changed. The in-memory totals
    /// are updated even when the returned error reports a failed save.
    ///
    /// # Errors
    ///
    /// Returns error if the updated state could not be persisted.
    pub async fn record_turn(&mut self, tokens: TokenCount, role: Role) -> Result<(), StoreError> {
        self.refresh().await;
        let today = self.clock.today();
        if !self.current.is_for(today) {
            info!(from = %self.current.date, to = %today, "Day changed before turn, rolling over");
            self.close_out(today);
        }

        self.current.apply(tokens, role);
        self.dirty = true;
        debug!(
            tokens = tokens.get(),
            role = %role,
            total_tokens = self.current.total_tokens,
            queries = self.current.queries,
            "Recorded turn"
        );

        self.flush().await
    }

    /// Closes out the current day if the calendar day has changed.
    ///
    /// Returns `Ok(false)` without touching anything when the record already
    /// belongs to today, so repeated calls archive at most once.
    ///
    /// # Errors
    ///
    /// Returns error if the archive or the fresh record could not be
    /// persisted. The rollover itself has still happened.
    pub async fn rollover(&mut self) -> Result<bool, StoreError> {
        self.refresh().await;
        let today = self.clock.today();
        if self.current.is_for(today) {
            debug!(date = %today, "Rollover not needed");
            return Ok(false);
        }

        info!(from = %self.current.date, to = %today, "Rolling over");
        self.close_out(today);
        self.flush().await.map(|()| true)
    }

    /// Archives the current record and starts today from zero.
    ///
    /// Unlike [`Ledger::rollover`] this always happens, even mid-day.
    ///
    /// # Errors
    ///
    /// Returns error if the archive or the fresh record could not be
    /// persisted. The reset itself has still happened.
    pub async fn reset_today(&mut self) -> Result<(), StoreError> {
        self.refresh().await;
        let today = self.clock.today();
        info!(date = %self.current.date, "Resetting ledger");
        self.close_out(today);
        self.flush().await
    }

    /// Writes pending archives, then the current record if it changed.
    ///
    /// # Errors
    ///
    /// Returns the first storage error. Anything not written stays queued.
    pub async fn flush(&mut self) -> Result<(), StoreError> {
        while let Some(archived) = self.unarchived.first() {
            if let Err(e) = self.store.archive(archived).await {
                warn!(date = %archived.date, error = %e, "Archive write failed, will retry");
                return Err(e);
            }
            self.unarchived.remove(0);
        }

        if self.dirty {
            if let Err(e) = self.store.save_current(&self.current).await {
                warn!(date = %self.current.date, error = %e, "Ledger save failed, will retry");
                return Err(e);
            }
            self.dirty = false;
        }

        Ok(())
    }

    fn close_out(&mut self, next: NaiveDate) {
        let finished = std::mem::replace(&mut self.current, DailyLedger::new(next));
        self.unarchived.push(finished);
        self.dirty = true;
    }
}
