// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Footprint Store
//!
//! Persistence and the single-owner ledger service for footprint.
//!
//! This crate provides:
//!
//! - **KeyValueStore**: JSON key-value storage with change notifications
//!   ([`FileStore`] on disk, [`MemoryStore`] in process)
//! - **LedgerStore**: Typed access to the current record, archives and the
//!   pending holding area
//! - **Ledger**: The record/rollover/reset state machine
//! - **LedgerService**: The task that owns the ledger, reachable through a
//!   [`LedgerHandle`]
//! - **HostRecord**: Marks the long-lived process that owns the ledger so
//!   other processes queue turns for it
//! - **SettingsStore**: User preferences with persistence
//!
//! ## Usage
//!
//! ```ignore
//! use footprint_core::{Role, SystemClock, TokenCount, TrackTokensPayload};
//! use footprint_store::{LedgerService, LedgerStore, ServiceConfig};
//! use std::sync::Arc;
//!
//! let store = LedgerStore::open_dir("/tmp/footprint").await?;
//! let handle = LedgerService::spawn(store, Arc::new(SystemClock), ServiceConfig::default()).await;
//!
//! handle
//!     .track_tokens(TrackTokensPayload::new(TokenCount::new(12), "Claude", Role::User))
//!     .await?;
//!
//! let mut rx = handle.subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("{} tokens today", rx.borrow().total_tokens);
//! }
//! ```

pub mod error;
pub mod host;
pub mod kv;
pub mod ledger;
pub mod ledger_store;
pub mod persistence;
pub mod protocol;
pub mod service;
pub mod settings_store;

pub use error::StoreError;
pub use host::{HOST_STALE_HEARTBEATS, HostRecord};
pub use kv::{ChangeKind, FileStore, KeyValueStore, MemoryStore, StoreChange};
pub use ledger::Ledger;
pub use ledger_store::{
    ARCHIVE_PREFIX, CURRENT_KEY, HOST_KEY, LedgerStore, PENDING_KEY, archive_key,
    parse_archive_key,
};
pub use persistence::{
    default_config_dir, default_data_dir, default_settings_path, ensure_dir, load_json,
    load_json_or_default, save_json,
};
pub use protocol::{Ack, Request, Response};
pub use service::{LedgerHandle, LedgerService, PumpStats, ServiceConfig, TrackOutcome};
pub use settings_store::{
    LogLevel, MAX_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS, Settings, SettingsStore,
};

#[cfg(test)]
mod ledger_tests;
#[cfg(test)]
mod test_support;
