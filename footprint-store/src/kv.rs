//! Key-value storage backends.
//!
//! The ledger only needs a handful of JSON documents addressed by name, so
//! storage is modelled as a small async key-value trait with change
//! notifications. [`FileStore`] keeps one JSON file per key on disk;
//! [`MemoryStore`] keeps everything in process.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, trace};

use crate::error::StoreError;
use crate::persistence::{ensure_dir, load_json, save_json};

/// Buffered change notifications per subscriber before it lags.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

const FILE_EXTENSION: &str = "json";

// ============================================================================
// Change Notifications
// ============================================================================

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The key was written.
    Set,
    /// The key was deleted.
    Removed,
}

/// Notification sent to subscribers after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// Key that changed.
    pub key: String,
    /// Kind of change.
    pub kind: ChangeKind,
}

// ============================================================================
// Key-Value Store Trait
// ============================================================================

/// Durable JSON key-value storage with change notifications.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a key. Missing keys are `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes a key, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Deletes a key. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Lists all keys in no particular order.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Subscribes to change notifications for writes made through this store.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

fn notify(tx: &broadcast::Sender<StoreChange>, key: &str, kind: ChangeKind) {
    // No subscribers is fine.
    let _ = tx.send(StoreChange {
        key: key.to_string(),
        kind,
    });
}

// ============================================================================
// File Store
// ============================================================================

/// One pretty-printed JSON file per key inside a directory.
pub struct FileStore {
    dir: PathBuf,
    notify: broadcast::Sender<StoreChange>,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        ensure_dir(&dir).await?;
        debug!(dir = %dir.display(), "Opened file store");

        let (notify, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self { dir, notify })
    }

    /// Returns the directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key)?;
        if !tokio::fs::try_exists(&path).await? {
            trace!(key, "Key not present");
            return Ok(None);
        }
        load_json(&path).await.map(Some)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        save_json(&path, &value).await?;
        notify(&self.notify, key, ChangeKind::Set);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        notify(&self.notify, key, ChangeKind::Removed);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }

        Ok(keys)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.notify.subscribe()
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-process store with the same semantics as [`FileStore`].
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
    notify: broadcast::Sender<StoreChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(BTreeMap::new()),
            notify,
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        validate_key(key)?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries.write().await.insert(key.to_string(), value);
        notify(&self.notify, key, ChangeKind::Set);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        if self.entries.write().await.remove(key).is_some() {
            notify(&self.notify, key, ChangeKind::Removed);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.notify.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
