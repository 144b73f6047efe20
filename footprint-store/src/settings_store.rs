//! User preferences store.
//!
//! Manages settings with JSON persistence and per-key access for the
//! `config` command.

use footprint_core::{DEFAULT_DAILY_GOAL_GRAMS, ProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_data_dir, load_json, save_json};
use crate::service::ServiceConfig;

/// Shortest viewer refresh interval honoured.
pub const MIN_REFRESH_INTERVAL_SECS: u64 = 10;

/// Longest viewer refresh interval honoured.
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 30;

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Daily carbon budget in grams.
    pub daily_goal_grams: f64,

    /// Viewer refresh interval in seconds.
    pub refresh_interval_secs: u64,

    /// How often the service retries unsaved state, in seconds.
    pub retry_interval_secs: u64,

    /// Capacity of the adapter and command queues.
    pub queue_capacity: usize,

    /// Site adapters allowed to activate.
    pub enabled_adapters: BTreeSet<ProviderKind>,

    /// Per-adapter settle timeout overrides in milliseconds.
    pub settle_overrides_ms: HashMap<ProviderKind, u64>,

    /// Ledger data directory. `None` uses the platform default.
    pub data_dir: Option<PathBuf>,

    /// Log level.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_goal_grams: DEFAULT_DAILY_GOAL_GRAMS,
            refresh_interval_secs: MAX_REFRESH_INTERVAL_SECS,
            retry_interval_secs: 30,
            queue_capacity: 64,
            enabled_adapters: ProviderKind::all().iter().copied().collect(),
            settle_overrides_ms: HashMap::new(),
            data_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Returns the refresh interval clamped to the supported range.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.refresh_interval_secs
                .clamp(MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS),
        )
    }

    /// Returns the daily goal, falling back to the default when unset.
    pub fn daily_goal(&self) -> f64 {
        if self.daily_goal_grams > 0.0 {
            self.daily_goal_grams
        } else {
            DEFAULT_DAILY_GOAL_GRAMS
        }
    }

    /// Returns the configured or default ledger directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Returns true if the adapter for `kind` may activate.
    pub fn is_adapter_enabled(&self, kind: ProviderKind) -> bool {
        self.enabled_adapters.contains(&kind)
    }

    /// Returns the settle timeout override for `kind`, if any.
    pub fn settle_override(&self, kind: ProviderKind) -> Option<Duration> {
        self.settle_overrides_ms
            .get(&kind)
            .map(|ms| Duration::from_millis(*ms))
    }

    /// Builds the service configuration.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            queue_capacity: self.queue_capacity.max(1),
            retry_interval: Duration::from_secs(self.retry_interval_secs.max(1)),
            host: false,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(StoreError::Config(format!("unknown log level: {other}"))),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store with default settings backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: Arc::new(RwLock::new(Settings::default())),
            path,
        }
    }

    /// Loads settings from a path.
    ///
    /// A missing or unparseable file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the existence check on the settings file fails.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if tokio::fs::try_exists(&path).await? {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        let store = Self::new(path);
        *store.settings.write().await = settings;
        Ok(store)
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings in memory. Call [`SettingsStore::save`] to persist.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        f(&mut settings);
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }


    // ========================================================================
    // Key Access
    // ========================================================================

    /// Returns one setting rendered as a string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for an unknown key.
    pub async fn get_key(&self, key: &str) -> Result<String, StoreError> {
        let settings = self.settings.read().await;
        let value = match key {
            "daily_goal_grams" => settings.daily_goal_grams.to_string(),
            "refresh_interval_secs" => settings.refresh_interval_secs.to_string(),
            "retry_interval_secs" => settings.retry_interval_secs.to_string(),
            "queue_capacity" => settings.queue_capacity.to_string(),
            "data_dir" => settings.resolved_data_dir().display().to_string(),
            "log_level" => settings.log_level.to_string(),
            "enabled_adapters" => settings
                .enabled_adapters
                .iter()
                .map(ProviderKind::cli_name)
                .collect::<Vec<_>>()
                .join(","),
            other => return Err(StoreError::Config(format!("unknown setting: {other}"))),
        };
        Ok(value)
    }

    /// Parses `value` and assigns it to one setting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for an unknown key or unparseable value.
    pub async fn set_key(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, StoreError> {
            value
                .trim()
                .parse()
                .map_err(|_| StoreError::Config(format!("invalid value for {key}: {value}")))
        }

        match key {
            "daily_goal_grams" => {
                let goal: f64 = parse(key, value)?;
                self.update(|s| s.daily_goal_grams = goal).await;
            }
            "refresh_interval_secs" => {
                let secs: u64 = parse(key, value)?;
                self.update(|s| s.refresh_interval_secs = secs).await;
            }
            "retry_interval_secs" => {
                let secs: u64 = parse(key, value)?;
                self.update(|s| s.retry_interval_secs = secs).await;
            }
            "queue_capacity" => {
                let capacity: usize = parse(key, value)?;
                self.update(|s| s.queue_capacity = capacity).await;
            }
            "data_dir" => {
                let dir = (!value.trim().is_empty()).then(|| PathBuf::from(value.trim()));
                self.update(|s| s.data_dir = dir).await;
            }
            "log_level" => {
                let level: LogLevel = value.parse()?;
                self.update(|s| s.log_level = level).await;
            }
            "enabled_adapters" => {
                let mut adapters = BTreeSet::new();
                for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                    let kind = ProviderKind::all()
                        .iter()
                        .copied()
                        .find(|k| k.cli_name() == name)
                        .ok_or_else(|| StoreError::Config(format!("unknown adapter: {name}")))?;
                    adapters.insert(kind);
                }
                self.update(|s| s.enabled_adapters = adapters).await;
            }
            other => return Err(StoreError::Config(format!("unknown setting: {other}"))),
        }
        Ok(())
    }

    /// Setting names accepted by [`SettingsStore::get_key`] and
    /// [`SettingsStore::set_key`].
    pub fn keys() -> &'static [&'static str] {
        &[
            "daily_goal_grams",
            "refresh_interval_secs",
            "retry_interval_secs",
            "queue_capacity",
            "data_dir",
            "log_level",
            "enabled_adapters",
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!((settings.daily_goal() - 100.0).abs() < f64::EPSILON);
        assert_eq!(settings.refresh_interval(), Duration::from_secs(30));
        assert_eq!(settings.enabled_adapters.len(), ProviderKind::all().len());
        assert_eq!(settings.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_refresh_interval_is_clamped() {
        let mut settings = Settings {
            refresh_interval_secs: 1,
            ..Settings::default()
        };
        assert_eq!(settings.refresh_interval(), Duration::from_secs(10));
        settings.refresh_interval_secs = 600;
        assert_eq!(settings.refresh_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_non_positive_goal_falls_back() {
        let settings = Settings {
            daily_goal_grams: 0.0,
            ..Settings::default()
        };
        assert!((settings.daily_goal() - DEFAULT_DAILY_GOAL_GRAMS).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"daily_goal_grams": 42.5}"#).unwrap();
        assert!((settings.daily_goal_grams - 42.5).abs() < f64::EPSILON);
        assert_eq!(settings.queue_capacity, 64);
    }

    #[tokio::test]
    async fn test_set_and_get_keys() {
        let temp = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(temp.path().join("settings.json"));

        store.set_key("daily_goal_grams", "250").await.unwrap();
        assert_eq!(store.get_key("daily_goal_grams").await.unwrap(), "250");

        store.set_key("enabled_adapters", "claude, chatgpt").await.unwrap();
        assert_eq!(store.get_key("enabled_adapters").await.unwrap(), "chatgpt,claude");

        assert!(store.set_key("enabled_adapters", "copilot").await.is_err());
        assert!(store.set_key("queue_capacity", "lots").await.is_err());
        assert!(store.get_key("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("settings.json");

        let store = SettingsStore::new(path.clone());
        store.set_key("log_level", "debug").await.unwrap();
        store.save().await.unwrap();

        let reloaded = SettingsStore::load(path).await.unwrap();
        assert_eq!(reloaded.get().await.log_level, LogLevel::Debug);
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(temp.path().join("absent.json")).await.unwrap();
        assert_eq!(store.get().await, Settings::default());
    }
}
