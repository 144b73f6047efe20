//! Marker for the process hosting the ledger service.
//!
//! A long-lived process (`serve`, `watch`) owns the ledger for as long as it
//! runs. It writes a [`HostRecord`] into the store and refreshes the
//! heartbeat on every retry tick. Short-lived commands that find a live
//! record hand their turns to the pending holding area instead of writing the
//! ledger themselves, and the host picks them up.
//!
//! A host that dies without cleaning up stops refreshing its heartbeat, so
//! its record goes stale and the next command records directly again.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Missed heartbeats after which a host is presumed gone.
pub const HOST_STALE_HEARTBEATS: u32 = 3;

/// Who is hosting the ledger and when it last checked in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostRecord {
    /// Process id of the host.
    pub pid: u32,
    /// Local time of the last heartbeat.
    pub heartbeat: NaiveDateTime,
    /// Seconds after the heartbeat that the record stays valid.
    pub stale_after_secs: u64,
}

impl HostRecord {
    /// Record for the current process, valid for a few `interval`s.
    pub fn current_process(heartbeat: NaiveDateTime, interval: Duration) -> Self {
        Self {
            pid: std::process::id(),
            heartbeat,
            stale_after_secs: interval
                .saturating_mul(HOST_STALE_HEARTBEATS)
                .as_secs()
                .max(1),
        }
    }

    /// Returns true if the heartbeat is recent enough at `now`.
    ///
    /// A heartbeat in the future counts as live.
    pub fn is_live(&self, now: NaiveDateTime) -> bool {
        let age = now.signed_duration_since(self.heartbeat).num_seconds();
        age <= i64::try_from(self.stale_after_secs).unwrap_or(i64::MAX)
    }

    /// Returns true if this record belongs to the running process.
    pub fn is_current_process(&self) -> bool {
        self.pid == std::process::id()
    }
}
