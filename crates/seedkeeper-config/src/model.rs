//! The typed core configuration surface.
//!
//! # Design
//! - A pure data carrier; durations are stored as seconds so the struct
//!   derives `Serialize`/`Deserialize` without a third-party duration codec.
//! - Keeps domain types separate from loading/wiring code, which lives in
//!   `seedkeeper-app`'s bootstrap.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    CONDITION_DEPTH_LIMIT, DEFAULT_ACTIVITY_RETENTION_HOURS, DEFAULT_ACTIVITY_RETENTION_MAX_RUNS,
    DEFAULT_BATCH_SIZE, DEFAULT_DEBOUNCE_WINDOW_SECS, DEFAULT_HARDLINK_INDEX_TTL_SECS,
    DEFAULT_SCAN_INTERVAL_SECS,
};

/// Core tunables: scan cadence, debounce, hardlink index freshness, RPC
/// batching, and activity retention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoreConfig {
    /// Seconds between scheduler scan cycles for a given instance.
    pub scan_interval_secs: u64,
    /// Seconds a torrent hash is exempt from re-processing after an action.
    pub debounce_window_secs: u64,
    /// Seconds a built hardlink index remains valid before it is rebuilt.
    pub hardlink_index_ttl_secs: u64,
    /// Maximum number of torrent hashes sent in a single client RPC call.
    pub batch_size: usize,
    /// Hours an activity run is retained before being pruned.
    pub activity_retention_hours: i64,
    /// Maximum number of activity runs retained regardless of age.
    pub activity_retention_max_runs: usize,
    /// Maximum nesting depth a rule's condition tree may reach.
    pub condition_depth_limit: u32,
}

impl CoreConfig {
    /// Interval between scheduler scan cycles.
    #[must_use]
    pub const fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Per-hash debounce cooldown.
    #[must_use]
    pub const fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.debounce_window_secs)
    }

    /// Time a built hardlink index remains valid.
    #[must_use]
    pub const fn hardlink_index_ttl(&self) -> Duration {
        Duration::from_secs(self.hardlink_index_ttl_secs)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            debounce_window_secs: DEFAULT_DEBOUNCE_WINDOW_SECS,
            hardlink_index_ttl_secs: DEFAULT_HARDLINK_INDEX_TTL_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            activity_retention_hours: DEFAULT_ACTIVITY_RETENTION_HOURS,
            activity_retention_max_runs: DEFAULT_ACTIVITY_RETENTION_MAX_RUNS,
            condition_depth_limit: CONDITION_DEPTH_LIMIT,
        }
    }
}
