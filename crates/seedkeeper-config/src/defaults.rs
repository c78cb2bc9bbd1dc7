//! Default values and bounds for [`crate::CoreConfig`] fields.
//!
//! # Design
//! - Centralize named defaults so call sites never hardcode magic numbers.

/// Default interval between scheduler scan cycles, in seconds (15 minutes).
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 900;
/// Minimum allowed scan interval, in seconds.
pub const MIN_SCAN_INTERVAL_SECS: u64 = 20;
/// Default per-torrent debounce cooldown, in seconds (2 minutes).
pub const DEFAULT_DEBOUNCE_WINDOW_SECS: u64 = 120;
/// Default hardlink index time-to-live, in seconds (2 minutes).
pub const DEFAULT_HARDLINK_INDEX_TTL_SECS: u64 = 120;
/// Default maximum hash count per client RPC batch.
pub const DEFAULT_BATCH_SIZE: usize = 150;
/// Default activity run retention window, in hours.
pub const DEFAULT_ACTIVITY_RETENTION_HOURS: i64 = 24;
/// Default maximum number of activity runs retained regardless of age.
pub const DEFAULT_ACTIVITY_RETENTION_MAX_RUNS: usize = 500;
/// Maximum nesting depth a condition tree may reach before it is rejected.
pub const CONDITION_DEPTH_LIMIT: u32 = 20;
