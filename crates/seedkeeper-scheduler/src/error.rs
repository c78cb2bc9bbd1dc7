//! Crate error type.

use thiserror::Error;

/// Errors that abort one cycle outright. Hardlink build and API batch
/// failures degrade to logging instead of reaching here; only
/// rule-store/client-snapshot failures at cycle start are fatal to the
/// cycle, and even then the next scheduled tick retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The rule store could not produce a rule set for the instance.
    #[error("failed to load rules for instance '{instance}': {reason}")]
    RuleStoreUnavailable {
        /// Instance the load was attempted for.
        instance: String,
        /// Human-readable failure detail.
        reason: String,
    },
    /// The torrent client could not produce a snapshot for the instance.
    #[error("failed to snapshot torrents for instance '{instance}': {reason}")]
    SnapshotUnavailable {
        /// Instance the snapshot was attempted for.
        instance: String,
        /// Human-readable failure detail.
        reason: String,
    },
}
