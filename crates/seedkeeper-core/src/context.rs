//! Per-rule free-space projection state.
//!
//! The full per-cycle evaluation context (which also holds the hardlink,
//! grouping and quality indices) is assembled in `seedkeeper-rules`, which
//! depends on `seedkeeper-indices`; this crate only owns the pieces of that
//! context that are index-independent.

use std::collections::HashSet;

/// Cumulative free-space bookkeeping for one rule across one cycle.
///
/// Keyed externally by `"{source_key}|rule:{rule_id}"`; the key itself is
/// owned by the caller (`seedkeeper-rules`), this struct only holds the
/// accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FreeSpaceProjection {
    /// Free space reported by the configured source at the start of the cycle.
    pub free_space: i64,
    /// Bytes the cycle's deletions so far would free.
    pub space_to_clear: i64,
    /// Cross-seed keys already counted toward `space_to_clear`, so a peer
    /// sharing the same key is not double-counted.
    pub files_to_clear: HashSet<(String, String)>,
    /// Hardlink signatures already counted toward `space_to_clear`.
    pub hardlink_signatures_to_clear: HashSet<String>,
}

impl FreeSpaceProjection {
    /// Seed a fresh projection from an observed free-space figure.
    #[must_use]
    pub fn starting_at(free_space: i64) -> Self {
        Self {
            free_space,
            ..Self::default()
        }
    }

    /// The value `FreeSpace` conditions are evaluated against: observed
    /// free space plus everything this cycle has freed so far.
    #[must_use]
    pub const fn projected_free_space(&self) -> i64 {
        self.free_space + self.space_to_clear
    }

    /// Record that `bytes` will be freed by a cross-seed-key-deduped
    /// deletion. Returns `false` (and does not add to the total) if this
    /// key was already counted.
    pub fn record_by_cross_seed_key(&mut self, key: (String, String), bytes: i64) -> bool {
        if self.files_to_clear.insert(key) {
            self.space_to_clear += bytes;
            true
        } else {
            false
        }
    }

    /// Record that `bytes` will be freed by a hardlink-signature-deduped
    /// deletion. Returns `false` if this signature was already counted.
    pub fn record_by_hardlink_signature(&mut self, signature: String, bytes: i64) -> bool {
        if self.hardlink_signatures_to_clear.insert(signature) {
            self.space_to_clear += bytes;
            true
        } else {
            false
        }
    }
}

/// Snapshot of the shared, index-independent scalars every leaf evaluation
/// can see regardless of which rule it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalClock {
    /// Unix timestamp the cycle started at, used for all age computations
    /// so that a single cycle is internally consistent.
    pub now_unix: i64,
}

impl EvalClock {
    /// Construct a clock pinned to `now_unix`.
    #[must_use]
    pub const fn new(now_unix: i64) -> Self {
        Self { now_unix }
    }
}
