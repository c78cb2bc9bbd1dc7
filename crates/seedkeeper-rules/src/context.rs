//! Per-cycle shared state the evaluator and processor both read: indices,
//! free-space projections, and per-rule outcome counters.

use std::collections::{HashMap, HashSet};

use seedkeeper_client::ReleaseParser;
use seedkeeper_core::context::{EvalClock, FreeSpaceProjection};
use seedkeeper_indices::{CrossSeedIndex, GroupIndex, HardlinkIndex, QualitySets};

/// Shared, mostly-read-only state for one cycle's worth of rule
/// evaluation, plus the one piece of state the evaluator itself mutates:
/// each rule's free-space projection.
pub struct CycleContext<'a> {
    /// Wall-clock pinned at cycle start.
    pub clock: EvalClock,
    /// Cross-seed relationships across the current torrent snapshot.
    pub cross_seed: &'a CrossSeedIndex,
    /// Physical hardlink index, if one was built this cycle.
    pub hardlink_index: Option<&'a HardlinkIndex>,
    /// Group indices keyed by `"{rule_id}|{group_id}"`.
    pub group_indices: &'a HashMap<String, GroupIndex>,
    /// Quality sets keyed by quality profile id.
    pub quality_sets: &'a HashMap<String, QualitySets>,
    /// Hashes the tracker reported as unregistered, if health data was
    /// available this cycle.
    pub unregistered: Option<&'a HashSet<String>>,
    /// Release-name parser used by quality/grouping-by-release fields.
    pub release_parser: Option<&'a dyn ReleaseParser>,
    /// Configured display name per tracker domain, used by
    /// `use_tracker_as_tag`.
    pub tracker_display_names: &'a HashMap<String, String>,
    /// Per-rule free-space projection, seeded by the caller for every rule
    /// whose condition tree references `FreeSpace` before the cycle runs,
    /// and mutated here as deletes are decided.
    ///
    /// Keyed by rule id: a rule's free-space source is fixed for the
    /// duration of one cycle, so the rule id alone is a sufficient cache
    /// key (the `"{source_key}|rule:{id}"` form lets an external cache
    /// share projections across cycles, which this in-process map does
    /// not need to do).
    pub free_space: HashMap<String, FreeSpaceProjection>,
}

impl<'a> CycleContext<'a> {
    /// The projected free-space figure for `rule_id`, or `None` if no
    /// projection was seeded for it (treated as "unknown" by the
    /// evaluator, which never matches on unknown free space).
    #[must_use]
    pub fn projected_free_space(&self, rule_id: &str) -> Option<i64> {
        self.free_space.get(rule_id).map(FreeSpaceProjection::projected_free_space)
    }

    /// Resolve the group index for `(rule_id, group_id)`, if one was built.
    #[must_use]
    pub fn group_index(&self, rule_id: &str, group_id: &str) -> Option<&GroupIndex> {
        self.group_indices.get(&format!("{rule_id}|{group_id}"))
    }
}

/// Outcome of evaluating one action against one torrent, for the per-rule
/// counter bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action's condition matched and it was applied to the desired state.
    Applied,
    /// The action is enabled but its condition did not match.
    NotMet,
    /// The action would have matched but was blocked by a safety rule
    /// (ambiguous cross-seed, missing condition, unresolved health data).
    Blocked,
}

/// Per-rule, per-action-kind outcome counters, accumulated across an
/// entire cycle.
#[derive(Debug, Clone, Default)]
pub struct RuleStats {
    counts: HashMap<(String, &'static str, &'static str), u64>,
}

impl RuleStats {
    /// Record one outcome for `rule_id`/`action_kind`.
    pub fn record(&mut self, rule_id: &str, action_kind: &'static str, outcome: ActionOutcome) {
        let label = match outcome {
            ActionOutcome::Applied => "applied",
            ActionOutcome::NotMet => "not_met",
            ActionOutcome::Blocked => "blocked",
        };
        *self
            .counts
            .entry((rule_id.to_string(), action_kind, label))
            .or_insert(0) += 1;
    }

    /// Current count for `rule_id`/`action_kind`/`outcome`.
    #[must_use]
    pub fn count(&self, rule_id: &str, action_kind: &str, outcome: ActionOutcome) -> u64 {
        let label = match outcome {
            ActionOutcome::Applied => "applied",
            ActionOutcome::NotMet => "not_met",
            ActionOutcome::Blocked => "blocked",
        };
        self.counts
            .iter()
            .find(|((rid, kind, lbl), _)| rid == rule_id && *kind == action_kind && *lbl == label)
            .map_or(0, |(_, count)| *count)
    }
}
