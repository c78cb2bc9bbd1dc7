//! The per-torrent, per-cycle accumulation of actions from all matching
//! rules, before diffing against the observed state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::rule::DeleteMode;

/// A value paired with the rule that set it, for activity reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenanced<T> {
    /// The decided value.
    pub value: T,
    /// Id of the rule that set this value.
    pub rule_id: String,
    /// Name of the rule that set this value, for display purposes.
    pub rule_name: String,
}

impl<T> Provenanced<T> {
    /// Wrap `value` with its originating rule.
    pub fn new(value: T, rule_id: impl Into<String>, rule_name: impl Into<String>) -> Self {
        Self {
            value,
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
        }
    }
}

/// Accumulated desired state for one torrent, built up by folding every
/// matching rule in sort order. Created on the first matching rule,
/// mutated until a delete triggers, consumed by the applier, and
/// discarded at the end of the cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TorrentDesiredState {
    /// Upload speed cap in KiB/s, last-rule-wins.
    pub upload_limit_kib: Option<Provenanced<u64>>,
    /// Download speed cap in KiB/s, last-rule-wins.
    pub download_limit_kib: Option<Provenanced<u64>>,
    /// Ratio limit, last-rule-wins.
    pub ratio_limit: Option<Provenanced<f64>>,
    /// Seeding-time limit in minutes, last-rule-wins.
    pub seeding_minutes_limit: Option<Provenanced<i64>>,
    /// Pending pause, OR-accumulated and mutually exclusive with resume.
    pub should_pause: Option<Provenanced<()>>,
    /// Pending resume, OR-accumulated and mutually exclusive with pause.
    pub should_resume: Option<Provenanced<()>>,
    /// Pending recheck, OR-accumulated.
    pub should_recheck: Option<Provenanced<()>>,
    /// Pending reannounce, OR-accumulated.
    pub should_reannounce: Option<Provenanced<()>>,
    /// Category change, last-rule-wins.
    pub category: Option<Provenanced<CategoryDecision>>,
    /// Per-tag add/remove decisions, last-rule-per-tag-wins.
    pub tags: HashMap<String, Provenanced<TagDecision>>,
    /// Delete decision, first-rule-wins; halts further rule processing
    /// for this torrent once set.
    pub delete: Option<Provenanced<DeleteDecision>>,
    /// Move decision, first-rule-wins.
    pub mv: Option<Provenanced<MoveDecision>>,
    /// External-program execution, last-rule-wins.
    pub external_program_id: Option<Provenanced<String>>,
}

impl TorrentDesiredState {
    /// Whether a delete has already been decided for this torrent,
    /// meaning further rules must not be processed.
    #[must_use]
    pub const fn has_delete_triggered(&self) -> bool {
        self.delete.is_some()
    }

    /// Apply `should_pause`, clearing any previously pending resume.
    pub fn set_pause(&mut self, rule_id: impl Into<String>, rule_name: impl Into<String>) {
        self.should_resume = None;
        self.should_pause = Some(Provenanced::new((), rule_id, rule_name));
    }

    /// Apply `should_resume`, clearing any previously pending pause.
    pub fn set_resume(&mut self, rule_id: impl Into<String>, rule_name: impl Into<String>) {
        self.should_pause = None;
        self.should_resume = Some(Provenanced::new((), rule_id, rule_name));
    }
}

/// Decided category change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDecision {
    /// Category to assign.
    pub category: String,
    /// Group id to propagate the change across, if any.
    pub group_id: Option<String>,
}

/// Decided tag mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagDecision {
    /// The tag should be present after this cycle.
    Add,
    /// The tag should be absent after this cycle.
    Remove,
}

/// Decided delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteDecision {
    /// How files and cross-seed peers are affected.
    pub mode: DeleteMode,
    /// Also delete torrents sharing a hardlink signature with this one.
    pub include_hardlinks: bool,
    /// Group id used to resolve cross-seed/hardlink peers to include.
    pub group_id: Option<String>,
    /// Report the propagated delete as one atomic activity item.
    pub atomic: bool,
    /// Free-text reason recorded on the activity entry.
    pub reason: Option<String>,
}

/// Decided move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveDecision {
    /// Resolved destination path (template already substituted).
    pub destination: String,
    /// Group id used to propagate the move to peers.
    pub group_id: Option<String>,
    /// Report the propagated move as one atomic activity item.
    pub atomic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_and_resume_are_mutually_exclusive() {
        let mut state = TorrentDesiredState::default();
        state.set_pause("r1", "Pause rule");
        assert!(state.should_pause.is_some());
        state.set_resume("r2", "Resume rule");
        assert!(state.should_pause.is_none());
        assert!(state.should_resume.is_some());
    }

    #[test]
    fn delete_trigger_flag_reflects_delete_presence() {
        let mut state = TorrentDesiredState::default();
        assert!(!state.has_delete_triggered());
        state.delete = Some(Provenanced::new(
            DeleteDecision {
                mode: DeleteMode::DeleteWithFiles,
                include_hardlinks: false,
                group_id: None,
                atomic: false,
                reason: None,
            },
            "r1",
            "Delete rule",
        ));
        assert!(state.has_delete_triggered());
    }
}
