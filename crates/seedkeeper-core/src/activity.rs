//! Activity records emitted while applying actions to a torrent client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of action an [`AutomationActivity`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Upload/download speed limit change.
    SpeedLimits,
    /// Ratio or seeding-time limit change.
    ShareLimits,
    /// Pause.
    Pause,
    /// Resume.
    Resume,
    /// Force recheck.
    Recheck,
    /// Force reannounce.
    Reannounce,
    /// Category assignment.
    Category,
    /// Tag add/remove/full-replace.
    Tags,
    /// Move to a new save path.
    Move,
    /// Delete, with or without files.
    Delete,
    /// External program invocation.
    ExternalProgram,
}

impl ActionKind {
    /// Stable lowercase label used in logs and metric label values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SpeedLimits => "speed_limits",
            Self::ShareLimits => "share_limits",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Recheck => "recheck",
            Self::Reannounce => "reannounce",
            Self::Category => "category",
            Self::Tags => "tags",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::ExternalProgram => "external_program",
        }
    }
}

/// Result of applying one action against one torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityOutcome {
    /// The action was applied to the client successfully.
    Success,
    /// The action was attempted and the client rejected it or the RPC failed.
    Failed,
    /// Dry-run mode: the action would have been applied, but was not.
    DryRun,
}

impl ActivityOutcome {
    /// Stable lowercase label used in logs and metric label values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::DryRun => "dry_run",
        }
    }
}

/// A single applied (or dry-run, or failed) action against a torrent,
/// persisted as part of an activity run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationActivity {
    /// Instance the action was applied against.
    pub instance_id: String,
    /// Torrent hash, or empty for an aggregated dry-run record.
    pub hash: String,
    /// Display name of the torrent at the time the action ran.
    pub torrent_name: String,
    /// First tracker domain for the torrent, if any.
    pub tracker_domain: Option<String>,
    /// Action kind this record describes.
    pub action: ActionKind,
    /// Rule that produced the decision, if any rule did.
    pub rule_id: Option<String>,
    /// Display name of the originating rule.
    pub rule_name: String,
    /// Outcome of applying the action.
    pub outcome: ActivityOutcome,
    /// Human-readable detail, e.g. the RPC error or skip reason.
    pub reason: Option<String>,
    /// When the activity was recorded.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_labels_are_stable() {
        assert_eq!(ActionKind::SpeedLimits.as_str(), "speed_limits");
        assert_eq!(ActionKind::ExternalProgram.as_str(), "external_program");
    }

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(ActivityOutcome::DryRun.as_str(), "dry_run");
    }
}
