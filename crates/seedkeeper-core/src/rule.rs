//! Automation rules: the tracker-scoped, conditionally-enabled bundle of
//! actions a rule may apply to a matching torrent.

use serde::{Deserialize, Serialize};

use crate::condition::RuleCondition;

/// One automation rule.
///
/// Rules are totally ordered by `(sort_order, id)` and evaluated in that
/// order for every torrent matching `tracker_pattern`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier.
    pub id: String,
    /// Display name, used in activity records and previews.
    pub name: String,
    /// Owning torrent-client instance.
    pub instance_id: String,
    /// Disabled rules are skipped entirely during selection.
    pub enabled: bool,
    /// Primary sort key; ties broken by `id`.
    pub sort_order: i64,
    /// Tracker/domain pattern (see `seedkeeper_core::matcher`).
    pub tracker_pattern: String,
    /// The bundle of actions this rule may apply.
    pub actions: ActionConditions,
    /// Free-space source used to resolve `FreeSpace` conditions in this
    /// rule's [`crate::condition::ConditionField::FreeSpace`] leaves.
    pub free_space_source: Option<FreeSpaceSource>,
}

/// Where a rule's projected free-space figure comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FreeSpaceSource {
    /// Use the client-reported free space for the torrent's save path.
    QBittorrent,
    /// Query the local filesystem at the given path directly.
    Path(String),
}

/// Bundle of optional, independently-conditioned actions a rule may apply.
///
/// Each sub-record carries its own `enabled` flag and optional condition so
/// heterogeneous "when" clauses compose: a rule can, for example, pause on
/// one condition while tagging on a completely different one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionConditions {
    /// Upload/download speed caps.
    #[serde(default)]
    pub speed_limits: Option<SpeedLimitsAction>,
    /// Ratio/seeding-time caps.
    #[serde(default)]
    pub share_limits: Option<ShareLimitsAction>,
    /// Pause the torrent.
    #[serde(default)]
    pub pause: Option<SimpleAction>,
    /// Resume the torrent.
    #[serde(default)]
    pub resume: Option<SimpleAction>,
    /// Force a hash recheck.
    #[serde(default)]
    pub recheck: Option<SimpleAction>,
    /// Force a tracker reannounce.
    #[serde(default)]
    pub reannounce: Option<SimpleAction>,
    /// Set the torrent's category.
    #[serde(default)]
    pub category: Option<CategoryAction>,
    /// Per-tag add/remove actions.
    #[serde(default)]
    pub tags: Vec<TagAction>,
    /// Move the torrent's content to a templated destination.
    #[serde(default)]
    pub mv: Option<MoveAction>,
    /// Delete the torrent.
    #[serde(default)]
    pub delete: Option<DeleteAction>,
    /// Run an external program for the torrent.
    #[serde(default)]
    pub external_program: Option<ExternalProgramAction>,
    /// Grouping configuration used to resolve this rule's default group.
    #[serde(default)]
    pub grouping: Option<GroupingConfig>,
}

/// A plain enable/condition pair shared by state-transition actions that
/// carry no additional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleAction {
    /// Whether this action is active.
    pub enabled: bool,
    /// Condition gating the action; `None` means unconditional.
    pub condition: Option<RuleCondition>,
}

/// Upload/download speed-limit actions. The two directions are
/// independent last-rule-wins slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimitsAction {
    /// Upload cap slot.
    #[serde(default)]
    pub upload: Option<LimitSlot>,
    /// Download cap slot.
    #[serde(default)]
    pub download: Option<LimitSlot>,
}

/// One speed-limit slot: `kib_per_sec` of `0` means unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitSlot {
    /// Whether this slot is active.
    pub enabled: bool,
    /// Condition gating the action.
    pub condition: Option<RuleCondition>,
    /// Limit value in KiB/s; `0` means unlimited.
    pub kib_per_sec: u64,
}

/// Ratio/seeding-time share limits. Independent last-rule-wins slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareLimitsAction {
    /// Ratio limit slot.
    #[serde(default)]
    pub ratio: Option<RatioLimitSlot>,
    /// Seeding-time limit slot.
    #[serde(default)]
    pub seeding_minutes: Option<SeedingTimeLimitSlot>,
}

/// Ratio limit slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioLimitSlot {
    /// Whether this slot is active.
    pub enabled: bool,
    /// Condition gating the action.
    pub condition: Option<RuleCondition>,
    /// Ratio at which the torrent stops seeding.
    pub ratio: f64,
}

/// Seeding-time limit slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedingTimeLimitSlot {
    /// Whether this slot is active.
    pub enabled: bool,
    /// Condition gating the action.
    pub condition: Option<RuleCondition>,
    /// Minutes of seeding after which the torrent stops.
    pub minutes: i64,
}

/// Category assignment action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAction {
    /// Whether this action is active.
    pub enabled: bool,
    /// Condition gating the action.
    pub condition: Option<RuleCondition>,
    /// Category to assign.
    pub category: String,
    /// When set, the category change is propagated to the torrent's
    /// cross-seed peers using `group_id` (defaulting to content+save-path).
    pub include_cross_seeds: bool,
    /// Explicit group id to propagate the change across, overriding the
    /// default implied by `include_cross_seeds`.
    pub group_id: Option<String>,
    /// The change is blocked if any cross-seed peer currently has one of
    /// these categories.
    pub block_if_cross_seed_in_categories: Vec<String>,
}

/// How a tag action reconciles the rule's intent with current tag state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMode {
    /// Add when the condition matches and the tag is absent; remove when
    /// it doesn't and the tag is present.
    Full,
    /// Add only; never removes.
    Add,
    /// Remove only; never adds.
    Remove,
}

/// One tag's add/remove action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAction {
    /// Whether this action is active.
    pub enabled: bool,
    /// Condition gating the action.
    pub condition: Option<RuleCondition>,
    /// Literal tag value. Ignored when `use_tracker_as_tag` is set.
    pub tag: String,
    /// Reconciliation mode.
    pub mode: TagMode,
    /// Derive the tag from the torrent's tracker domain instead of the
    /// literal `tag` field (first domain with a configured display name,
    /// falling back to the raw domain).
    pub use_tracker_as_tag: bool,
    /// Treat the torrent's current tags as empty for this action's
    /// purposes, so a previously-removed tag can be re-added by the same
    /// rule on a later cycle without being blocked by its own prior state.
    pub managed_reset: bool,
}

/// Move action: relocate the torrent's content to a templated path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveAction {
    /// Whether this action is active.
    pub enabled: bool,
    /// Condition gating the action.
    pub condition: Option<RuleCondition>,
    /// Destination path template. Supports `{Name}`, `{Hash}`,
    /// `{Category}`, `{IsolationFolderName}`, `{Tracker}`.
    pub path_template: String,
    /// Group id used to propagate the move to cross-seed/hardlink peers.
    pub group_id: Option<String>,
    /// Treat the propagated move as a single atomic unit for activity
    /// reporting purposes.
    pub atomic: bool,
    /// Block the move if any cross-seed peer fails the condition.
    pub block_if_cross_seed: bool,
}

/// How a delete should affect on-disk files and cross-seed peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Remove the torrent from the client only.
    KeepFiles,
    /// Remove the torrent and its files unconditionally.
    DeleteWithFiles,
    /// Remove files, but only for torrents with no cross-seed peer.
    DeleteWithFilesPreserveCrossSeeds,
    /// Remove files and also delete all cross-seed peers' files.
    DeleteWithFilesIncludeCrossSeeds,
    /// No-op delete mode (disabled in effect).
    None,
}

impl DeleteMode {
    /// Whether this mode unconditionally frees disk space when applied
    /// (ignoring the cross-seed-existence check `DeleteWithFilesPreserveCrossSeeds`
    /// needs at the call site).
    #[must_use]
    pub const fn always_frees_space(self) -> bool {
        matches!(
            self,
            Self::DeleteWithFiles | Self::DeleteWithFilesIncludeCrossSeeds
        )
    }
}

/// Delete action. A delete with no condition is rejected by the rule
/// processor rather than ever being treated as unconditional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAction {
    /// Whether this action is active.
    pub enabled: bool,
    /// Condition gating the action. A missing condition makes the whole
    /// action inert.
    pub condition: Option<RuleCondition>,
    /// How files and cross-seed peers are affected.
    pub mode: DeleteMode,
    /// Also delete any torrents sharing a hardlink signature with this one.
    pub include_hardlinks: bool,
    /// Group id used to resolve cross-seed/hardlink peers to include.
    pub group_id: Option<String>,
    /// Report the propagated delete as one atomic activity item.
    pub atomic: bool,
    /// Free-text reason recorded on the activity entry.
    pub reason: Option<String>,
}

/// External-program execution action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalProgramAction {
    /// Whether this action is active.
    pub enabled: bool,
    /// Condition gating the action. Both this and `program_id` must be
    /// present for the action to be accepted (safety: no accidental
    /// unconditional execution).
    pub condition: Option<RuleCondition>,
    /// Identifier of the program to execute, resolved by an external
    /// collaborator.
    pub program_id: Option<String>,
}

/// Grouping configuration for a rule: which group id leaves without an
/// explicit `group_id` should resolve against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Default group id for this rule's leaves.
    pub default_group_id: Option<String>,
}
