//! The recursive condition tree evaluated against a torrent.
//!
//! A [`RuleCondition`] is either a leaf testing one field, or an internal
//! node combining children with AND/OR. The tree carries no evaluation
//! logic itself — that lives in `seedkeeper-rules`, which has access to
//! the cross-seed/hardlink/quality indices a full evaluation needs — but
//! the depth guard in [`RuleCondition::exceeds_max_depth`] is a pure
//! structural property and belongs with the type.

use serde::{Deserialize, Serialize};

/// Maximum nesting depth a condition tree is allowed before evaluation
/// gives up and treats it as non-matching.
pub const MAX_CONDITION_DEPTH: u32 = 20;

/// A single node in a condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    /// A leaf testing one field of the torrent or evaluation context.
    Leaf(ConditionLeaf),
    /// An internal node combining children with a boolean operator.
    Group {
        /// How the children combine.
        operator: GroupOperator,
        /// Child conditions, evaluated short-circuit in order.
        conditions: Vec<RuleCondition>,
    },
}

impl RuleCondition {
    /// Whether evaluating this tree from the root would exceed
    /// [`MAX_CONDITION_DEPTH`]. A tree that fails this check is treated as
    /// non-matching by the evaluator rather than as an error.
    #[must_use]
    pub fn exceeds_max_depth(&self) -> bool {
        self.depth() > MAX_CONDITION_DEPTH
    }

    fn depth(&self) -> u32 {
        match self {
            Self::Leaf(_) => 1,
            Self::Group { conditions, .. } => {
                1 + conditions.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }
}

/// How a [`RuleCondition::Group`]'s children combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOperator {
    /// All children must match (empty list never matches).
    And,
    /// Any child must match (empty list never matches).
    Or,
}

/// A leaf condition: one field, one operator, and the operator's operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionLeaf {
    /// Field being tested.
    pub field: ConditionField,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Primary operand, interpreted according to the field/operator pair.
    pub value: String,
    /// Lower bound for [`ConditionOperator::Between`].
    pub min_value: Option<f64>,
    /// Upper bound for [`ConditionOperator::Between`].
    pub max_value: Option<f64>,
    /// When true, `Equals` is re-interpreted as [`ConditionOperator::Matches`].
    #[serde(default)]
    pub regex: bool,
    /// Flip the final boolean result.
    #[serde(default)]
    pub negate: bool,
    /// Group id used to resolve `IsGrouped`/`GroupSize`; falls back to the
    /// rule's default group when absent.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Quality profile id used to resolve `QualityIsBest`/`QualityIsInferior`.
    #[serde(default)]
    pub quality_profile_id: Option<String>,
}

/// Fields a leaf condition can test: direct torrent fields, plus synthetic
/// fields derived from the evaluation context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    /// [`crate::model::Torrent::name`].
    Name,
    /// [`crate::model::Torrent::category`].
    Category,
    /// Membership test against [`crate::model::Torrent::tags`].
    Tag,
    /// [`crate::model::Torrent::tracker`], evaluated via the domain matcher.
    Tracker,
    /// [`crate::model::Torrent::state`].
    State,
    /// [`crate::model::Torrent::size`].
    Size,
    /// [`crate::model::Torrent::ratio`].
    Ratio,
    /// [`crate::model::Torrent::progress`].
    Progress,
    /// [`crate::model::Torrent::availability`].
    Availability,
    /// [`crate::model::Torrent::dl_speed`].
    DownloadSpeed,
    /// [`crate::model::Torrent::up_speed`].
    UploadSpeed,
    /// [`crate::model::Torrent::seeds`].
    Seeds,
    /// [`crate::model::Torrent::leechs`].
    Leechs,
    /// [`crate::model::Torrent::trackers_count`].
    TrackersCount,
    /// [`crate::model::Torrent::private`].
    Private,
    /// Seconds since [`crate::model::Torrent::added_on`]; never matches if unknown.
    AddedAge,
    /// Seconds since [`crate::model::Torrent::completion_on`]; never matches if unknown.
    CompletedAge,
    /// Seconds since [`crate::model::Torrent::last_activity`]; never matches if unknown.
    InactiveTime,
    /// Projected free space for the rule's configured source, in bytes.
    FreeSpace,
    /// Whether the tracker reported the torrent as unregistered.
    IsUnregistered,
    /// Whether the torrent belongs to a group of size `>= 2`.
    IsGrouped,
    /// Size of the torrent's group.
    GroupSize,
    /// Whether the torrent is a best-ranked member of its quality group.
    QualityIsBest,
    /// Whether the torrent has a strictly better-ranked peer in its quality group.
    QualityIsInferior,
    /// Hardlink scope classification: `none` / `torrents_only` / `outside_qbittorrent`.
    HardlinkScope,
}

/// Comparison operators usable on a leaf, scoped by field type at
/// evaluation time (a numeric operator on a string field simply never
/// matches rather than erroring).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// String/bool/enum equality, or regex match when `regex` is set.
    Equals,
    /// Negated [`Self::Equals`].
    NotEquals,
    /// Substring containment.
    Contains,
    /// Negated [`Self::Contains`].
    NotContains,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Regex match, independent of the `regex` flag.
    Matches,
    /// Numeric `<`.
    LessThan,
    /// Numeric `<=`.
    LessOrEqual,
    /// Numeric `>`.
    GreaterThan,
    /// Numeric `>=`.
    GreaterOrEqual,
    /// Numeric inclusive range; requires both `min_value` and `max_value`.
    Between,
}
