//! The condition evaluator: `evaluate` walks a [`RuleCondition`] tree
//! against one torrent and the current cycle context.

use regex::RegexBuilder;

use seedkeeper_core::condition::{
    ConditionField, ConditionLeaf, ConditionOperator, GroupOperator, RuleCondition,
    MAX_CONDITION_DEPTH,
};
use seedkeeper_core::model::{Torrent, TorrentStateKind};
use seedkeeper_core::rule::Rule;
use seedkeeper_indices::GROUP_CONTENT_SAVE_PATH;

use crate::context::CycleContext;
use crate::domain::tracker_domains;

/// Evaluate `condition` against `torrent` under `rule`, returning `false`
/// for any malformed or unresolvable input rather than erroring — per the
/// contract, evaluation never panics and never propagates a fatal error.
#[must_use]
pub fn evaluate(
    condition: &RuleCondition,
    torrent: &Torrent,
    rule: &Rule,
    ctx: &CycleContext<'_>,
) -> bool {
    evaluate_depth(condition, torrent, rule, ctx, 1)
}

/// Whether `condition` (anywhere in its tree) references
/// [`ConditionField::IsUnregistered`]. Used by the processor to decide
/// whether an action must be skipped outright when no health snapshot is
/// available this cycle, rather than merely evaluated to `false`.
#[must_use]
pub fn references_is_unregistered(condition: &RuleCondition) -> bool {
    match condition {
        RuleCondition::Leaf(leaf) => leaf.field == ConditionField::IsUnregistered,
        RuleCondition::Group { conditions, .. } => {
            conditions.iter().any(references_is_unregistered)
        }
    }
}

fn evaluate_depth(
    condition: &RuleCondition,
    torrent: &Torrent,
    rule: &Rule,
    ctx: &CycleContext<'_>,
    depth: u32,
) -> bool {
    if depth > MAX_CONDITION_DEPTH {
        return false;
    }
    match condition {
        RuleCondition::Leaf(leaf) => evaluate_leaf(leaf, torrent, rule, ctx),
        RuleCondition::Group { operator, conditions } => {
            if conditions.is_empty() {
                return false;
            }
            match operator {
                GroupOperator::And => conditions
                    .iter()
                    .all(|child| evaluate_depth(child, torrent, rule, ctx, depth + 1)),
                GroupOperator::Or => conditions
                    .iter()
                    .any(|child| evaluate_depth(child, torrent, rule, ctx, depth + 1)),
            }
        }
    }
}

fn evaluate_leaf(leaf: &ConditionLeaf, torrent: &Torrent, rule: &Rule, ctx: &CycleContext<'_>) -> bool {
    let result = match leaf.field {
        ConditionField::Name => eval_string(leaf, &torrent.name),
        ConditionField::Category => eval_string(leaf, &torrent.category),
        ConditionField::Tag => eval_tag(leaf, torrent),
        ConditionField::Tracker => eval_tracker(leaf, torrent),
        ConditionField::State => eval_string(leaf, state_label(torrent.state)),
        ConditionField::Size => eval_numeric(leaf, torrent.size as f64),
        ConditionField::Ratio => eval_numeric(leaf, torrent.ratio),
        ConditionField::Progress => eval_numeric(leaf, torrent.progress),
        ConditionField::Availability => eval_numeric(leaf, torrent.availability),
        ConditionField::DownloadSpeed => eval_numeric(leaf, torrent.dl_speed as f64),
        ConditionField::UploadSpeed => eval_numeric(leaf, torrent.up_speed as f64),
        ConditionField::Seeds => eval_numeric(leaf, f64::from(torrent.seeds)),
        ConditionField::Leechs => eval_numeric(leaf, f64::from(torrent.leechs)),
        ConditionField::TrackersCount => eval_numeric(leaf, f64::from(torrent.trackers_count)),
        ConditionField::Private => eval_bool(leaf, torrent.private),
        ConditionField::AddedAge => {
            match torrent.added_age_secs(ctx.clock.now_unix) {
                Some(age) => eval_numeric(leaf, age as f64),
                None => false,
            }
        }
        ConditionField::CompletedAge => match torrent.completed_age_secs(ctx.clock.now_unix) {
            Some(age) => eval_numeric(leaf, age as f64),
            None => false,
        },
        ConditionField::InactiveTime => match torrent.inactive_time_secs(ctx.clock.now_unix) {
            Some(age) => eval_numeric(leaf, age as f64),
            None => false,
        },
        ConditionField::FreeSpace => match ctx.projected_free_space(&rule.id) {
            Some(value) => eval_numeric(leaf, value as f64),
            None => false,
        },
        ConditionField::IsUnregistered => ctx
            .unregistered
            .is_some_and(|set| eval_bool(leaf, set.contains(&torrent.hash))),
        ConditionField::IsGrouped => {
            let group_id = resolve_group_id(leaf, rule);
            let grouped = ctx
                .group_index(&rule.id, &group_id)
                .is_some_and(|index| index.is_grouped(&torrent.hash));
            eval_bool(leaf, grouped)
        }
        ConditionField::GroupSize => {
            let group_id = resolve_group_id(leaf, rule);
            let size = ctx
                .group_index(&rule.id, &group_id)
                .map_or(0, |index| index.size_of(&torrent.hash));
            eval_numeric(leaf, f64::from(size))
        }
        ConditionField::QualityIsBest => {
            let profile_id = leaf.quality_profile_id.as_deref().unwrap_or_default();
            let best = ctx
                .quality_sets
                .get(profile_id)
                .is_some_and(|sets| sets.is_best(&torrent.hash));
            eval_bool(leaf, best)
        }
        ConditionField::QualityIsInferior => {
            let profile_id = leaf.quality_profile_id.as_deref().unwrap_or_default();
            let inferior = ctx
                .quality_sets
                .get(profile_id)
                .is_some_and(|sets| sets.is_inferior(&torrent.hash));
            eval_bool(leaf, inferior)
        }
        ConditionField::HardlinkScope => match ctx.hardlink_index.and_then(|index| index.scope_of(&torrent.hash)) {
            Some(scope) => eval_string(leaf, hardlink_scope_label(scope)),
            None => false,
        },
    };
    if leaf.negate {
        !result
    } else {
        result
    }
}

/// Resolve the group id a leaf's `IsGrouped`/`GroupSize` test runs
/// against: the leaf's own `group_id`, falling back to the rule's default
/// grouping, falling back to the content+save-path built-in group.
///
/// Exposed for `seedkeeper-scheduler`, which must build every group index
/// a cycle's rules will need before evaluation starts.
#[must_use]
pub fn resolve_group_id(leaf: &ConditionLeaf, rule: &Rule) -> String {
    leaf.group_id
        .clone()
        .or_else(|| rule.actions.grouping.as_ref().and_then(|g| g.default_group_id.clone()))
        .unwrap_or_else(|| GROUP_CONTENT_SAVE_PATH.to_string())
}

fn state_label(state: TorrentStateKind) -> &'static str {
    match state {
        TorrentStateKind::Downloading => "downloading",
        TorrentStateKind::Seeding => "seeding",
        TorrentStateKind::Paused => "paused",
        TorrentStateKind::Checking => "checking",
        TorrentStateKind::Stalled => "stalled",
        TorrentStateKind::Queued => "queued",
        TorrentStateKind::Other => "other",
    }
}

fn hardlink_scope_label(scope: seedkeeper_indices::HardlinkScope) -> &'static str {
    match scope {
        seedkeeper_indices::HardlinkScope::None => "none",
        seedkeeper_indices::HardlinkScope::TorrentsOnly => "torrents_only",
        seedkeeper_indices::HardlinkScope::OutsideClient => "outside_qbittorrent",
    }
}

fn eval_tag(leaf: &ConditionLeaf, torrent: &Torrent) -> bool {
    let has_tag = torrent.has_tag(&leaf.value);
    match leaf.operator {
        ConditionOperator::Equals | ConditionOperator::Contains => has_tag,
        ConditionOperator::NotEquals | ConditionOperator::NotContains => !has_tag,
        _ => false,
    }
}

fn eval_tracker(leaf: &ConditionLeaf, torrent: &Torrent) -> bool {
    let domains = tracker_domains(&torrent.tracker);
    match leaf.operator {
        ConditionOperator::Equals if !leaf.regex => {
            domains.iter().any(|domain| domain.eq_ignore_ascii_case(&leaf.value))
        }
        ConditionOperator::NotEquals if !leaf.regex => {
            !domains.iter().any(|domain| domain.eq_ignore_ascii_case(&leaf.value))
        }
        _ => eval_string(leaf, domains.first().map_or("", String::as_str)),
    }
}

fn eval_string(leaf: &ConditionLeaf, observed: &str) -> bool {
    let operator = if leaf.regex && leaf.operator == ConditionOperator::Equals {
        ConditionOperator::Matches
    } else {
        leaf.operator
    };
    match operator {
        ConditionOperator::Equals => observed.eq_ignore_ascii_case(&leaf.value),
        ConditionOperator::NotEquals => !observed.eq_ignore_ascii_case(&leaf.value),
        ConditionOperator::Contains => {
            observed.to_ascii_lowercase().contains(&leaf.value.to_ascii_lowercase())
        }
        ConditionOperator::NotContains => {
            !observed.to_ascii_lowercase().contains(&leaf.value.to_ascii_lowercase())
        }
        ConditionOperator::StartsWith => observed
            .to_ascii_lowercase()
            .starts_with(&leaf.value.to_ascii_lowercase()),
        ConditionOperator::EndsWith => observed
            .to_ascii_lowercase()
            .ends_with(&leaf.value.to_ascii_lowercase()),
        ConditionOperator::Matches => RegexBuilder::new(&leaf.value)
            .case_insensitive(true)
            .build()
            .is_ok_and(|regex| regex.is_match(observed)),
        ConditionOperator::LessThan
        | ConditionOperator::LessOrEqual
        | ConditionOperator::GreaterThan
        | ConditionOperator::GreaterOrEqual
        | ConditionOperator::Between => false,
    }
}

fn eval_numeric(leaf: &ConditionLeaf, observed: f64) -> bool {
    let value = parse_numeric(&leaf.value);
    match leaf.operator {
        ConditionOperator::Equals => (observed - value).abs() < f64::EPSILON,
        ConditionOperator::NotEquals => (observed - value).abs() >= f64::EPSILON,
        ConditionOperator::LessThan => observed < value,
        ConditionOperator::LessOrEqual => observed <= value,
        ConditionOperator::GreaterThan => observed > value,
        ConditionOperator::GreaterOrEqual => observed >= value,
        ConditionOperator::Between => match (leaf.min_value, leaf.max_value) {
            (Some(min), Some(max)) => observed >= min && observed <= max,
            _ => false,
        },
        ConditionOperator::Contains
        | ConditionOperator::NotContains
        | ConditionOperator::StartsWith
        | ConditionOperator::EndsWith
        | ConditionOperator::Matches => false,
    }
}

fn parse_numeric(raw: &str) -> f64 {
    if raw.is_empty() {
        0.0
    } else {
        raw.parse().unwrap_or(0.0)
    }
}

fn eval_bool(leaf: &ConditionLeaf, observed: bool) -> bool {
    let Ok(expected) = leaf.value.to_ascii_lowercase().parse::<bool>() else {
        return false;
    };
    match leaf.operator {
        ConditionOperator::Equals => observed == expected,
        ConditionOperator::NotEquals => observed != expected,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedkeeper_core::condition::ConditionLeaf;
    use std::collections::HashMap;

    fn rule(id: &str, free_space_source: Option<seedkeeper_core::rule::FreeSpaceSource>) -> Rule {
        Rule {
            id: id.into(),
            name: id.into(),
            instance_id: "inst".into(),
            enabled: true,
            sort_order: 0,
            tracker_pattern: "*".into(),
            actions: seedkeeper_core::rule::ActionConditions::default(),
            free_space_source,
        }
    }

    fn torrent() -> Torrent {
        Torrent {
            hash: "h1".into(),
            name: "Some.Release-GRP".into(),
            category: "movies".into(),
            tags: vec!["keep".into()],
            tracker: "https://tracker.example.com/announce".into(),
            state: TorrentStateKind::Seeding,
            size: 20_000_000_000,
            total_size: 20_000_000_000,
            downloaded: 20_000_000_000,
            uploaded: 1_000_000_000,
            amount_left: 0,
            ratio: 0.05,
            progress: 1.0,
            availability: 1.0,
            dl_speed: 0,
            up_speed: 0,
            seeds: 1,
            leechs: 0,
            complete: 1,
            incomplete: 0,
            trackers_count: 1,
            added_on: 1_000,
            completion_on: 2_000,
            last_activity: 3_000,
            seeding_time: 500,
            time_active: 1_500,
            save_path: "/data".into(),
            content_path: "/data/release".into(),
            comment: String::new(),
            private: false,
        }
    }

    fn context<'a>(
        cross_seed: &'a seedkeeper_indices::CrossSeedIndex,
        group_indices: &'a HashMap<String, seedkeeper_indices::GroupIndex>,
        quality_sets: &'a HashMap<String, seedkeeper_indices::QualitySets>,
        free_space: HashMap<String, seedkeeper_core::context::FreeSpaceProjection>,
    ) -> CycleContext<'a> {
        CycleContext {
            clock: seedkeeper_core::context::EvalClock::new(10_000),
            cross_seed,
            hardlink_index: None,
            group_indices,
            quality_sets,
            unregistered: None,
            release_parser: None,
            tracker_display_names: EMPTY_NAMES.get_or_init(HashMap::new),
            free_space,
        }
    }

    static EMPTY_NAMES: std::sync::OnceLock<HashMap<String, String>> = std::sync::OnceLock::new();

    fn leaf(field: ConditionField, operator: ConditionOperator, value: &str) -> RuleCondition {
        RuleCondition::Leaf(ConditionLeaf {
            field,
            operator,
            value: value.into(),
            min_value: None,
            max_value: None,
            regex: false,
            negate: false,
            group_id: None,
            quality_profile_id: None,
        })
    }

    #[test]
    fn ratio_less_than_matches() {
        let cross_seed = seedkeeper_indices::CrossSeedIndex::default();
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let ctx = context(&cross_seed, &group_indices, &quality_sets, HashMap::new());
        let rule = rule("r1", None);
        let condition = leaf(ConditionField::Ratio, ConditionOperator::LessThan, "0.1");
        assert!(evaluate(&condition, &torrent(), &rule, &ctx));
    }

    #[test]
    fn negate_flips_result() {
        let cross_seed = seedkeeper_indices::CrossSeedIndex::default();
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let ctx = context(&cross_seed, &group_indices, &quality_sets, HashMap::new());
        let rule = rule("r1", None);
        let mut condition = leaf(ConditionField::Category, ConditionOperator::Equals, "movies");
        if let RuleCondition::Leaf(ref mut l) = condition {
            l.negate = true;
        }
        assert!(!evaluate(&condition, &torrent(), &rule, &ctx));
    }

    #[test]
    fn free_space_reads_projected_value() {
        let cross_seed = seedkeeper_indices::CrossSeedIndex::default();
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let mut free_space = HashMap::new();
        free_space.insert(
            "r1".to_string(),
            seedkeeper_core::context::FreeSpaceProjection::starting_at(10_000_000_000),
        );
        let ctx = context(&cross_seed, &group_indices, &quality_sets, free_space);
        let rule = rule(
            "r1",
            Some(seedkeeper_core::rule::FreeSpaceSource::QBittorrent),
        );
        let condition = leaf(
            ConditionField::FreeSpace,
            ConditionOperator::LessThan,
            "50000000000",
        );
        assert!(evaluate(&condition, &torrent(), &rule, &ctx));
    }

    #[test]
    fn missing_free_space_projection_never_matches() {
        let cross_seed = seedkeeper_indices::CrossSeedIndex::default();
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let ctx = context(&cross_seed, &group_indices, &quality_sets, HashMap::new());
        let rule = rule("r1", None);
        let condition = leaf(
            ConditionField::FreeSpace,
            ConditionOperator::LessThan,
            "50000000000",
        );
        assert!(!evaluate(&condition, &torrent(), &rule, &ctx));
    }

    #[test]
    fn unresolved_group_size_is_zero() {
        let cross_seed = seedkeeper_indices::CrossSeedIndex::default();
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let ctx = context(&cross_seed, &group_indices, &quality_sets, HashMap::new());
        let rule = rule("r1", None);
        let condition = leaf(ConditionField::GroupSize, ConditionOperator::Equals, "0");
        assert!(evaluate(&condition, &torrent(), &rule, &ctx));
    }

    #[test]
    fn references_is_unregistered_finds_nested_leaf() {
        let leaf_cond = leaf(ConditionField::IsUnregistered, ConditionOperator::Equals, "true");
        let group = RuleCondition::Group {
            operator: GroupOperator::And,
            conditions: vec![leaf(ConditionField::Ratio, ConditionOperator::GreaterThan, "1"), leaf_cond],
        };
        assert!(references_is_unregistered(&group));
    }
}
