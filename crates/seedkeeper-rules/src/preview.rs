//! Rule preview: evaluate a single rule's delete condition against a
//! torrent snapshot without applying it, either as a plain eligibility
//! filter or as the minimal ordered prefix of matches needed to satisfy
//! the rule's `FREE_SPACE` target.
//!
//! Scoped to the delete action because `FREE_SPACE`-gated matching only
//! makes sense there; a rule with no enabled delete condition previews
//! as an empty result.

use std::collections::HashMap;

use seedkeeper_core::model::Torrent;
use seedkeeper_core::rule::Rule;

use crate::context::CycleContext;
use crate::evaluator::{evaluate, references_is_unregistered};
use crate::processor::{delete_frees_space, record_space_freed};
use crate::selection::{rule_matches_torrent, sort_torrents};

/// Which matching semantics [`preview_rule`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMode {
    /// Every torrent the condition matches, independent of match order.
    Eligible,
    /// The minimal ordered prefix of matches needed to satisfy the rule's
    /// `FREE_SPACE` target, mirroring a real cycle's accumulation.
    Needed,
}

/// One torrent a preview matched.
#[derive(Debug, Clone)]
pub struct PreviewExample {
    /// Torrent hash.
    pub hash: String,
    /// Torrent name, for display.
    pub name: String,
    /// Tracker domain, for display.
    pub tracker: String,
}

/// Result of a preview run.
#[derive(Debug, Clone, Default)]
pub struct PreviewResult {
    /// Total number of torrents the preview matched.
    pub total_matches: usize,
    /// Up to the requested number of matching torrents, in match order.
    pub examples: Vec<PreviewExample>,
}

/// Preview `rule`'s delete condition against `torrents` under `mode`.
///
/// `Eligible` evaluates every torrent against a fixed free-space snapshot
/// (`ctx.free_space` is read but never mutated). `Needed` mutates
/// `ctx.free_space` after each match exactly as a real cycle's
/// `process_cycle` would, so a `FREE_SPACE` leaf naturally stops matching
/// once enough space is projected freed.
#[must_use]
pub fn preview_rule(
    rule: &Rule,
    torrents: &[Torrent],
    ctx: &mut CycleContext<'_>,
    mode: PreviewMode,
    example_limit: usize,
) -> PreviewResult {
    let Some(delete) = rule.actions.delete.as_ref().filter(|d| d.enabled) else {
        return PreviewResult::default();
    };
    let Some(condition) = &delete.condition else {
        return PreviewResult::default();
    };
    if ctx.unregistered.is_none() && references_is_unregistered(condition) {
        return PreviewResult::default();
    }

    let torrents_by_hash: HashMap<&str, &Torrent> =
        torrents.iter().map(|t| (t.hash.as_str(), t)).collect();
    let mut sorted = torrents.to_vec();
    sort_torrents(&mut sorted);

    let mut result = PreviewResult::default();
    for torrent in &sorted {
        if !rule_matches_torrent(rule, torrent) {
            continue;
        }
        if !evaluate(condition, torrent, rule, ctx) {
            continue;
        }
        result.total_matches += 1;
        if result.examples.len() < example_limit {
            result.examples.push(PreviewExample {
                hash: torrent.hash.clone(),
                name: torrent.name.clone(),
                tracker: torrent.tracker.clone(),
            });
        }
        if mode == PreviewMode::Needed && delete_frees_space(delete.mode, torrent, &torrents_by_hash, ctx) {
            record_space_freed(rule, torrent, delete.mode, ctx);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use seedkeeper_core::condition::{ConditionField, ConditionLeaf, ConditionOperator, RuleCondition};
    use seedkeeper_core::context::{EvalClock, FreeSpaceProjection};
    use seedkeeper_core::model::TorrentStateKind;
    use seedkeeper_core::rule::{ActionConditions, DeleteAction, DeleteMode};
    use seedkeeper_indices::{CrossSeedIndex, GroupIndex, QualitySets};
    use std::sync::LazyLock;

    use super::*;

    static EMPTY_GROUP_INDICES: LazyLock<HashMap<String, GroupIndex>> =
        LazyLock::new(HashMap::new);
    static EMPTY_QUALITY_SETS: LazyLock<HashMap<String, QualitySets>> =
        LazyLock::new(HashMap::new);

    fn torrent(hash: &str, size: u64) -> Torrent {
        Torrent {
            hash: hash.into(),
            name: hash.into(),
            category: String::new(),
            tags: Vec::new(),
            tracker: String::new(),
            state: TorrentStateKind::Seeding,
            size,
            total_size: size,
            downloaded: 0,
            uploaded: 0,
            amount_left: 0,
            ratio: 0.0,
            progress: 1.0,
            availability: 0.0,
            dl_speed: 0,
            up_speed: 0,
            seeds: 0,
            leechs: 0,
            complete: 0,
            incomplete: 0,
            trackers_count: 0,
            added_on: 0,
            completion_on: 0,
            last_activity: 0,
            seeding_time: 0,
            time_active: 0,
            save_path: format!("/data/{hash}"),
            content_path: format!("/data/{hash}/content"),
            comment: String::new(),
            private: false,
        }
    }

    fn rule_with_target(target_bytes: i64) -> Rule {
        Rule {
            id: "r1".into(),
            name: "Free up space".into(),
            instance_id: "inst".into(),
            enabled: true,
            sort_order: 0,
            tracker_pattern: "*".into(),
            actions: ActionConditions {
                delete: Some(DeleteAction {
                    enabled: true,
                    condition: Some(RuleCondition::Leaf(ConditionLeaf {
                        field: ConditionField::FreeSpace,
                        operator: ConditionOperator::LessThan,
                        value: target_bytes.to_string(),
                        min_value: None,
                        max_value: None,
                        regex: false,
                        negate: false,
                        group_id: None,
                        quality_profile_id: None,
                    })),
                    mode: DeleteMode::DeleteWithFiles,
                    include_hardlinks: false,
                    group_id: None,
                    atomic: false,
                    reason: None,
                }),
                ..ActionConditions::default()
            },
            free_space_source: None,
        }
    }

    fn context<'a>(
        cross_seed: &'a CrossSeedIndex,
        free_space: &'a HashMap<String, FreeSpaceProjection>,
        tracker_names: &'a HashMap<String, String>,
    ) -> CycleContext<'a> {
        CycleContext {
            clock: EvalClock::new(0),
            cross_seed,
            hardlink_index: None,
            group_indices: &EMPTY_GROUP_INDICES,
            quality_sets: &EMPTY_QUALITY_SETS,
            unregistered: None,
            release_parser: None,
            tracker_display_names: tracker_names,
            free_space: free_space.clone(),
        }
    }

    #[test]
    fn needed_mode_stops_once_target_is_satisfied() {
        let torrents = vec![torrent("a", 100), torrent("b", 100), torrent("c", 100)];
        let rule = rule_with_target(150);
        let cross_seed = CrossSeedIndex::build(&torrents);
        let tracker_names = HashMap::new();
        let mut free_space = HashMap::new();
        free_space.insert(rule.id.clone(), FreeSpaceProjection::starting_at(0));
        let mut ctx = context(&cross_seed, &free_space, &tracker_names);

        let result = preview_rule(&rule, &torrents, &mut ctx, PreviewMode::Needed, 10);
        assert_eq!(result.total_matches, 2);
        assert_eq!(result.examples.len(), 2);
    }

    #[test]
    fn eligible_mode_matches_every_candidate_regardless_of_order() {
        let torrents = vec![torrent("a", 100), torrent("b", 100), torrent("c", 100)];
        let rule = rule_with_target(150);
        let cross_seed = CrossSeedIndex::build(&torrents);
        let tracker_names = HashMap::new();
        let mut free_space = HashMap::new();
        free_space.insert(rule.id.clone(), FreeSpaceProjection::starting_at(0));
        let mut ctx = context(&cross_seed, &free_space, &tracker_names);

        let result = preview_rule(&rule, &torrents, &mut ctx, PreviewMode::Eligible, 10);
        assert_eq!(result.total_matches, 3);
    }

    #[test]
    fn no_delete_action_previews_empty() {
        let rule = Rule {
            id: "r1".into(),
            name: "no delete".into(),
            instance_id: "inst".into(),
            enabled: true,
            sort_order: 0,
            tracker_pattern: "*".into(),
            actions: ActionConditions::default(),
            free_space_source: None,
        };
        let torrents = vec![torrent("a", 100)];
        let cross_seed = CrossSeedIndex::build(&torrents);
        let tracker_names = HashMap::new();
        let free_space = HashMap::new();
        let mut ctx = context(&cross_seed, &free_space, &tracker_names);

        let result = preview_rule(&rule, &torrents, &mut ctx, PreviewMode::Eligible, 10);
        assert_eq!(result.total_matches, 0);
    }
}
