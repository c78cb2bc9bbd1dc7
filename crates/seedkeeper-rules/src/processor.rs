//! Rule processor: folds every matching rule, in order, into each
//! torrent's [`TorrentDesiredState`].

use std::collections::HashMap;

use seedkeeper_core::desired_state::{CategoryDecision, DeleteDecision, MoveDecision, TagDecision};
use seedkeeper_core::model::Torrent;
use seedkeeper_core::rule::{DeleteMode, Rule, TagMode};
use seedkeeper_core::{desired_state::Provenanced, TorrentDesiredState};

use crate::context::{ActionOutcome, CycleContext, RuleStats};
use crate::evaluator::{evaluate, references_is_unregistered};
use crate::selection::{rule_matches_torrent, sort_rules, sort_torrents};

/// Process one cycle: select and fold matching rules into a desired-state
/// record per torrent, in deterministic torrent and rule order.
///
/// Returns the accumulated desired states (entries exist only for
/// torrents that matched at least one rule with at least one effective
/// action) and the per-rule outcome counters.
pub fn process_cycle(
    torrents: &[Torrent],
    rules: &[Rule],
    ctx: &mut CycleContext<'_>,
) -> (HashMap<String, TorrentDesiredState>, RuleStats) {
    let mut sorted_rules = rules.to_vec();
    sort_rules(&mut sorted_rules);

    let mut sorted_torrents = torrents.to_vec();
    sort_torrents(&mut sorted_torrents);

    let torrents_by_hash: HashMap<&str, &Torrent> =
        torrents.iter().map(|t| (t.hash.as_str(), t)).collect();

    let mut states: HashMap<String, TorrentDesiredState> = HashMap::new();
    let mut stats = RuleStats::default();

    for torrent in &sorted_torrents {
        let mut state = states.remove(&torrent.hash).unwrap_or_default();
        for rule in &sorted_rules {
            if state.has_delete_triggered() {
                break;
            }
            if !rule_matches_torrent(rule, torrent) {
                continue;
            }
            fold_rule(rule, torrent, &torrents_by_hash, ctx, &mut state, &mut stats);
        }
        if state != TorrentDesiredState::default() {
            states.insert(torrent.hash.clone(), state);
        }
    }

    (states, stats)
}

#[allow(clippy::too_many_lines)]
fn fold_rule(
    rule: &Rule,
    torrent: &Torrent,
    torrents_by_hash: &HashMap<&str, &Torrent>,
    ctx: &mut CycleContext<'_>,
    state: &mut TorrentDesiredState,
    stats: &mut RuleStats,
) {
    let actions = &rule.actions;

    if let Some(speed) = &actions.speed_limits {
        if let Some(slot) = &speed.upload {
            fold_slot(rule, torrent, ctx, stats, "speed_limits_upload", slot.enabled, &slot.condition, || {
                state.upload_limit_kib = Some(Provenanced::new(slot.kib_per_sec, rule.id.clone(), rule.name.clone()));
            });
        }
        if let Some(slot) = &speed.download {
            fold_slot(rule, torrent, ctx, stats, "speed_limits_download", slot.enabled, &slot.condition, || {
                state.download_limit_kib = Some(Provenanced::new(slot.kib_per_sec, rule.id.clone(), rule.name.clone()));
            });
        }
    }

    if let Some(share) = &actions.share_limits {
        if let Some(slot) = &share.ratio {
            fold_slot(rule, torrent, ctx, stats, "share_limits_ratio", slot.enabled, &slot.condition, || {
                state.ratio_limit = Some(Provenanced::new(slot.ratio, rule.id.clone(), rule.name.clone()));
            });
        }
        if let Some(slot) = &share.seeding_minutes {
            fold_slot(rule, torrent, ctx, stats, "share_limits_seeding_minutes", slot.enabled, &slot.condition, || {
                state.seeding_minutes_limit = Some(Provenanced::new(slot.minutes, rule.id.clone(), rule.name.clone()));
            });
        }
    }

    if let Some(pause) = &actions.pause {
        fold_slot(rule, torrent, ctx, stats, "pause", pause.enabled && !torrent.is_paused(), &pause.condition, || {
            state.set_pause(rule.id.clone(), rule.name.clone());
        });
    }
    if let Some(resume) = &actions.resume {
        fold_slot(rule, torrent, ctx, stats, "resume", resume.enabled && torrent.is_paused(), &resume.condition, || {
            state.set_resume(rule.id.clone(), rule.name.clone());
        });
    }
    if let Some(recheck) = &actions.recheck {
        fold_slot(rule, torrent, ctx, stats, "recheck", recheck.enabled && !torrent.is_checking(), &recheck.condition, || {
            state.should_recheck = Some(Provenanced::new((), rule.id.clone(), rule.name.clone()));
        });
    }
    if let Some(reannounce) = &actions.reannounce {
        fold_slot(rule, torrent, ctx, stats, "reannounce", reannounce.enabled, &reannounce.condition, || {
            state.should_reannounce = Some(Provenanced::new((), rule.id.clone(), rule.name.clone()));
        });
    }

    if let Some(category) = &actions.category {
        fold_category(rule, torrent, torrents_by_hash, ctx, stats, category, state);
    }

    for tag in &actions.tags {
        fold_tag(rule, torrent, ctx, stats, tag, state);
    }

    if let Some(delete) = &actions.delete {
        fold_delete(rule, torrent, torrents_by_hash, ctx, stats, delete, state);
    }

    if let Some(mv) = &actions.mv {
        fold_move(rule, torrent, torrents_by_hash, ctx, stats, mv, state);
    }

    if let Some(program) = &actions.external_program {
        fold_external_program(rule, torrent, ctx, stats, program, state);
    }
}

fn condition_gate(
    rule: &Rule,
    torrent: &Torrent,
    ctx: &CycleContext<'_>,
    condition: &Option<seedkeeper_core::condition::RuleCondition>,
) -> bool {
    match condition {
        None => true,
        Some(cond) => {
            if ctx.unregistered.is_none() && references_is_unregistered(cond) {
                return false;
            }
            evaluate(cond, torrent, rule, ctx)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fold_slot(
    rule: &Rule,
    torrent: &Torrent,
    ctx: &CycleContext<'_>,
    stats: &mut RuleStats,
    kind: &'static str,
    enabled: bool,
    condition: &Option<seedkeeper_core::condition::RuleCondition>,
    apply: impl FnOnce(),
) {
    if !enabled {
        return;
    }
    if condition_gate(rule, torrent, ctx, condition) {
        apply();
        stats.record(&rule.id, kind, ActionOutcome::Applied);
    } else {
        stats.record(&rule.id, kind, ActionOutcome::NotMet);
    }
}

fn fold_category(
    rule: &Rule,
    torrent: &Torrent,
    torrents_by_hash: &HashMap<&str, &Torrent>,
    ctx: &CycleContext<'_>,
    stats: &mut RuleStats,
    category: &seedkeeper_core::rule::CategoryAction,
    state: &mut TorrentDesiredState,
) {
    if !category.enabled || !condition_gate(rule, torrent, ctx, &category.condition) {
        if category.enabled {
            stats.record(&rule.id, "category", ActionOutcome::NotMet);
        }
        return;
    }

    if !category.block_if_cross_seed_in_categories.is_empty() {
        let blocked = ctx.cross_seed.peers_of(&torrent.hash).iter().any(|peer_hash| {
            torrents_by_hash
                .get(peer_hash.as_str())
                .is_some_and(|peer| category.block_if_cross_seed_in_categories.contains(&peer.category))
        });
        if blocked {
            stats.record(&rule.id, "category", ActionOutcome::Blocked);
            return;
        }
    }

    let group_id = category
        .group_id
        .clone()
        .or_else(|| category.include_cross_seeds.then(|| seedkeeper_indices::GROUP_CONTENT_SAVE_PATH.to_string()));

    state.category = Some(Provenanced::new(
        CategoryDecision {
            category: category.category.clone(),
            group_id,
        },
        rule.id.clone(),
        rule.name.clone(),
    ));
    stats.record(&rule.id, "category", ActionOutcome::Applied);
}

fn fold_tag(
    rule: &Rule,
    torrent: &Torrent,
    ctx: &CycleContext<'_>,
    stats: &mut RuleStats,
    tag: &seedkeeper_core::rule::TagAction,
    state: &mut TorrentDesiredState,
) {
    if !tag.enabled {
        return;
    }
    let tag_value = if tag.use_tracker_as_tag {
        let domains = crate::domain::tracker_domains(&torrent.tracker);
        let Some(domain) = domains.first() else {
            return;
        };
        ctx.tracker_display_names.get(domain).cloned().unwrap_or_else(|| domain.clone())
    } else {
        tag.tag.clone()
    };
    if tag_value.is_empty() {
        return;
    }

    let has_tag = if tag.managed_reset {
        false
    } else if let Some(pending) = state.tags.get(&tag_value) {
        pending.value == TagDecision::Add
    } else {
        torrent.has_tag(&tag_value)
    };
    let matched = condition_gate(rule, torrent, ctx, &tag.condition);

    let decision = match tag.mode {
        TagMode::Full => {
            if matched && !has_tag {
                Some(TagDecision::Add)
            } else if !matched && has_tag {
                Some(TagDecision::Remove)
            } else {
                None
            }
        }
        TagMode::Add => (matched && !has_tag).then_some(TagDecision::Add),
        TagMode::Remove => (matched && has_tag).then_some(TagDecision::Remove),
    };

    if let Some(decision) = decision {
        state
            .tags
            .insert(tag_value, Provenanced::new(decision, rule.id.clone(), rule.name.clone()));
        stats.record(&rule.id, "tag", ActionOutcome::Applied);
    } else {
        stats.record(&rule.id, "tag", ActionOutcome::NotMet);
    }
}

fn fold_delete(
    rule: &Rule,
    torrent: &Torrent,
    torrents_by_hash: &HashMap<&str, &Torrent>,
    ctx: &mut CycleContext<'_>,
    stats: &mut RuleStats,
    delete: &seedkeeper_core::rule::DeleteAction,
    state: &mut TorrentDesiredState,
) {
    if !delete.enabled {
        return;
    }
    let Some(condition) = &delete.condition else {
        stats.record(&rule.id, "delete", ActionOutcome::Blocked);
        return;
    };
    if ctx.unregistered.is_none() && references_is_unregistered(condition) {
        stats.record(&rule.id, "delete", ActionOutcome::Blocked);
        return;
    }
    if !evaluate(condition, torrent, rule, ctx) {
        stats.record(&rule.id, "delete", ActionOutcome::NotMet);
        return;
    }

    state.delete = Some(Provenanced::new(
        DeleteDecision {
            mode: delete.mode,
            include_hardlinks: delete.include_hardlinks,
            group_id: delete.group_id.clone(),
            atomic: delete.atomic,
            reason: delete.reason.clone(),
        },
        rule.id.clone(),
        rule.name.clone(),
    ));
    stats.record(&rule.id, "delete", ActionOutcome::Applied);

    if delete_frees_space(delete.mode, torrent, torrents_by_hash, ctx) {
        record_space_freed(rule, torrent, delete.mode, ctx);
    }
}

pub(crate) fn delete_frees_space(
    mode: DeleteMode,
    torrent: &Torrent,
    torrents_by_hash: &HashMap<&str, &Torrent>,
    ctx: &CycleContext<'_>,
) -> bool {
    if mode.always_frees_space() {
        return true;
    }
    if mode == DeleteMode::DeleteWithFilesPreserveCrossSeeds {
        return ctx
            .cross_seed
            .peers_of(&torrent.hash)
            .iter()
            .all(|peer| !torrents_by_hash.contains_key(peer.as_str()));
    }
    false
}

pub(crate) fn record_space_freed(rule: &Rule, torrent: &Torrent, mode: DeleteMode, ctx: &mut CycleContext<'_>) {
    let Some(projection) = ctx.free_space.get_mut(&rule.id) else {
        return;
    };
    let bytes = torrent.size as i64;
    let dedup_by_hardlink = mode == DeleteMode::DeleteWithFilesIncludeCrossSeeds
        && ctx.hardlink_index.and_then(|index| index.signature_of(&torrent.hash)).is_some();
    if dedup_by_hardlink {
        if let Some(signature) = ctx.hardlink_index.and_then(|index| index.signature_of(&torrent.hash)) {
            projection.record_by_hardlink_signature(signature.to_string(), bytes);
            return;
        }
    }
    if let Some(key) = seedkeeper_core::path::cross_seed_key(torrent) {
        projection.record_by_cross_seed_key(key, bytes);
    } else {
        projection.space_to_clear += bytes;
    }
}

fn fold_move(
    rule: &Rule,
    torrent: &Torrent,
    torrents_by_hash: &HashMap<&str, &Torrent>,
    ctx: &CycleContext<'_>,
    stats: &mut RuleStats,
    mv: &seedkeeper_core::rule::MoveAction,
    state: &mut TorrentDesiredState,
) {
    if !mv.enabled || state.mv.is_some() {
        return;
    }
    if !condition_gate(rule, torrent, ctx, &mv.condition) {
        stats.record(&rule.id, "move", ActionOutcome::NotMet);
        return;
    }

    let destination = render_move_template(&mv.path_template, torrent);
    if destination.is_empty() || seedkeeper_core::path::normalize(&destination) == seedkeeper_core::path::normalize(&torrent.save_path) {
        stats.record(&rule.id, "move", ActionOutcome::NotMet);
        return;
    }

    if mv.block_if_cross_seed {
        let blocked = ctx.cross_seed.peers_of(&torrent.hash).iter().any(|peer_hash| {
            let Some(peer) = torrents_by_hash.get(peer_hash.as_str()) else {
                return false;
            };
            match &mv.condition {
                Some(cond) => !evaluate(cond, peer, rule, ctx),
                None => false,
            }
        });
        if blocked {
            stats.record(&rule.id, "move", ActionOutcome::Blocked);
            return;
        }
    }

    state.mv = Some(Provenanced::new(
        MoveDecision {
            destination,
            group_id: mv.group_id.clone(),
            atomic: mv.atomic,
        },
        rule.id.clone(),
        rule.name.clone(),
    ));
    stats.record(&rule.id, "move", ActionOutcome::Applied);
}

fn render_move_template(template: &str, torrent: &Torrent) -> String {
    let isolation_folder = sanitize_path_segment(&torrent.category);
    let tracker = crate::domain::tracker_domains(&torrent.tracker).into_iter().next().unwrap_or_default();
    template
        .replace("{Name}", &sanitize_path_segment(&torrent.name))
        .replace("{Hash}", &torrent.hash)
        .replace("{Category}", &sanitize_path_segment(&torrent.category))
        .replace("{IsolationFolderName}", &isolation_folder)
        .replace("{Tracker}", &tracker)
}

/// Strip characters unsafe as a single path segment.
fn sanitize_path_segment(raw: &str) -> String {
    raw.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn fold_external_program(
    rule: &Rule,
    torrent: &Torrent,
    ctx: &CycleContext<'_>,
    stats: &mut RuleStats,
    program: &seedkeeper_core::rule::ExternalProgramAction,
    state: &mut TorrentDesiredState,
) {
    if !program.enabled {
        return;
    }
    let (Some(program_id), Some(condition)) = (&program.program_id, &program.condition) else {
        stats.record(&rule.id, "external_program", ActionOutcome::Blocked);
        return;
    };
    if condition_gate(rule, torrent, ctx, &Some(condition.clone())) {
        state.external_program_id = Some(Provenanced::new(program_id.clone(), rule.id.clone(), rule.name.clone()));
        stats.record(&rule.id, "external_program", ActionOutcome::Applied);
    } else {
        stats.record(&rule.id, "external_program", ActionOutcome::NotMet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedkeeper_core::condition::{ConditionField, ConditionLeaf, ConditionOperator, RuleCondition};
    use seedkeeper_core::model::TorrentStateKind;
    use seedkeeper_core::rule::{ActionConditions, DeleteAction, SimpleAction, TagAction};

    fn torrent(hash: &str, added_on: i64, size: u64) -> Torrent {
        Torrent {
            hash: hash.into(),
            name: format!("release-{hash}"),
            category: String::new(),
            tags: Vec::new(),
            tracker: "https://tracker.example.com/announce".into(),
            state: TorrentStateKind::Seeding,
            size,
            total_size: size,
            downloaded: size,
            uploaded: 0,
            amount_left: 0,
            ratio: 0.1,
            progress: 1.0,
            availability: 1.0,
            dl_speed: 0,
            up_speed: 0,
            seeds: 1,
            leechs: 0,
            complete: 1,
            incomplete: 0,
            trackers_count: 1,
            added_on,
            completion_on: added_on,
            last_activity: added_on,
            seeding_time: 0,
            time_active: 0,
            save_path: "/data".into(),
            content_path: format!("/data/{hash}"),
            comment: String::new(),
            private: false,
        }
    }

    fn free_space_rule(id: &str) -> Rule {
        let free_space_leaf = RuleCondition::Leaf(ConditionLeaf {
            field: ConditionField::FreeSpace,
            operator: ConditionOperator::LessThan,
            value: (50_000_000_000i64).to_string(),
            min_value: None,
            max_value: None,
            regex: false,
            negate: false,
            group_id: None,
            quality_profile_id: None,
        });
        Rule {
            id: id.into(),
            name: "free space cleanup".into(),
            instance_id: "inst".into(),
            enabled: true,
            sort_order: 0,
            tracker_pattern: "*".into(),
            actions: ActionConditions {
                delete: Some(DeleteAction {
                    enabled: true,
                    condition: Some(free_space_leaf),
                    mode: DeleteMode::DeleteWithFiles,
                    include_hardlinks: false,
                    group_id: None,
                    atomic: false,
                    reason: None,
                }),
                ..ActionConditions::default()
            },
            free_space_source: Some(seedkeeper_core::rule::FreeSpaceSource::QBittorrent),
        }
    }

    #[test]
    fn free_space_self_terminates_across_torrents() {
        let torrents = vec![
            torrent("a", 1_000, 20_000_000_000),
            torrent("b", 2_000, 20_000_000_000),
            torrent("c", 3_000, 20_000_000_000),
            torrent("d", 4_000, 20_000_000_000),
            torrent("e", 5_000, 20_000_000_000),
        ];
        let rule = free_space_rule("r1");
        let cross_seed = seedkeeper_indices::CrossSeedIndex::build(&torrents);
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let mut free_space = HashMap::new();
        free_space.insert(
            "r1".to_string(),
            seedkeeper_core::context::FreeSpaceProjection::starting_at(10_000_000_000),
        );
        let mut ctx = CycleContext {
            clock: seedkeeper_core::context::EvalClock::new(10_000),
            cross_seed: &cross_seed,
            hardlink_index: None,
            group_indices: &group_indices,
            quality_sets: &quality_sets,
            unregistered: None,
            release_parser: None,
            tracker_display_names: &HashMap::new(),
            free_space,
        };

        let (states, _stats) = process_cycle(&torrents, &[rule], &mut ctx);
        assert!(states.contains_key("a"));
        assert!(states.contains_key("b"));
        assert!(!states.contains_key("c"));
        assert!(!states.contains_key("d"));
        assert!(!states.contains_key("e"));
        assert_eq!(ctx.free_space["r1"].space_to_clear, 40_000_000_000);
    }

    #[test]
    fn delete_without_condition_is_rejected() {
        let torrents = vec![torrent("a", 1_000, 1_000)];
        let rule = Rule {
            id: "r1".into(),
            name: "bad delete".into(),
            instance_id: "inst".into(),
            enabled: true,
            sort_order: 0,
            tracker_pattern: "*".into(),
            actions: ActionConditions {
                delete: Some(DeleteAction {
                    enabled: true,
                    condition: None,
                    mode: DeleteMode::DeleteWithFiles,
                    include_hardlinks: false,
                    group_id: None,
                    atomic: false,
                    reason: None,
                }),
                ..ActionConditions::default()
            },
            free_space_source: None,
        };
        let cross_seed = seedkeeper_indices::CrossSeedIndex::build(&torrents);
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let mut ctx = CycleContext {
            clock: seedkeeper_core::context::EvalClock::new(10_000),
            cross_seed: &cross_seed,
            hardlink_index: None,
            group_indices: &group_indices,
            quality_sets: &quality_sets,
            unregistered: None,
            release_parser: None,
            tracker_display_names: &HashMap::new(),
            free_space: HashMap::new(),
        };
        let (states, _stats) = process_cycle(&torrents, &[rule], &mut ctx);
        assert!(!states.contains_key("a"));
    }

    #[test]
    fn pause_is_skipped_when_already_paused() {
        let mut paused = torrent("a", 1_000, 1_000);
        paused.state = TorrentStateKind::Paused;
        let rule = Rule {
            id: "r1".into(),
            name: "pause rule".into(),
            instance_id: "inst".into(),
            enabled: true,
            sort_order: 0,
            tracker_pattern: "*".into(),
            actions: ActionConditions {
                pause: Some(SimpleAction { enabled: true, condition: None }),
                ..ActionConditions::default()
            },
            free_space_source: None,
        };
        let torrents = vec![paused];
        let cross_seed = seedkeeper_indices::CrossSeedIndex::build(&torrents);
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let mut ctx = CycleContext {
            clock: seedkeeper_core::context::EvalClock::new(10_000),
            cross_seed: &cross_seed,
            hardlink_index: None,
            group_indices: &group_indices,
            quality_sets: &quality_sets,
            unregistered: None,
            release_parser: None,
            tracker_display_names: &HashMap::new(),
            free_space: HashMap::new(),
        };
        let (states, _stats) = process_cycle(&torrents, &[rule], &mut ctx);
        assert!(!states.contains_key("a"));
    }

    #[test]
    fn later_rule_sees_pending_tag_removal_and_can_re_add() {
        let mut tagged = torrent("a", 1_000, 1_000);
        tagged.tags = vec!["seeded".into()];
        let torrents = vec![tagged];

        let remove_rule = Rule {
            id: "r1".into(),
            name: "remove seeded".into(),
            instance_id: "inst".into(),
            enabled: true,
            sort_order: 0,
            tracker_pattern: "*".into(),
            actions: ActionConditions {
                tags: vec![TagAction {
                    enabled: true,
                    condition: None,
                    tag: "seeded".into(),
                    mode: TagMode::Remove,
                    use_tracker_as_tag: false,
                    managed_reset: false,
                }],
                ..ActionConditions::default()
            },
            free_space_source: None,
        };
        let add_rule = Rule {
            id: "r2".into(),
            name: "re-add seeded".into(),
            instance_id: "inst".into(),
            enabled: true,
            sort_order: 1,
            tracker_pattern: "*".into(),
            actions: ActionConditions {
                tags: vec![TagAction {
                    enabled: true,
                    condition: None,
                    tag: "seeded".into(),
                    mode: TagMode::Add,
                    use_tracker_as_tag: false,
                    managed_reset: false,
                }],
                ..ActionConditions::default()
            },
            free_space_source: None,
        };

        let cross_seed = seedkeeper_indices::CrossSeedIndex::build(&torrents);
        let group_indices = HashMap::new();
        let quality_sets = HashMap::new();
        let mut ctx = CycleContext {
            clock: seedkeeper_core::context::EvalClock::new(10_000),
            cross_seed: &cross_seed,
            hardlink_index: None,
            group_indices: &group_indices,
            quality_sets: &quality_sets,
            unregistered: None,
            release_parser: None,
            tracker_display_names: &HashMap::new(),
            free_space: HashMap::new(),
        };
        let (states, _stats) = process_cycle(&torrents, &[remove_rule, add_rule], &mut ctx);
        let state = states.get("a").expect("tag decision recorded");
        let pending = state.tags.get("seeded").expect("pending tag decision");
        assert_eq!(pending.value, TagDecision::Add);
        assert_eq!(pending.rule_id, "r2");
    }
}
