//! Cross-seed/hardlink group-id discovery and desired-state propagation.
//!
//! `seedkeeper-apply` has no index dependency and only ever sees one
//! torrent's desired state at a time; expanding a delete, move, or
//! category decision across its cross-seed/hardlink group is this crate's
//! job, performed after `seedkeeper_rules::process_cycle` and before the
//! applier runs.

use std::collections::{HashMap, HashSet};

use seedkeeper_client::ReleaseParser;
use seedkeeper_core::condition::{ConditionField, RuleCondition};
use seedkeeper_core::desired_state::Provenanced;
use seedkeeper_core::model::Torrent;
use seedkeeper_core::rule::{ActionConditions, DeleteMode, Rule};
use seedkeeper_core::TorrentDesiredState;
use seedkeeper_indices::{
    build_group_index, CrossSeedIndex, GroupIndex, HardlinkIndex, GROUP_CONTENT_SAVE_PATH,
};
use seedkeeper_rules::resolve_group_id;

fn all_conditions(actions: &ActionConditions) -> Vec<&RuleCondition> {
    let mut conditions = Vec::new();
    if let Some(speed) = &actions.speed_limits {
        conditions.extend(speed.upload.as_ref().and_then(|slot| slot.condition.as_ref()));
        conditions.extend(speed.download.as_ref().and_then(|slot| slot.condition.as_ref()));
    }
    if let Some(share) = &actions.share_limits {
        conditions.extend(share.ratio.as_ref().and_then(|slot| slot.condition.as_ref()));
        conditions.extend(share.seeding_minutes.as_ref().and_then(|slot| slot.condition.as_ref()));
    }
    conditions.extend(actions.pause.as_ref().and_then(|a| a.condition.as_ref()));
    conditions.extend(actions.resume.as_ref().and_then(|a| a.condition.as_ref()));
    conditions.extend(actions.recheck.as_ref().and_then(|a| a.condition.as_ref()));
    conditions.extend(actions.reannounce.as_ref().and_then(|a| a.condition.as_ref()));
    conditions.extend(actions.category.as_ref().and_then(|a| a.condition.as_ref()));
    for tag in &actions.tags {
        conditions.extend(tag.condition.as_ref());
    }
    conditions.extend(actions.mv.as_ref().and_then(|a| a.condition.as_ref()));
    conditions.extend(actions.delete.as_ref().and_then(|a| a.condition.as_ref()));
    conditions.extend(actions.external_program.as_ref().and_then(|a| a.condition.as_ref()));
    conditions
}

fn collect_leaf_group_ids(condition: &RuleCondition, rule: &Rule, out: &mut HashSet<String>) {
    match condition {
        RuleCondition::Leaf(leaf) => {
            if matches!(leaf.field, ConditionField::IsGrouped | ConditionField::GroupSize) {
                out.insert(resolve_group_id(leaf, rule));
            }
        }
        RuleCondition::Group { conditions, .. } => {
            for child in conditions {
                collect_leaf_group_ids(child, rule, out);
            }
        }
    }
}

/// Every group id `rule` might need a [`GroupIndex`] for, whether
/// referenced by a leaf condition or by an action's own propagation field.
///
/// Delete and move decisions carry their `group_id` through unchanged
/// (`seedkeeper_rules::processor`'s `fold_delete`/`fold_move` apply no
/// fallback), so only an explicit `group_id` needs an index here.
/// `DeleteWithFilesIncludeCrossSeeds` and `include_hardlinks` expand via
/// the cross-seed/hardlink indices directly and need no [`GroupIndex`].
fn required_group_ids(rule: &Rule) -> HashSet<String> {
    let mut ids = HashSet::new();
    for condition in all_conditions(&rule.actions) {
        collect_leaf_group_ids(condition, rule, &mut ids);
    }
    if let Some(delete) = &rule.actions.delete {
        if delete.enabled {
            ids.extend(delete.group_id.clone());
        }
    }
    if let Some(mv) = &rule.actions.mv {
        if mv.enabled {
            ids.extend(mv.group_id.clone());
        }
    }
    if let Some(category) = &rule.actions.category {
        let group_id = category
            .group_id
            .clone()
            .or_else(|| category.include_cross_seeds.then(|| GROUP_CONTENT_SAVE_PATH.to_string()));
        if category.enabled {
            ids.extend(group_id);
        }
    }
    ids
}

/// Build every `(rule_id, group_id)` index a cycle's rules reference,
/// keyed the way [`seedkeeper_rules::CycleContext::group_index`] expects.
/// Group indices that share a `group_id` across rules are built once and
/// cloned, since the index itself does not depend on the rule.
#[must_use]
pub fn build_group_indices(
    rules: &[Rule],
    torrents: &[Torrent],
    release_parser: Option<&dyn ReleaseParser>,
    hardlink_index: Option<&HardlinkIndex>,
) -> HashMap<String, GroupIndex> {
    let mut built: HashMap<String, GroupIndex> = HashMap::new();
    let mut out = HashMap::new();
    for rule in rules {
        for group_id in required_group_ids(rule) {
            let index = built
                .entry(group_id.clone())
                .or_insert_with(|| build_group_index(&group_id, torrents, release_parser, hardlink_index))
                .clone();
            out.insert(format!("{}|{group_id}", rule.id), index);
        }
    }
    out
}

/// Propagate delete/move/category decisions across each trigger torrent's
/// cross-seed and/or hardlink group.
///
/// A peer already carrying its own decision for the same action kind is
/// left untouched: group propagation fills gaps, it never overrides a
/// torrent's own matched rules.
pub fn expand_groups(
    desired: &mut HashMap<String, TorrentDesiredState>,
    cross_seed: &CrossSeedIndex,
    hardlink_index: Option<&HardlinkIndex>,
    group_indices: &HashMap<String, GroupIndex>,
) {
    downgrade_preserve_cross_seeds(desired, cross_seed);

    let triggers: Vec<(String, TorrentDesiredState)> =
        desired.iter().map(|(hash, state)| (hash.clone(), state.clone())).collect();

    for (hash, state) in &triggers {
        if let Some(decision) = &state.delete {
            expand_delete(hash, decision, desired, cross_seed, hardlink_index, group_indices);
        }
        if let Some(decision) = &state.mv {
            expand_by_group(hash, decision, group_indices, desired, |s| &mut s.mv);
        }
        if let Some(decision) = &state.category {
            expand_by_group(hash, decision, group_indices, desired, |s| &mut s.category);
        }
    }
}

fn downgrade_preserve_cross_seeds(
    desired: &mut HashMap<String, TorrentDesiredState>,
    cross_seed: &CrossSeedIndex,
) {
    for (hash, state) in desired.iter_mut() {
        if let Some(decision) = &mut state.delete {
            if decision.value.mode == DeleteMode::DeleteWithFilesPreserveCrossSeeds
                && cross_seed.has_peer(hash)
            {
                decision.value.mode = DeleteMode::KeepFiles;
            }
        }
    }
}

fn expand_delete(
    hash: &str,
    decision: &Provenanced<seedkeeper_core::desired_state::DeleteDecision>,
    desired: &mut HashMap<String, TorrentDesiredState>,
    cross_seed: &CrossSeedIndex,
    hardlink_index: Option<&HardlinkIndex>,
    group_indices: &HashMap<String, GroupIndex>,
) {
    let mut peers: HashSet<String> = HashSet::new();
    if decision.value.mode == DeleteMode::DeleteWithFilesIncludeCrossSeeds {
        peers.extend(cross_seed.peers_of(hash));
    }
    if decision.value.include_hardlinks {
        if let Some(index) = hardlink_index {
            peers.extend(index.copies_of(hash));
        }
    }
    if let Some(group_id) = &decision.value.group_id {
        if let Some(index) = group_indices.get(&format!("{}|{group_id}", decision.rule_id)) {
            peers.extend(index.peers_of(hash));
        }
    }
    for peer in peers {
        let entry = desired.entry(peer).or_default();
        if entry.delete.is_none() {
            entry.delete = Some(decision.clone());
        }
    }
}

fn expand_by_group<T: Clone>(
    hash: &str,
    decision: &Provenanced<T>,
    group_indices: &HashMap<String, GroupIndex>,
    desired: &mut HashMap<String, TorrentDesiredState>,
    slot: impl Fn(&mut TorrentDesiredState) -> &mut Option<Provenanced<T>>,
) where
    T: GroupScoped,
{
    let Some(group_id) = decision.value.group_id() else {
        return;
    };
    let Some(index) = group_indices.get(&format!("{}|{group_id}", decision.rule_id)) else {
        return;
    };
    for peer in index.peers_of(hash) {
        let entry = desired.entry(peer).or_default();
        let field = slot(entry);
        if field.is_none() {
            *field = Some(decision.clone());
        }
    }
}

/// Decisions that carry their own propagation group id.
trait GroupScoped {
    fn group_id(&self) -> Option<&str>;
}

impl GroupScoped for seedkeeper_core::desired_state::MoveDecision {
    fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }
}

impl GroupScoped for seedkeeper_core::desired_state::CategoryDecision {
    fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }
}
