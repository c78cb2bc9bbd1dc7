//! One scan/apply-now cycle for one instance: snapshot, derive indices,
//! evaluate rules, propagate across groups, apply.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use seedkeeper_apply::{Applier, ExternalProgramRunner, PendingExternalProgram};
use seedkeeper_client::{ReleaseParser, TorrentClient};
use seedkeeper_core::context::{EvalClock, FreeSpaceProjection};
use seedkeeper_core::model::Torrent;
use seedkeeper_core::rule::Rule;
use seedkeeper_core::{ActivityOutcome, AutomationActivity};
use seedkeeper_events::{Event, EventBus};
use seedkeeper_indices::{compute_quality, CrossSeedIndex, GroupIndex, HardlinkIndex, HardlinkIndexCache, QualitySets};
use seedkeeper_rules::{process_cycle, CycleContext};
use seedkeeper_store::{ActivityRunStore, QualityProfileStore, RuleStore};
use seedkeeper_telemetry::Metrics;
use tracing::warn;
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::groups::{build_group_indices, expand_groups};

/// What one cycle produced, for the caller (the API's apply-now handler,
/// or the background worker's own logging).
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Identifier this cycle's activity items were recorded under; pass to
    /// [`seedkeeper_store::ActivityRunStore::get`] to page back through them.
    pub activity_id: Uuid,
    /// Every activity item recorded this cycle.
    pub activities: Vec<AutomationActivity>,
    /// External-program executions enqueued for out-of-band handling.
    pub pending_external_programs: Vec<PendingExternalProgram>,
    /// Number of torrents observed in this cycle's snapshot.
    pub torrents_scanned: usize,
    /// Number of distinct torrents that matched at least one rule.
    pub torrents_matched: usize,
}

/// Collaborators a cycle needs, bundled so `run_cycle`'s argument list
/// stays manageable. Cloned cheaply (every field is an `Arc` or a
/// `Clone`-cheap handle) so a worker can hold one copy and run cycles
/// against it repeatedly.
#[derive(Clone)]
pub struct CycleDeps {
    /// Torrent client RPC surface.
    pub client: Arc<dyn TorrentClient>,
    /// Rule catalog collaborator.
    pub rule_store: Arc<dyn RuleStore>,
    /// Quality profile catalog collaborator, if configured.
    pub quality_store: Option<Arc<dyn QualityProfileStore>>,
    /// Activity run storage.
    pub activity_store: Arc<ActivityRunStore>,
    /// Hardlink index cache, shared across cycles for singleflight + TTL.
    pub hardlink_cache: Arc<HardlinkIndexCache>,
    /// Release-name parser, if one is wired up.
    pub release_parser: Option<Arc<dyn ReleaseParser>>,
    /// External-program executor, if one is wired up.
    pub program_runner: Option<Arc<dyn ExternalProgramRunner>>,
    /// Hashes the tracker reported unregistered for this instance, if a
    /// health source is wired up. No collaborator in this workspace owns
    /// tracker health data; a caller with one supplies it per cycle.
    pub unregistered: Option<Arc<std::collections::HashSet<String>>>,
    /// Configured display name per tracker domain.
    pub tracker_display_names: Arc<HashMap<String, String>>,
    /// Metrics registry.
    pub metrics: Option<Metrics>,
    /// Event bus.
    pub events: Option<EventBus>,
    /// Per-hash RPC batch size.
    pub batch_size: usize,
    /// Per-hash debounce cooldown.
    pub debounce_window: Duration,
    /// When true, no client mutation RPCs are issued.
    pub dry_run: bool,
}

/// Run one cycle for `instance`, returning a [`CycleReport`].
///
/// Publishes `CycleStarted`/`CycleCompleted`/`CycleFailed` and records
/// `seedkeeper_cycles_total` if telemetry/events are wired up.
///
/// # Errors
///
/// Returns [`SchedulerError::RuleStoreUnavailable`] or
/// [`SchedulerError::SnapshotUnavailable`] if the cycle cannot even start.
/// A hardlink index build failure does not abort the cycle: it is logged
/// and the cycle proceeds with no hardlink index.
pub async fn run_cycle(deps: &CycleDeps, instance: &str) -> Result<CycleReport, SchedulerError> {
    let activity_id = Uuid::new_v4();
    if let Some(events) = &deps.events {
        events.publish(Event::CycleStarted {
            instance_id: instance.to_string(),
            activity_id,
        });
    }

    match run_cycle_inner(deps, instance, activity_id).await {
        Ok(report) => {
            if let Some(events) = &deps.events {
                events.publish(Event::CycleCompleted {
                    instance_id: instance.to_string(),
                    activity_id,
                    torrents_matched: report.torrents_matched as u32,
                    actions_applied: report
                        .activities
                        .iter()
                        .filter(|a| a.outcome == ActivityOutcome::Success)
                        .count() as u32,
                });
            }
            if let Some(metrics) = &deps.metrics {
                metrics.inc_cycle(instance, "success");
                metrics.set_torrents_scanned(instance, report.torrents_scanned as i64);
            }
            Ok(report)
        }
        Err(err) => {
            if let Some(events) = &deps.events {
                events.publish(Event::CycleFailed {
                    instance_id: instance.to_string(),
                    reason: err.to_string(),
                });
            }
            if let Some(metrics) = &deps.metrics {
                metrics.inc_cycle(instance, "failure");
            }
            Err(err)
        }
    }
}

async fn run_cycle_inner(
    deps: &CycleDeps,
    instance: &str,
    activity_id: Uuid,
) -> Result<CycleReport, SchedulerError> {
    let rules = deps
        .rule_store
        .list_rules(instance)
        .await
        .map_err(|err| SchedulerError::RuleStoreUnavailable {
            instance: instance.to_string(),
            reason: err.to_string(),
        })?;
    let enabled_rules: Vec<Rule> = rules.into_iter().filter(|r| r.enabled).collect();

    let torrents = deps
        .client
        .list_torrents(instance)
        .await
        .map_err(|err| SchedulerError::SnapshotUnavailable {
            instance: instance.to_string(),
            reason: err.to_string(),
        })?;
    let observed: HashMap<String, Torrent> =
        torrents.iter().map(|t| (t.hash.clone(), t.clone())).collect();

    let cross_seed = CrossSeedIndex::build(&torrents);
    let release_parser = deps.release_parser.as_deref();

    let hardlink_index = build_hardlink_index(deps, instance, &torrents).await;
    let group_indices =
        build_group_indices(&enabled_rules, &torrents, release_parser, hardlink_index.as_deref());
    let quality_sets = build_quality_sets(deps, instance, &torrents, release_parser).await;
    let free_space = seed_free_space_projections(deps, instance, &enabled_rules).await;

    let mut ctx = CycleContext {
        clock: EvalClock::new(now_unix()),
        cross_seed: &cross_seed,
        hardlink_index: hardlink_index.as_deref(),
        group_indices: &group_indices,
        quality_sets: &quality_sets,
        unregistered: deps.unregistered.as_deref(),
        release_parser,
        tracker_display_names: &deps.tracker_display_names,
        free_space,
    };

    let (mut desired, _stats) = process_cycle(&torrents, &enabled_rules, &mut ctx);
    expand_groups(&mut desired, &cross_seed, hardlink_index.as_deref(), &group_indices);
    let torrents_matched = desired.len();

    let applier = Applier::new(
        Arc::clone(&deps.client),
        Arc::clone(&deps.activity_store),
        seedkeeper_apply::ApplyConfig {
            batch_size: deps.batch_size,
            debounce_window: deps.debounce_window,
            dry_run: deps.dry_run,
        },
    );
    let applier = match &deps.metrics {
        Some(metrics) => applier.with_metrics(metrics.clone()),
        None => applier,
    };
    let applier = match &deps.events {
        Some(events) => applier.with_events(events.clone()),
        None => applier,
    };

    let program_runner = deps.program_runner.as_deref();
    let (activities, pending_external_programs) = applier
        .apply_cycle(instance, activity_id, &observed, &desired, program_runner)
        .await;

    Ok(CycleReport {
        activity_id,
        activities,
        pending_external_programs,
        torrents_scanned: torrents.len(),
        torrents_matched,
    })
}

/// Everything [`seedkeeper_rules::preview_rule`] needs, owned so its
/// borrowed [`CycleContext`] can be built on demand by [`Self::context`]
/// without the caller threading a dozen locals through.
pub struct PreviewSnapshot {
    /// Torrent snapshot the preview ran against.
    pub torrents: Vec<Torrent>,
    cross_seed: CrossSeedIndex,
    hardlink_index: Option<Arc<HardlinkIndex>>,
    group_indices: HashMap<String, GroupIndex>,
    quality_sets: HashMap<String, QualitySets>,
    free_space: HashMap<String, FreeSpaceProjection>,
    unregistered: Option<Arc<std::collections::HashSet<String>>>,
    tracker_display_names: Arc<HashMap<String, String>>,
    release_parser: Option<Arc<dyn ReleaseParser>>,
    now: i64,
}

impl PreviewSnapshot {
    /// Build the borrowed [`CycleContext`] this snapshot's owned data backs.
    #[must_use]
    pub fn context(&self) -> CycleContext<'_> {
        CycleContext {
            clock: EvalClock::new(self.now),
            cross_seed: &self.cross_seed,
            hardlink_index: self.hardlink_index.as_deref(),
            group_indices: &self.group_indices,
            quality_sets: &self.quality_sets,
            unregistered: self.unregistered.as_deref(),
            release_parser: self.release_parser.as_deref(),
            tracker_display_names: &self.tracker_display_names,
            free_space: self.free_space.clone(),
        }
    }
}

/// Snapshot the torrent set and derive the indices `rule` needs, without
/// evaluating or applying it. Used by `seedkeeper-api`'s `preview_rule`
/// handler, which needs the same [`CycleContext`] a real cycle would build
/// but for one rule only.
///
/// # Errors
///
/// Returns [`SchedulerError::SnapshotUnavailable`] if the client snapshot
/// fails.
pub async fn build_preview_context(
    deps: &CycleDeps,
    instance: &str,
    rule: &Rule,
) -> Result<PreviewSnapshot, SchedulerError> {
    let torrents = deps
        .client
        .list_torrents(instance)
        .await
        .map_err(|err| SchedulerError::SnapshotUnavailable {
            instance: instance.to_string(),
            reason: err.to_string(),
        })?;
    let cross_seed = CrossSeedIndex::build(&torrents);
    let release_parser = deps.release_parser.clone();
    let hardlink_index = build_hardlink_index(deps, instance, &torrents).await;
    let rules = std::slice::from_ref(rule);
    let group_indices =
        build_group_indices(rules, &torrents, release_parser.as_deref(), hardlink_index.as_deref());
    let quality_sets = build_quality_sets(deps, instance, &torrents, release_parser.as_deref()).await;
    let free_space = seed_free_space_projections(deps, instance, rules).await;

    Ok(PreviewSnapshot {
        torrents,
        cross_seed,
        hardlink_index,
        group_indices,
        quality_sets,
        free_space,
        unregistered: deps.unregistered.clone(),
        tracker_display_names: Arc::clone(&deps.tracker_display_names),
        release_parser,
        now: now_unix(),
    })
}

async fn build_hardlink_index(
    deps: &CycleDeps,
    instance: &str,
    torrents: &[Torrent],
) -> Option<Arc<HardlinkIndex>> {
    match deps.hardlink_cache.get_or_build(deps.client.as_ref(), instance, torrents).await {
        Ok(index) => {
            if let Some(metrics) = &deps.metrics {
                metrics.inc_hardlink_rebuild(instance);
            }
            Some(index)
        }
        Err(err) => {
            warn!(instance, error = %err, "hardlink index build failed, continuing without one");
            None
        }
    }
}

async fn build_quality_sets(
    deps: &CycleDeps,
    instance: &str,
    torrents: &[Torrent],
    release_parser: Option<&dyn ReleaseParser>,
) -> HashMap<String, QualitySets> {
    let (Some(store), Some(parser)) = (&deps.quality_store, release_parser) else {
        return HashMap::new();
    };
    match store.list_profiles(instance).await {
        Ok(profiles) => profiles
            .iter()
            .map(|profile| (profile.id.clone(), compute_quality(profile, torrents, parser)))
            .collect(),
        Err(err) => {
            warn!(instance, error = %err, "quality profile load failed, continuing without quality data");
            HashMap::new()
        }
    }
}

async fn seed_free_space_projections(
    deps: &CycleDeps,
    instance: &str,
    rules: &[Rule],
) -> HashMap<String, FreeSpaceProjection> {
    let mut projections = HashMap::new();
    for rule in rules {
        let Some(source) = &rule.free_space_source else {
            continue;
        };
        if projections.contains_key(&rule.id) {
            continue;
        }
        match seedkeeper_indices::resolve_free_space(source, deps.client.as_ref(), instance).await
        {
            Ok(free_space) => {
                projections.insert(rule.id.clone(), FreeSpaceProjection::starting_at(free_space));
            }
            Err(err) => {
                warn!(instance, rule = %rule.id, error = %err, "free space resolution failed, FreeSpace conditions for this rule will not match");
            }
        }
    }
    projections
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}
