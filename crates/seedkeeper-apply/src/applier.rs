//! The action applier: diffs desired state against observed state,
//! batches identical RPC calls, and records an [`AutomationActivity`] for
//! every action attempted.
//!
//! Cross-seed/hardlink group expansion for delete and move is the caller's
//! responsibility (the scheduler, which holds the indices): by the time a
//! [`TorrentDesiredState`] reaches this crate, any propagation to peer
//! hashes has already been materialized as additional entries in the
//! `desired` map. This keeps the applier free of an `seedkeeper-indices`
//! dependency — its job is purely diff, batch, debounce, and report.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use seedkeeper_client::{DeleteApiMode, TorrentClient};
use seedkeeper_core::desired_state::TagDecision;
use seedkeeper_core::path::is_content_path_ambiguous;
use seedkeeper_core::rule::DeleteMode;
use seedkeeper_core::{ActionKind, ActivityOutcome, AutomationActivity, Torrent, TorrentDesiredState};
use seedkeeper_events::{Event, EventBus};
use seedkeeper_store::ActivityRunStore;
use seedkeeper_telemetry::Metrics;
use tracing::warn;
use uuid::Uuid;

use crate::batch::batches;
use crate::debounce::Debouncer;
use crate::external::{ExternalProgramRunner, PendingExternalProgram};

/// One torrent eligible for this cycle's apply pass: debounce already
/// checked, its observed snapshot already joined in.
type ActiveEntry<'a> = (&'a str, &'a TorrentDesiredState, &'a Torrent);

/// Tunables the scheduler threads in from `seedkeeper-config`.
#[derive(Debug, Clone, Copy)]
pub struct ApplyConfig {
    /// Maximum hashes per client RPC call.
    pub batch_size: usize,
    /// Per-hash cooldown after an action is applied.
    pub debounce_window: std::time::Duration,
    /// When true, no client RPCs are issued; only aggregated dry-run
    /// activities are produced.
    pub dry_run: bool,
}

/// Applies a cycle's accumulated desired state to a torrent client.
pub struct Applier {
    client: Arc<dyn TorrentClient>,
    store: Arc<ActivityRunStore>,
    metrics: Option<Metrics>,
    events: Option<EventBus>,
    debouncer: Debouncer,
    config: ApplyConfig,
}

impl Applier {
    /// Build an applier around `client`, persisting every cycle's
    /// activities into `store`.
    #[must_use]
    pub fn new(client: Arc<dyn TorrentClient>, store: Arc<ActivityRunStore>, config: ApplyConfig) -> Self {
        Self {
            client,
            store,
            metrics: None,
            events: None,
            debouncer: Debouncer::new(),
            config,
        }
    }

    /// Attach a metrics registry; every activity increments its action/outcome counter.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Attach an event bus; every activity publishes an `ActivityRecorded` event.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Apply one cycle's desired state for `instance`, persisting the
    /// result under `activity_id`.
    ///
    /// Returns the activities recorded and any external-program executions
    /// enqueued for out-of-band handling.
    ///
    /// # Panics
    ///
    /// Panics if an internal batch is built from a hash not present in
    /// `active`, which would indicate a bug in the grouping logic above it.
    pub async fn apply_cycle(
        &self,
        instance: &str,
        activity_id: Uuid,
        observed: &HashMap<String, Torrent>,
        desired: &HashMap<String, TorrentDesiredState>,
        program_runner: Option<&dyn ExternalProgramRunner>,
    ) -> (Vec<AutomationActivity>, Vec<PendingExternalProgram>) {
        let now = Instant::now();
        let active: Vec<ActiveEntry<'_>> = desired
            .iter()
            .filter_map(|(hash, state)| {
                let torrent = observed.get(hash)?;
                if self
                    .debouncer
                    .is_debounced(instance, hash, self.config.debounce_window, now)
                {
                    return None;
                }
                Some((hash.as_str(), state, torrent))
            })
            .collect();

        let mut activities = Vec::new();
        activities.extend(self.apply_speed_limits(instance, &active).await);
        activities.extend(self.apply_share_limits(instance, &active).await);
        activities.extend(self.apply_state_transitions(instance, &active).await);
        activities.extend(self.apply_category(instance, &active).await);
        activities.extend(self.apply_tags(instance, &active).await);
        activities.extend(self.apply_move(instance, &active).await);
        activities.extend(self.apply_delete(instance, &active).await);
        let (program_activities, pending) =
            self.apply_external_program(instance, &active, program_runner).await;
        activities.extend(program_activities);

        if !self.config.dry_run {
            for (hash, _, _) in &active {
                self.debouncer.mark(instance, hash, now);
            }
        }

        self.record(instance, activity_id, &activities);
        (activities, pending)
    }

    fn record(&self, instance: &str, activity_id: Uuid, activities: &[AutomationActivity]) {
        self.store.put(activity_id, instance, activities.to_vec());
        if let Some(metrics) = &self.metrics {
            for activity in activities {
                metrics.inc_action(activity.action.as_str(), activity.outcome.as_str());
            }
        }
        if let Some(events) = &self.events {
            for activity in activities {
                events.publish(Event::ActivityRecorded {
                    instance_id: activity.instance_id.clone(),
                    hash: activity.hash.clone(),
                    action: activity.action.as_str(),
                    outcome: activity.outcome.as_str(),
                });
            }
        }
    }

    async fn apply_speed_limits(&self, instance: &str, active: &[ActiveEntry<'_>]) -> Vec<AutomationActivity> {
        let mut activities = Vec::new();

        let mut upload_groups: HashMap<u64, Vec<ActiveEntry<'_>>> = HashMap::new();
        let mut download_groups: HashMap<u64, Vec<ActiveEntry<'_>>> = HashMap::new();
        for entry @ (_, state, _) in active {
            if let Some(limit) = &state.upload_limit_kib {
                upload_groups.entry(limit.value).or_default().push(*entry);
            }
            if let Some(limit) = &state.download_limit_kib {
                download_groups.entry(limit.value).or_default().push(*entry);
            }
        }

        for (kib, group) in upload_groups {
            activities.extend(
                self.run_batched(
                    instance,
                    &group,
                    ActionKind::SpeedLimits,
                    |hashes| self.client.set_upload_limit(instance, hashes, kib),
                    |state| &state.upload_limit_kib,
                )
                .await,
            );
        }
        for (kib, group) in download_groups {
            activities.extend(
                self.run_batched(
                    instance,
                    &group,
                    ActionKind::SpeedLimits,
                    |hashes| self.client.set_download_limit(instance, hashes, kib),
                    |state| &state.download_limit_kib,
                )
                .await,
            );
        }
        activities
    }

    async fn apply_share_limits(&self, instance: &str, active: &[ActiveEntry<'_>]) -> Vec<AutomationActivity> {
        let mut activities = Vec::new();

        let mut ratio_groups: HashMap<u64, Vec<ActiveEntry<'_>>> = HashMap::new();
        let mut seeding_groups: HashMap<i64, Vec<ActiveEntry<'_>>> = HashMap::new();
        for entry @ (_, state, _) in active {
            if let Some(limit) = &state.ratio_limit {
                ratio_groups.entry(limit.value.to_bits()).or_default().push(*entry);
            }
            if let Some(limit) = &state.seeding_minutes_limit {
                seeding_groups.entry(limit.value).or_default().push(*entry);
            }
        }

        for (bits, group) in ratio_groups {
            let ratio = f64::from_bits(bits);
            activities.extend(
                self.run_batched(
                    instance,
                    &group,
                    ActionKind::ShareLimits,
                    |hashes| self.client.set_ratio_limit(instance, hashes, ratio),
                    |state| &state.ratio_limit,
                )
                .await,
            );
        }
        for (minutes, group) in seeding_groups {
            activities.extend(
                self.run_batched(
                    instance,
                    &group,
                    ActionKind::ShareLimits,
                    |hashes| self.client.set_seeding_time_limit(instance, hashes, minutes),
                    |state| &state.seeding_minutes_limit,
                )
                .await,
            );
        }
        activities
    }

    async fn apply_state_transitions(
        &self,
        instance: &str,
        active: &[ActiveEntry<'_>],
    ) -> Vec<AutomationActivity> {
        let mut activities = Vec::new();

        let pause: Vec<_> = active
            .iter()
            .filter(|(_, state, torrent)| state.should_pause.is_some() && !torrent.is_paused())
            .copied()
            .collect();
        activities.extend(
            self.run_batched(
                instance,
                &pause,
                ActionKind::Pause,
                |hashes| self.client.pause(instance, hashes),
                |state| &state.should_pause,
            )
            .await,
        );

        let resume: Vec<_> = active
            .iter()
            .filter(|(_, state, torrent)| state.should_resume.is_some() && torrent.is_paused())
            .copied()
            .collect();
        activities.extend(
            self.run_batched(
                instance,
                &resume,
                ActionKind::Resume,
                |hashes| self.client.resume(instance, hashes),
                |state| &state.should_resume,
            )
            .await,
        );

        let recheck: Vec<_> = active
            .iter()
            .filter(|(_, state, torrent)| state.should_recheck.is_some() && !torrent.is_checking())
            .copied()
            .collect();
        activities.extend(
            self.run_batched(
                instance,
                &recheck,
                ActionKind::Recheck,
                |hashes| self.client.recheck(instance, hashes),
                |state| &state.should_recheck,
            )
            .await,
        );

        let reannounce: Vec<_> = active
            .iter()
            .filter(|(_, state, _)| state.should_reannounce.is_some())
            .copied()
            .collect();
        activities.extend(
            self.run_batched(
                instance,
                &reannounce,
                ActionKind::Reannounce,
                |hashes| self.client.reannounce(instance, hashes),
                |state| &state.should_reannounce,
            )
            .await,
        );

        activities
    }

    async fn apply_category(&self, instance: &str, active: &[ActiveEntry<'_>]) -> Vec<AutomationActivity> {
        let mut groups: HashMap<String, Vec<ActiveEntry<'_>>> = HashMap::new();
        for entry @ (_, state, torrent) in active {
            if let Some(decision) = &state.category {
                if decision.value.category != torrent.category {
                    groups.entry(decision.value.category.clone()).or_default().push(*entry);
                }
            }
        }

        let mut activities = Vec::new();
        for (category, group) in groups {
            activities.extend(
                self.run_batched(
                    instance,
                    &group,
                    ActionKind::Category,
                    |hashes| self.client.set_category(instance, hashes, &category),
                    |state| &state.category,
                )
                .await,
            );
        }
        activities
    }

    async fn apply_tags(&self, instance: &str, active: &[ActiveEntry<'_>]) -> Vec<AutomationActivity> {
        let mut add_groups: HashMap<Vec<String>, Vec<&str>> = HashMap::new();
        let mut remove_groups: HashMap<Vec<String>, Vec<&str>> = HashMap::new();

        for (hash, state, torrent) in active {
            if state.tags.is_empty() {
                continue;
            }
            let mut to_add: Vec<String> = state
                .tags
                .iter()
                .filter(|(tag, decision)| {
                    decision.value == TagDecision::Add && !torrent.has_tag(tag)
                })
                .map(|(tag, _)| tag.clone())
                .collect();
            let mut to_remove: Vec<String> = state
                .tags
                .iter()
                .filter(|(tag, decision)| {
                    decision.value == TagDecision::Remove && torrent.has_tag(tag)
                })
                .map(|(tag, _)| tag.clone())
                .collect();
            to_add.sort();
            to_remove.sort();

            if !to_add.is_empty() {
                add_groups.entry(to_add).or_default().push(*hash);
            }
            if !to_remove.is_empty() {
                remove_groups.entry(to_remove).or_default().push(*hash);
            }
        }

        let mut activities = Vec::new();
        for (tags, hashes) in add_groups {
            activities.extend(self.run_tag_batch(instance, &hashes, &tags, true).await);
        }
        for (tags, hashes) in remove_groups {
            activities.extend(self.run_tag_batch(instance, &hashes, &tags, false).await);
        }
        activities
    }

    async fn run_tag_batch(
        &self,
        instance: &str,
        hashes: &[&str],
        tags: &[String],
        adding: bool,
    ) -> Vec<AutomationActivity> {
        let mut activities = Vec::new();
        let owned: Vec<String> = hashes.iter().map(|h| (*h).to_string()).collect();
        for batch in batches(&owned, self.config.batch_size) {
            let outcome = if self.config.dry_run {
                Ok(())
            } else if adding {
                self.client.add_tags(instance, batch, tags).await
            } else {
                self.client.remove_tags(instance, batch, tags).await
            };
            for hash in batch {
                activities.push(tag_activity(instance, hash, &outcome));
            }
        }
        activities
    }

    async fn apply_move(&self, instance: &str, active: &[ActiveEntry<'_>]) -> Vec<AutomationActivity> {
        let mut groups: HashMap<String, Vec<ActiveEntry<'_>>> = HashMap::new();
        for entry @ (_, state, _) in active {
            if let Some(decision) = &state.mv {
                groups.entry(decision.value.destination.clone()).or_default().push(*entry);
            }
        }

        let mut activities = Vec::new();
        for (destination, group) in groups {
            activities.extend(
                self.run_batched(
                    instance,
                    &group,
                    ActionKind::Move,
                    |hashes| self.client.move_torrents(instance, hashes, &destination),
                    |state| &state.mv,
                )
                .await,
            );
        }
        activities
    }

    async fn apply_delete(&self, instance: &str, active: &[ActiveEntry<'_>]) -> Vec<AutomationActivity> {
        let mut keep_files: Vec<ActiveEntry<'_>> = Vec::new();
        let mut with_files: Vec<ActiveEntry<'_>> = Vec::new();

        for entry @ (_, state, torrent) in active {
            let Some(decision) = &state.delete else { continue };
            match decision.value.mode {
                DeleteMode::None => {}
                DeleteMode::KeepFiles => keep_files.push(*entry),
                DeleteMode::DeleteWithFiles
                | DeleteMode::DeleteWithFilesPreserveCrossSeeds
                | DeleteMode::DeleteWithFilesIncludeCrossSeeds => {
                    if is_content_path_ambiguous(torrent) {
                        warn!(
                            hash = %torrent.hash,
                            "content path ambiguous with save path; demoting delete-with-files to keep-files"
                        );
                        keep_files.push(*entry);
                    } else {
                        with_files.push(*entry);
                    }
                }
            }
        }

        let mut activities = Vec::new();
        activities.extend(
            self.run_batched(
                instance,
                &keep_files,
                ActionKind::Delete,
                |hashes| self.client.delete(instance, hashes, DeleteApiMode::KeepFiles),
                |state| &state.delete,
            )
            .await,
        );
        activities.extend(
            self.run_batched(
                instance,
                &with_files,
                ActionKind::Delete,
                |hashes| self.client.delete(instance, hashes, DeleteApiMode::WithFiles),
                |state| &state.delete,
            )
            .await,
        );
        activities
    }

    async fn apply_external_program(
        &self,
        instance: &str,
        active: &[ActiveEntry<'_>],
        runner: Option<&dyn ExternalProgramRunner>,
    ) -> (Vec<AutomationActivity>, Vec<PendingExternalProgram>) {
        let mut activities = Vec::new();
        let mut pending = Vec::new();

        for (hash, state, torrent) in active {
            let Some(decision) = &state.external_program_id else { continue };
            if self.config.dry_run {
                activities.push(self.dry_run_activity(instance, ActionKind::ExternalProgram, 1));
                continue;
            }

            let program_id = decision.value.clone();
            let outcome = match runner {
                Some(runner) => runner.enqueue(instance, &program_id, hash).await,
                None => Err("external program service not configured".to_string()),
            };

            match outcome {
                Ok(()) => {
                    pending.push(PendingExternalProgram {
                        instance_id: instance.to_string(),
                        hash: (*hash).to_string(),
                        program_id,
                    });
                    activities.push(AutomationActivity {
                        instance_id: instance.to_string(),
                        hash: (*hash).to_string(),
                        torrent_name: torrent.name.clone(),
                        tracker_domain: None,
                        action: ActionKind::ExternalProgram,
                        rule_id: Some(decision.rule_id.clone()),
                        rule_name: decision.rule_name.clone(),
                        outcome: ActivityOutcome::Success,
                        reason: None,
                        created_at: Utc::now(),
                    });
                }
                Err(reason) => {
                    activities.push(AutomationActivity {
                        instance_id: instance.to_string(),
                        hash: (*hash).to_string(),
                        torrent_name: torrent.name.clone(),
                        tracker_domain: None,
                        action: ActionKind::ExternalProgram,
                        rule_id: Some(decision.rule_id.clone()),
                        rule_name: decision.rule_name.clone(),
                        outcome: ActivityOutcome::Failed,
                        reason: Some(reason),
                        created_at: Utc::now(),
                    });
                }
            }
        }

        (activities, pending)
    }

    /// Run one client call against a batched group of torrents sharing the
    /// same target value, recording one activity per hash (or, in dry-run
    /// mode, one aggregated activity for the whole group).
    async fn run_batched<F, Fut, T>(
        &self,
        instance: &str,
        group: &[ActiveEntry<'_>],
        action: ActionKind,
        call: F,
        provenance: impl Fn(&TorrentDesiredState) -> &Option<seedkeeper_core::desired_state::Provenanced<T>>,
    ) -> Vec<AutomationActivity>
    where
        F: Fn(&[String]) -> Fut,
        Fut: std::future::Future<Output = seedkeeper_client::Result<()>>,
    {
        if group.is_empty() {
            return Vec::new();
        }

        if self.config.dry_run {
            return vec![self.dry_run_activity(instance, action, group.len())];
        }

        let hashes: Vec<String> = group.iter().map(|(hash, ..)| (*hash).to_string()).collect();
        let mut activities = Vec::new();
        for batch in batches(&hashes, self.config.batch_size) {
            let outcome = call(batch).await;
            for hash in batch {
                let (_, state, torrent) = group
                    .iter()
                    .find(|(h, ..)| *h == hash.as_str())
                    .expect("batch hash originated from group");
                let rule = provenance(state).as_ref();
                activities.push(AutomationActivity {
                    instance_id: instance.to_string(),
                    hash: hash.clone(),
                    torrent_name: torrent.name.clone(),
                    tracker_domain: None,
                    action,
                    rule_id: rule.map(|p| p.rule_id.clone()),
                    rule_name: rule.map_or_else(String::new, |p| p.rule_name.clone()),
                    outcome: match &outcome {
                        Ok(()) => ActivityOutcome::Success,
                        Err(_) => ActivityOutcome::Failed,
                    },
                    reason: outcome.as_ref().err().map(ToString::to_string),
                    created_at: Utc::now(),
                });
            }
        }
        activities
    }

    fn dry_run_activity(&self, instance: &str, action: ActionKind, count: usize) -> AutomationActivity {
        AutomationActivity {
            instance_id: instance.to_string(),
            hash: String::new(),
            torrent_name: String::new(),
            tracker_domain: None,
            action,
            rule_id: None,
            rule_name: String::new(),
            outcome: ActivityOutcome::DryRun,
            reason: Some(format!("{count} torrent(s) would be updated")),
            created_at: Utc::now(),
        }
    }
}

/// Tags have no single rule attribution (the add/remove set can be the
/// union of several rules), so tag activities carry no `rule_id`.
fn tag_activity(instance: &str, hash: &str, outcome: &seedkeeper_client::Result<()>) -> AutomationActivity {
    AutomationActivity {
        instance_id: instance.to_string(),
        hash: hash.to_string(),
        torrent_name: String::new(),
        tracker_domain: None,
        action: ActionKind::Tags,
        rule_id: None,
        rule_name: String::new(),
        outcome: match outcome {
            Ok(()) => ActivityOutcome::Success,
            Err(_) => ActivityOutcome::Failed,
        },
        reason: outcome.as_ref().err().map(ToString::to_string),
        created_at: Utc::now(),
    }
}
