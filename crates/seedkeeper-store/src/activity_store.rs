//! In-memory, retention-bounded store for activity runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use seedkeeper_core::AutomationActivity;
use uuid::Uuid;

/// Default retention window for activity runs.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;
/// Default maximum number of runs retained regardless of age.
pub const DEFAULT_MAX_RUNS: usize = 500;

/// Bounds applied by [`ActivityRunStore::prune`].
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Maximum age of a retained run.
    pub retention: Duration,
    /// Maximum number of runs retained regardless of age.
    pub max_runs: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention: Duration::hours(DEFAULT_RETENTION_HOURS),
            max_runs: DEFAULT_MAX_RUNS,
        }
    }
}

/// One scan or apply-now cycle's worth of activity records.
#[derive(Debug, Clone)]
struct ActivityRun {
    instance_id: String,
    created_at: DateTime<Utc>,
    items: Vec<AutomationActivity>,
}

/// A page of activity items returned by [`ActivityRunStore::get`].
#[derive(Debug, Clone)]
pub struct ActivityRunPage {
    /// Instance the run belongs to.
    pub instance_id: String,
    /// When the run was recorded.
    pub created_at: DateTime<Utc>,
    /// Total number of items in the run, before `offset`/`limit` slicing.
    pub total: usize,
    /// The requested slice of items.
    pub items: Vec<AutomationActivity>,
}

#[derive(Default)]
struct Inner {
    runs: HashMap<Uuid, ActivityRun>,
    order: VecDeque<Uuid>,
}

/// Thread-safe, retention-bounded store for activity runs.
///
/// A run is identified by its `activity_id` (one per scheduler cycle or
/// manual apply-now) and scoped to the `instance_id` it was produced for;
/// [`get`](Self::get) only returns a run if both match.
pub struct ActivityRunStore {
    inner: Mutex<Inner>,
    policy: RetentionPolicy,
}

impl ActivityRunStore {
    /// Build a store with the given retention policy.
    #[must_use]
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            policy,
        }
    }

    /// Record (or replace) a run's items.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned.
    pub fn put(&self, activity_id: Uuid, instance_id: impl Into<String>, items: Vec<AutomationActivity>) {
        let mut inner = self.lock();
        inner.runs.insert(
            activity_id,
            ActivityRun {
                instance_id: instance_id.into(),
                created_at: Utc::now(),
                items,
            },
        );
        inner.order.push_back(activity_id);
        self.prune_locked(&mut inner);
    }

    /// Fetch a page of a run's items, iff `instance_id` matches the run owner.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned.
    #[must_use]
    pub fn get(
        &self,
        instance_id: &str,
        activity_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Option<ActivityRunPage> {
        let mut inner = self.lock();
        self.prune_locked(&mut inner);
        let run = inner.runs.get(&activity_id)?;
        if run.instance_id != instance_id {
            return None;
        }
        Some(ActivityRunPage {
            instance_id: run.instance_id.clone(),
            created_at: run.created_at,
            total: run.items.len(),
            items: run.items.iter().skip(offset).take(limit).cloned().collect(),
        })
    }

    /// Drop runs older than the retention window or beyond the run-count cap.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned.
    pub fn prune(&self) {
        let mut inner = self.lock();
        self.prune_locked(&mut inner);
    }

    fn prune_locked(&self, inner: &mut Inner) {
        let cutoff = Utc::now() - self.policy.retention;
        while let Some(front) = inner.order.front().copied() {
            match inner.runs.get(&front) {
                None => {
                    inner.order.pop_front();
                }
                Some(run) if run.created_at < cutoff => {
                    inner.order.pop_front();
                    inner.runs.remove(&front);
                }
                Some(_) => break,
            }
        }
        while inner.runs.len() > self.policy.max_runs {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.runs.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ActivityRunStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedkeeper_core::{ActionKind, ActivityOutcome};

    fn activity(hash: &str) -> AutomationActivity {
        AutomationActivity {
            instance_id: "main".into(),
            hash: hash.into(),
            torrent_name: "demo".into(),
            tracker_domain: None,
            action: ActionKind::Pause,
            rule_id: Some("r1".into()),
            rule_name: "demo rule".into(),
            outcome: ActivityOutcome::Success,
            reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn put_then_get_returns_scoped_page() {
        let store = ActivityRunStore::default();
        let id = Uuid::new_v4();
        store.put(id, "main", vec![activity("a"), activity("b")]);

        let page = store.get("main", id, 0, 10).expect("run present");
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);

        assert!(store.get("other-instance", id, 0, 10).is_none());
    }

    #[test]
    fn get_respects_offset_and_limit() {
        let store = ActivityRunStore::default();
        let id = Uuid::new_v4();
        store.put(id, "main", vec![activity("a"), activity("b"), activity("c")]);

        let page = store.get("main", id, 1, 1).expect("run present");
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].hash, "b");
    }

    #[test]
    fn prune_evicts_beyond_max_runs() {
        let policy = RetentionPolicy {
            retention: Duration::hours(24),
            max_runs: 2,
        };
        let store = ActivityRunStore::new(policy);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            store.put(*id, "main", vec![activity("a")]);
        }

        assert!(store.get("main", ids[0], 0, 10).is_none());
        assert!(store.get("main", ids[2], 0, 10).is_some());
    }
}
