//! Shared application state every handler receives via `State<Arc<ApiState>>`.

use std::sync::Arc;

use seedkeeper_scheduler::SchedulerRegistry;
use seedkeeper_store::ActivityRunStore;
use seedkeeper_telemetry::Metrics;

/// Collaborators the HTTP surface needs. Built once at bootstrap and shared
/// across every request behind an `Arc`.
pub struct ApiState {
    /// Per-instance worker registry: apply-now, hardlink invalidation and
    /// preview all route through the `CycleDeps` a running instance owns.
    pub scheduler: Arc<SchedulerRegistry>,
    /// Activity run storage, for the `get_activity_run` route.
    pub activity_store: Arc<ActivityRunStore>,
    /// Metrics registry, for the `/metrics` route.
    pub metrics: Metrics,
}

impl ApiState {
    /// Construct the shared state.
    #[must_use]
    pub fn new(scheduler: Arc<SchedulerRegistry>, activity_store: Arc<ActivityRunStore>, metrics: Metrics) -> Self {
        Self {
            scheduler,
            activity_store,
            metrics,
        }
    }
}
