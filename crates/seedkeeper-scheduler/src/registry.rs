//! Multi-instance worker registry: the API and app-bootstrap layers talk
//! to this, never to an individual [`InstanceWorker`] directly.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::info;

use seedkeeper_config::CoreConfig;

use crate::cycle::{CycleDeps, CycleReport};
use crate::error::SchedulerError;
use crate::instance::{spawn_instance_worker, Command, InstanceWorker};

struct Entry {
    worker: InstanceWorker,
    config: Arc<RwLock<CoreConfig>>,
    deps: CycleDeps,
}

/// Owns one background worker per instance, keyed by instance id.
#[derive(Default)]
pub struct SchedulerRegistry {
    entries: Mutex<HashMap<String, Entry>>,
}

impl SchedulerRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a worker for `instance`. A worker already
    /// running for this instance is stopped first.
    pub async fn start(&self, instance: String, deps: CycleDeps, config: CoreConfig) {
        let config = Arc::new(RwLock::new(config));
        let worker = spawn_instance_worker(instance.clone(), deps.clone(), Arc::clone(&config));
        let mut entries = self.entries.lock().await;
        if let Some(previous) = entries.insert(instance.clone(), Entry { worker, config, deps }) {
            previous.worker.handle.abort();
        }
        info!(instance = %instance, "scheduler worker started");
    }

    /// Return a clone of `instance`'s collaborators, for callers (the API's
    /// preview handler) that need to run work against the same
    /// collaborators a scheduled cycle would use, outside the worker.
    pub async fn deps(&self, instance: &str) -> Option<CycleDeps> {
        self.entries.lock().await.get(instance).map(|entry| entry.deps.clone())
    }

    /// Stop `instance`'s worker, if one is running.
    pub async fn stop(&self, instance: &str) {
        if let Some(entry) = self.entries.lock().await.remove(instance) {
            drop(entry.worker.commands);
            entry.worker.handle.abort();
        }
    }

    /// Hot-swap `instance`'s config. Takes effect on the worker's next
    /// loop iteration, no restart required.
    ///
    /// # Errors
    ///
    /// Returns `false` if no worker is running for `instance`.
    pub async fn update_config(&self, instance: &str, config: CoreConfig) -> bool {
        let entries = self.entries.lock().await;
        let Some(entry) = entries.get(instance) else {
            return false;
        };
        *entry.config.write().await = config;
        true
    }

    /// Trigger an immediate, out-of-schedule cycle for `instance` and
    /// await its result.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::RuleStoreUnavailable`] or
    /// [`SchedulerError::SnapshotUnavailable`] if the cycle itself fails.
    /// Returns the same variants (wrapping a channel-closed detail) if the
    /// worker is not running or drops the request before responding.
    pub async fn apply_now(&self, instance: &str) -> Result<CycleReport, SchedulerError> {
        let sender = {
            let entries = self.entries.lock().await;
            let Some(entry) = entries.get(instance) else {
                return Err(SchedulerError::SnapshotUnavailable {
                    instance: instance.to_string(),
                    reason: "no worker running for this instance".to_string(),
                });
            };
            entry.worker.commands.clone()
        };
        let (reply, rx) = oneshot::channel();
        sender
            .send(Command::ApplyNow { reply })
            .await
            .map_err(|_| SchedulerError::SnapshotUnavailable {
                instance: instance.to_string(),
                reason: "worker command channel closed".to_string(),
            })?;
        rx.await.map_err(|_| SchedulerError::SnapshotUnavailable {
            instance: instance.to_string(),
            reason: "worker dropped the apply-now request".to_string(),
        })?
    }
}
