//! Per-instance background worker: a periodic scan loop that races its
//! own sleep against an out-of-band command channel, so an apply-now
//! request never waits for the next tick and a config update takes
//! effect on the very next iteration without a restart.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use seedkeeper_config::CoreConfig;

use crate::cycle::{run_cycle, CycleDeps, CycleReport};
use crate::error::SchedulerError;

/// Out-of-band request sent to a running instance worker.
pub enum Command {
    /// Run a cycle immediately, outside the scan schedule, and report its
    /// result back to the caller.
    ApplyNow {
        /// Channel the cycle's result is sent back on.
        reply: oneshot::Sender<Result<CycleReport, SchedulerError>>,
    },
}

/// Handle to a running instance worker: the task handle plus the channel
/// used to send it commands. Dropping the sender lets the worker's
/// `select!` loop notice the channel closed and exit on its next wakeup.
pub struct InstanceWorker {
    /// Background task handle.
    pub handle: JoinHandle<()>,
    /// Command channel for out-of-band requests.
    pub commands: mpsc::Sender<Command>,
}

/// Spawn a background worker that runs one cycle for `instance` every
/// `config`'s scan interval, re-read fresh on each iteration so a config
/// update hot-swaps without restarting the worker.
#[must_use]
pub fn spawn_instance_worker(
    instance: String,
    deps: CycleDeps,
    config: Arc<RwLock<CoreConfig>>,
) -> InstanceWorker {
    let (commands, mut rx) = mpsc::channel(8);
    let handle = tokio::spawn(async move {
        loop {
            let interval = config.read().await.scan_interval();
            tokio::select! {
                () = tokio::time::sleep(interval) => {
                    if let Err(err) = run_cycle(&deps, &instance).await {
                        warn!(instance = %instance, error = %err, "scheduled cycle failed");
                    }
                }
                command = rx.recv() => {
                    match command {
                        Some(Command::ApplyNow { reply }) => {
                            let result = run_cycle(&deps, &instance).await;
                            if reply.send(result).is_err() {
                                warn!(instance = %instance, "apply-now caller dropped before cycle completed");
                            }
                        }
                        None => {
                            info!(instance = %instance, "command channel closed, stopping worker");
                            break;
                        }
                    }
                }
            }
        }
    });
    InstanceWorker { handle, commands }
}
