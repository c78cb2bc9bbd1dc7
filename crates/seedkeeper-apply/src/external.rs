//! The external-program execution collaborator boundary.
//!
//! This workspace does not itself spawn external processes: some other
//! service drains the queue of pending executions. If no such service is
//! wired up, every pending execution fails immediately with a "not
//! configured" activity.

use async_trait::async_trait;

/// A single enqueued external-program invocation, produced by the applier
/// and drained by an out-of-band executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExternalProgram {
    /// Instance the torrent belongs to.
    pub instance_id: String,
    /// Torrent hash the program should run against.
    pub hash: String,
    /// Configured program identifier to invoke.
    pub program_id: String,
}

/// Accepts a pending external-program execution for out-of-band processing.
#[async_trait]
pub trait ExternalProgramRunner: Send + Sync {
    /// Enqueue `program_id` to run against `hash` on `instance`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable detail if the runner rejects the request.
    async fn enqueue(&self, instance: &str, program_id: &str, hash: &str) -> Result<(), String>;
}
