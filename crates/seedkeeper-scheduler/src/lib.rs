#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Per-instance periodic scanning, hardlink/quality index derivation,
//! cross-seed and hardlink group propagation, and the apply-now command
//! channel.
//!
//! # Modules
//! - [`cycle`]: one scan/apply-now cycle end to end.
//! - [`groups`]: group-id discovery and desired-state propagation across
//!   cross-seed/hardlink peers.
//! - [`instance`]: the per-instance background worker loop.
//! - [`registry`]: the multi-instance worker manager.
//! - [`error`]: crate error type.

pub mod cycle;
pub mod error;
pub mod groups;
pub mod instance;
pub mod registry;

pub use cycle::{build_preview_context, run_cycle, CycleDeps, CycleReport, PreviewSnapshot};
pub use error::SchedulerError;
pub use groups::{build_group_indices, expand_groups};
pub use instance::{spawn_instance_worker, Command, InstanceWorker};
pub use registry::SchedulerRegistry;
