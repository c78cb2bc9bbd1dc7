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

//! The condition evaluator and rule processor: turns a torrent snapshot,
//! a rule set, and a cycle's derived indices into a desired-state record
//! per torrent.
//!
//! # Modules
//! - [`context`]: per-cycle shared state (`CycleContext`, outcome counters).
//! - [`domain`]: tracker URL to bare-domain extraction.
//! - [`selection`]: which rules apply to which torrents, and in what order.
//! - [`evaluator`]: the recursive condition-tree evaluator.
//! - [`processor`]: folds matching rules into `TorrentDesiredState`.
//! - [`preview`]: dry-run rule matching against a torrent snapshot.

pub mod context;
mod domain;
pub mod evaluator;
pub mod preview;
pub mod processor;
pub mod selection;

pub use context::{ActionOutcome, CycleContext, RuleStats};
pub use evaluator::{evaluate, references_is_unregistered, resolve_group_id};
pub use preview::{preview_rule, PreviewExample, PreviewMode, PreviewResult};
pub use processor::process_cycle;
pub use selection::{rule_matches_torrent, sort_rules, sort_torrents};
