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

//! Domain model for the rule-automation core: torrents, rules, the
//! recursive condition tree, the per-cycle evaluation context and the
//! desired-state record the rule processor builds up.
//!
//! # Modules
//! - [`model`]: observed torrent fields.
//! - [`matcher`]: tracker/domain pattern matching.
//! - [`path`]: path normalization and cross-seed keying.
//! - [`condition`]: the recursive `RuleCondition` tree and its fields/operators.
//! - [`rule`]: `Rule`, `ActionConditions` and the per-action sub-records.
//! - [`context`]: `FreeSpaceProjection` and `EvalClock`, the index-independent
//!   slice of per-cycle shared evaluation state.
//! - [`desired_state`]: `TorrentDesiredState`, the folded per-torrent outcome.
//! - [`activity`]: `AutomationActivity`, the persisted record of an applied action.
//! - [`error`]: crate error type.

pub mod activity;
pub mod condition;
pub mod context;
pub mod desired_state;
pub mod error;
pub mod matcher;
pub mod model;
pub mod path;
pub mod rule;

pub use activity::{ActionKind, ActivityOutcome, AutomationActivity};
pub use condition::{ConditionField, ConditionOperator, RuleCondition};
pub use context::{EvalClock, FreeSpaceProjection};
pub use desired_state::TorrentDesiredState;
pub use error::CoreError;
pub use model::{Torrent, TorrentStateKind};
pub use rule::{ActionConditions, Rule};
