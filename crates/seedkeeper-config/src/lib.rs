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

//! Core configuration surface: scan cadence, debounce window, hardlink
//! index TTL, RPC batch size, and activity retention.
//!
//! Loading configuration from a backing store or file is the bootstrap's
//! job (`seedkeeper-app`); this crate only defines the typed shape, its
//! defaults, and its validation rules.

pub mod defaults;
pub mod model;
pub mod validate;

pub use defaults::{
    CONDITION_DEPTH_LIMIT, DEFAULT_ACTIVITY_RETENTION_HOURS, DEFAULT_ACTIVITY_RETENTION_MAX_RUNS,
    DEFAULT_BATCH_SIZE, DEFAULT_DEBOUNCE_WINDOW_SECS, DEFAULT_HARDLINK_INDEX_TTL_SECS,
    DEFAULT_SCAN_INTERVAL_SECS, MIN_SCAN_INTERVAL_SECS,
};
pub use model::CoreConfig;
pub use validate::{ConfigError, validate};
