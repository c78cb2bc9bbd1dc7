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

//! Storage boundaries: the external `RuleStore` collaborator and the
//! in-memory, retention-bounded activity run store.
//!
//! # Modules
//! - [`rule_store`]: the `RuleStore` trait, an external collaborator this
//!   workspace depends on but does not implement.
//! - [`quality_store`]: the `QualityProfileStore` trait, the analogous
//!   collaborator boundary for quality-ranking profile definitions.
//! - [`activity_store`]: `ActivityRunStore`, owned in-memory state.
//! - [`error`]: crate error types.

pub mod activity_store;
pub mod error;
pub mod quality_store;
pub mod rule_store;

pub use activity_store::{ActivityRunPage, ActivityRunStore, RetentionPolicy};
pub use error::RuleStoreError;
pub use quality_store::QualityProfileStore;
pub use rule_store::RuleStore;
