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

//! Applies a cycle's accumulated [`seedkeeper_core::TorrentDesiredState`]
//! to a torrent client, one action kind at a time.
//!
//! # Modules
//! - [`applier`]: the [`Applier`] itself.
//! - [`batch`]: splits hash sets into RPC-sized chunks.
//! - [`debounce`]: per-hash, per-instance cooldown.
//! - [`external`]: the external-program execution collaborator boundary.
//! - [`error`]: crate error types.

pub mod applier;
pub mod batch;
pub mod debounce;
pub mod error;
pub mod external;

pub use applier::{ApplyConfig, Applier};
pub use batch::batches;
pub use debounce::Debouncer;
pub use error::ApplyError;
pub use external::{ExternalProgramRunner, PendingExternalProgram};
