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

//! The inbound consumer HTTP surface: apply-now, rule preview,
//! activity-run lookup and hardlink-index invalidation for a running
//! instance, plus ambient `/health` and `/metrics`.
//!
//! # Modules
//! - [`state`]: shared application state (`ApiState`).
//! - [`router`]: route table and server host (`ApiServer`).
//! - [`error`]: the RFC9457 problem-details error wrapper.
//! - [`dto`]: JSON request/response types, kept separate from domain types.
//! - [`handlers`]: one handler per route.

mod dto;
mod error;
mod handlers;
pub mod router;
pub mod state;

pub use router::ApiServer;
pub use state::ApiState;
