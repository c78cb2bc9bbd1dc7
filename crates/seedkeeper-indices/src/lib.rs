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

//! Derived, per-cycle indices built over a torrent set: cross-seed
//! relationships, physical hardlink identity, arbitrary-key grouping,
//! release-quality ranking, and free-space resolution.
//!
//! # Modules
//! - [`cross_seed`]: content-path-keyed cross-seed index.
//! - [`hardlink`]: cached, singleflight-guarded physical hardlink index.
//! - [`grouping`]: built-in and custom group-id indices.
//! - [`quality`]: per-profile best/inferior release ranking.
//! - [`free_space`]: resolves a rule's configured free-space source.
//! - [`error`]: crate error type.

pub mod cross_seed;
pub mod error;
pub mod free_space;
pub mod grouping;
pub mod hardlink;
pub mod quality;

pub use cross_seed::CrossSeedIndex;
pub use error::{IndicesError, Result};
pub use free_space::resolve as resolve_free_space;
pub use grouping::{
    build_group_index, GroupIndex, GROUP_CONTENT_PATH, GROUP_CONTENT_SAVE_PATH,
    GROUP_HARDLINK_SIGNATURE, GROUP_RELEASE_ITEM, GROUP_TRACKER_RELEASE_ITEM,
};
pub use hardlink::{HardlinkIndex, HardlinkIndexCache, HardlinkScope, DEFAULT_TTL};
pub use quality::{compute as compute_quality, GroupField, QualityField, QualityProfile, QualitySets, QualityTier};
