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

//! Trait boundaries for the two external collaborators the automation
//! core consumes: the torrent client's RPC surface and a release-name
//! parser. Neither is implemented here — only the interface and its error
//! type.

pub mod client;
pub mod error;
pub mod release;

pub use client::{DeleteApiMode, TorrentClient, TorrentFile};
pub use error::{ClientError, Result};
pub use release::{ParsedRelease, ReleaseParser};
