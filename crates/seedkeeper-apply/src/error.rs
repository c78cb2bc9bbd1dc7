//! Crate error type.

use thiserror::Error;

/// Errors surfaced by the applier itself (not by individual action RPCs,
/// which degrade to a `failed` [`seedkeeper_core::ActivityOutcome`]
/// rather than aborting the cycle).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// A move or external-program action referenced a destination that
    /// escapes the torrent's save directory.
    #[error("unsafe destination for hash '{hash}': {detail}")]
    UnsafeDestination {
        /// Hash of the torrent the unsafe action targeted.
        hash: String,
        /// Human-readable detail.
        detail: String,
    },
}
