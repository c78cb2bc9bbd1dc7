//! Error type shared by the indices this crate builds.

use thiserror::Error;

/// Errors produced while building or querying an index.
#[derive(Debug, Error)]
pub enum IndicesError {
    /// The underlying torrent client call failed.
    #[error("torrent client call failed while building index: {0}")]
    Client(#[from] seedkeeper_client::ClientError),

    /// A filesystem-backed free-space source is not supported on this
    /// platform.
    #[error("path-based free space source is not supported on this platform")]
    UnsupportedOnPlatform,

    /// The filesystem query for free space failed.
    #[error("failed to query free space at '{path}': {source}")]
    FreeSpaceQuery {
        /// Path that was queried.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The hardlink build was cancelled before it could complete; the
    /// caller should not cache whatever partial result exists.
    #[error("hardlink index build was cancelled")]
    BuildCancelled,
}

/// Convenience alias for fallible index operations.
pub type Result<T> = std::result::Result<T, IndicesError>;
