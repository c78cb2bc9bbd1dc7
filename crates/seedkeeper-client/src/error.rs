//! Errors produced by the torrent-client and release-parser trait boundaries.

use thiserror::Error;

/// Errors a [`crate::TorrentClient`] or [`crate::ReleaseParser`] implementation
/// may return.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend does not implement this capability.
    #[error("operation '{operation}' is not supported by this client")]
    Unsupported {
        /// Name of the unsupported operation.
        operation: &'static str,
    },

    /// The backend rejected or failed the request.
    #[error("torrent client request failed: {context}")]
    Request {
        /// Human-readable description of what was being attempted.
        context: String,
        /// Underlying cause.
        #[source]
        source: anyhow::Error,
    },
}

impl ClientError {
    /// Build a [`Self::Request`] from any error implementing
    /// [`std::error::Error`].
    pub fn request(
        context: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Request {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Convenience alias for fallible client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
