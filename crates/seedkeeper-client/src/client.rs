//! Outbound RPC boundary to the torrent client.
//!
//! Every mutating method defaults to returning
//! [`ClientError::Unsupported`] so a partial backend (or a test double)
//! only needs to implement the handful of calls it actually exercises,
//! mirroring the `TorrentEngine`/`TorrentWorkflow` capability split this
//! design is adapted from.

use std::collections::HashMap;

use async_trait::async_trait;
use seedkeeper_core::model::Torrent;

use crate::error::{ClientError, Result};

/// One file entry as reported by the client's per-torrent file listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    /// Path relative to the torrent's save directory.
    pub name: String,
    /// File size in bytes.
    pub size: u64,
}

/// Delete semantics understood by the client's delete RPC. The richer
/// cross-seed/hardlink propagation modes in
/// [`seedkeeper_core::rule::DeleteMode`] are resolved to one of these two
/// before the call is made; the client itself only ever deletes exactly
/// the hashes it's given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteApiMode {
    /// Remove the torrent from the client, keep files on disk.
    KeepFiles,
    /// Remove the torrent and delete its files.
    WithFiles,
}

/// RPC surface the automation core consumes from a torrent client backend.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// List all torrents currently known to `instance`.
    async fn list_torrents(&self, instance: &str) -> Result<Vec<Torrent>>;

    /// Fetch per-torrent file listings for a batch of hashes.
    async fn get_files(
        &self,
        instance: &str,
        hashes: &[String],
    ) -> Result<HashMap<String, Vec<TorrentFile>>>;

    /// Free space, in bytes, available at the instance's default save path.
    async fn get_free_space(&self, instance: &str) -> Result<i64>;

    /// Set the upload cap (KiB/s, `0` = unlimited) on a batch of torrents.
    async fn set_upload_limit(&self, instance: &str, hashes: &[String], kib: u64) -> Result<()> {
        let _ = (instance, hashes, kib);
        Err(ClientError::Unsupported {
            operation: "set_upload_limit",
        })
    }

    /// Set the download cap (KiB/s, `0` = unlimited) on a batch of torrents.
    async fn set_download_limit(&self, instance: &str, hashes: &[String], kib: u64) -> Result<()> {
        let _ = (instance, hashes, kib);
        Err(ClientError::Unsupported {
            operation: "set_download_limit",
        })
    }

    /// Set the ratio limit on a batch of torrents.
    async fn set_ratio_limit(&self, instance: &str, hashes: &[String], ratio: f64) -> Result<()> {
        let _ = (instance, hashes, ratio);
        Err(ClientError::Unsupported {
            operation: "set_ratio_limit",
        })
    }

    /// Set the seeding-time limit (minutes) on a batch of torrents.
    async fn set_seeding_time_limit(
        &self,
        instance: &str,
        hashes: &[String],
        minutes: i64,
    ) -> Result<()> {
        let _ = (instance, hashes, minutes);
        Err(ClientError::Unsupported {
            operation: "set_seeding_time_limit",
        })
    }

    /// Pause a batch of torrents.
    async fn pause(&self, instance: &str, hashes: &[String]) -> Result<()> {
        let _ = (instance, hashes);
        Err(ClientError::Unsupported { operation: "pause" })
    }

    /// Resume a batch of torrents.
    async fn resume(&self, instance: &str, hashes: &[String]) -> Result<()> {
        let _ = (instance, hashes);
        Err(ClientError::Unsupported {
            operation: "resume",
        })
    }

    /// Force a hash recheck on a batch of torrents.
    async fn recheck(&self, instance: &str, hashes: &[String]) -> Result<()> {
        let _ = (instance, hashes);
        Err(ClientError::Unsupported {
            operation: "recheck",
        })
    }

    /// Force a tracker reannounce on a batch of torrents.
    async fn reannounce(&self, instance: &str, hashes: &[String]) -> Result<()> {
        let _ = (instance, hashes);
        Err(ClientError::Unsupported {
            operation: "reannounce",
        })
    }

    /// Set the category on a batch of torrents.
    async fn set_category(&self, instance: &str, hashes: &[String], category: &str) -> Result<()> {
        let _ = (instance, hashes, category);
        Err(ClientError::Unsupported {
            operation: "set_category",
        })
    }

    /// Add tags to a batch of torrents.
    async fn add_tags(&self, instance: &str, hashes: &[String], tags: &[String]) -> Result<()> {
        let _ = (instance, hashes, tags);
        Err(ClientError::Unsupported {
            operation: "add_tags",
        })
    }

    /// Remove tags from a batch of torrents.
    async fn remove_tags(&self, instance: &str, hashes: &[String], tags: &[String]) -> Result<()> {
        let _ = (instance, hashes, tags);
        Err(ClientError::Unsupported {
            operation: "remove_tags",
        })
    }

    /// Move a batch of torrents' content to `path`.
    async fn move_torrents(&self, instance: &str, hashes: &[String], path: &str) -> Result<()> {
        let _ = (instance, hashes, path);
        Err(ClientError::Unsupported { operation: "move" })
    }

    /// Delete a batch of torrents per `mode`.
    async fn delete(&self, instance: &str, hashes: &[String], mode: DeleteApiMode) -> Result<()> {
        let _ = (instance, hashes, mode);
        Err(ClientError::Unsupported {
            operation: "delete",
        })
    }
}
