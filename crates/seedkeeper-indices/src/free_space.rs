//! Resolves a rule's configured [`FreeSpaceSource`] into an observed
//! free-space figure at the start of a cycle.

use seedkeeper_client::TorrentClient;
use seedkeeper_core::rule::FreeSpaceSource;

use crate::error::{IndicesError, Result};

/// Resolve `source` to a free-space figure in bytes.
///
/// # Errors
///
/// Returns [`IndicesError::UnsupportedOnPlatform`] for a
/// [`FreeSpaceSource::Path`] source on a non-Unix build, and
/// [`IndicesError::FreeSpaceQuery`] if the filesystem query itself fails.
pub async fn resolve(
    source: &FreeSpaceSource,
    client: &dyn TorrentClient,
    instance: &str,
) -> Result<i64> {
    match source {
        FreeSpaceSource::QBittorrent => Ok(client.get_free_space(instance).await?),
        FreeSpaceSource::Path(path) => query_path(path),
    }
}

#[cfg(unix)]
fn query_path(path: &str) -> Result<i64> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|errno| IndicesError::FreeSpaceQuery {
        path: path.to_string(),
        source: std::io::Error::from_raw_os_error(errno as i32),
    })?;
    Ok((stat.blocks_available() as u64).saturating_mul(stat.fragment_size()) as i64)
}

#[cfg(not(unix))]
fn query_path(_path: &str) -> Result<i64> {
    Err(IndicesError::UnsupportedOnPlatform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use seedkeeper_client::ClientError;

    struct FakeClient {
        free_space: i64,
    }

    #[async_trait]
    impl TorrentClient for FakeClient {
        async fn list_torrents(
            &self,
            _instance: &str,
        ) -> seedkeeper_client::Result<Vec<seedkeeper_core::model::Torrent>> {
            Err(ClientError::Unsupported {
                operation: "list_torrents",
            })
        }

        async fn get_files(
            &self,
            _instance: &str,
            _hashes: &[String],
        ) -> seedkeeper_client::Result<
            std::collections::HashMap<String, Vec<seedkeeper_client::TorrentFile>>,
        > {
            Err(ClientError::Unsupported {
                operation: "get_files",
            })
        }

        async fn get_free_space(&self, _instance: &str) -> seedkeeper_client::Result<i64> {
            Ok(self.free_space)
        }
    }

    #[tokio::test]
    async fn qbittorrent_source_delegates_to_client() {
        let client = FakeClient {
            free_space: 42_000,
        };
        let value = resolve(&FreeSpaceSource::QBittorrent, &client, "instance-1")
            .await
            .expect("resolve");
        assert_eq!(value, 42_000);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn path_source_queries_real_filesystem_on_unix() {
        let client = FakeClient { free_space: 0 };
        let value = resolve(
            &FreeSpaceSource::Path("/tmp".to_string()),
            &client,
            "instance-1",
        )
        .await;
        assert!(value.is_ok());
    }
}
