//! Hardlink index: a cached, single-pass duplicate-detection structure
//! mapping torrents to physical-identity signatures.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use seedkeeper_client::TorrentClient;
use seedkeeper_core::model::Torrent;
use seedkeeper_core::path::is_path_inside_base;

use crate::error::Result;

/// Default time-to-live for a built index before it is considered stale.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// Classification of a torrent's file links relative to the scanned set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardlinkScope {
    /// No files share an inode with anything else.
    None,
    /// Files are hardlinked, but only to other torrents in this index.
    TorrentsOnly,
    /// At least one file is hardlinked outside the scanned torrent set.
    OutsideClient,
}

/// File identity used to compute a duplicate-group signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl std::fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}

/// A built hardlink index for one torrent-set snapshot.
#[derive(Debug, Clone, Default)]
pub struct HardlinkIndex {
    signature_by_hash: HashMap<String, String>,
    group_by_signature: HashMap<String, Vec<String>>,
    scope_by_hash: HashMap<String, HardlinkScope>,
    digest: String,
}

impl HardlinkIndex {
    /// All torrents sharing a hardlink signature with `hash`, `hash`
    /// itself excluded. Empty if `hash` has no duplicate group.
    #[must_use]
    pub fn copies_of(&self, hash: &str) -> Vec<String> {
        let Some(signature) = self.signature_by_hash.get(hash) else {
            return Vec::new();
        };
        self.group_by_signature
            .get(signature)
            .into_iter()
            .flatten()
            .filter(|peer| peer.as_str() != hash)
            .cloned()
            .collect()
    }

    /// The hardlink scope of `hash`, `None` if the torrent's files were
    /// never successfully inspected (unknown, not "no links").
    #[must_use]
    pub fn scope_of(&self, hash: &str) -> Option<HardlinkScope> {
        self.scope_by_hash.get(hash).copied()
    }

    /// The duplicate-group signature of `hash`, if it belongs to one.
    #[must_use]
    pub fn signature_of(&self, hash: &str) -> Option<&str> {
        self.signature_by_hash.get(hash).map(String::as_str)
    }

    /// Build an index from a torrent set by fetching each torrent's file
    /// list and `lstat`-ing every file once.
    ///
    /// # Errors
    ///
    /// Returns an error if the client call fails outright; individual
    /// file-level failures (inaccessible paths, traversal attempts) are
    /// logged and leave that torrent's scope unknown rather than failing
    /// the whole build.
    pub async fn build(
        client: &dyn TorrentClient,
        instance: &str,
        torrents: &[Torrent],
    ) -> Result<Self> {
        let digest = digest_torrent_set(torrents);
        let hashes: Vec<String> = torrents.iter().map(|t| t.hash.clone()).collect();
        let files_by_hash = client.get_files(instance, &hashes).await?;

        let mut global_nlink: HashMap<FileIdentity, u64> = HashMap::new();
        let mut global_unique_paths: HashMap<FileIdentity, u64> = HashMap::new();
        let mut per_torrent: HashMap<String, TorrentScan> = HashMap::new();

        for torrent in torrents {
            let Some(files) = files_by_hash.get(&torrent.hash) else {
                continue;
            };
            let mut scan = TorrentScan::default();
            for file in files {
                let joined = Path::new(&torrent.save_path).join(&file.name);
                let joined_str = joined.to_string_lossy().to_string();
                if !is_path_inside_base(&torrent.save_path, &joined_str) {
                    warn!(hash = %torrent.hash, path = %joined_str, "rejecting file outside save path during hardlink scan");
                    scan.inspectable = false;
                    continue;
                }
                match stat_identity(&joined) {
                    Ok(Some(identity)) => {
                        let nlink = identity.1;
                        let id = identity.0;
                        let counter = global_unique_paths.entry(id).or_insert(0);
                        *counter += 1;
                        if nlink > 1 {
                            global_nlink.insert(id, nlink);
                            scan.linked_identities.push(id);
                        }
                        scan.any_nlink_gt1 |= nlink > 1;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(hash = %torrent.hash, path = %joined_str, error = %err, "failed to stat file during hardlink scan");
                        scan.inspectable = false;
                    }
                }
            }
            per_torrent.insert(torrent.hash.clone(), scan);
        }

        let mut scope_by_hash = HashMap::new();
        let mut signature_by_hash = HashMap::new();
        let mut group_by_signature: HashMap<String, Vec<String>> = HashMap::new();

        for (hash, scan) in &per_torrent {
            if !scan.inspectable {
                continue;
            }
            let outside_client = scan.linked_identities.iter().any(|id| {
                let nlink = global_nlink.get(id).copied().unwrap_or(0);
                let unique_paths = global_unique_paths.get(id).copied().unwrap_or(0);
                nlink > unique_paths
            });
            let scope = if outside_client {
                HardlinkScope::OutsideClient
            } else if scan.any_nlink_gt1 {
                HardlinkScope::TorrentsOnly
            } else {
                HardlinkScope::None
            };
            scope_by_hash.insert(hash.clone(), scope);

            if scope == HardlinkScope::TorrentsOnly && !scan.linked_identities.is_empty() {
                let mut identities = scan.linked_identities.clone();
                identities.sort_unstable();
                identities.dedup();
                let mut hasher = Sha256::new();
                for identity in &identities {
                    hasher.update(identity.to_string().as_bytes());
                    hasher.update(b"\0");
                }
                let signature = format!("{:x}", hasher.finalize());
                group_by_signature
                    .entry(signature.clone())
                    .or_default()
                    .push(hash.clone());
                signature_by_hash.insert(hash.clone(), signature);
            }
        }

        group_by_signature.retain(|_, members| members.len() >= 2);
        signature_by_hash.retain(|_, signature| group_by_signature.contains_key(signature));

        info!(
            instance,
            torrents = torrents.len(),
            groups = group_by_signature.len(),
            "built hardlink index"
        );

        Ok(Self {
            signature_by_hash,
            group_by_signature,
            scope_by_hash,
            digest,
        })
    }
}

#[derive(Debug, Default)]
struct TorrentScan {
    inspectable: bool,
    any_nlink_gt1: bool,
    linked_identities: Vec<FileIdentity>,
}

impl TorrentScan {
    fn default() -> Self {
        Self {
            inspectable: true,
            any_nlink_gt1: false,
            linked_identities: Vec::new(),
        }
    }
}

#[cfg(unix)]
fn stat_identity(path: &Path) -> std::io::Result<Option<(FileIdentity, u64)>> {
    use std::os::unix::fs::MetadataExt;
    let metadata = std::fs::symlink_metadata(path)?;
    if !metadata.file_type().is_file() {
        return Ok(None);
    }
    Ok(Some((
        FileIdentity {
            dev: metadata.dev(),
            ino: metadata.ino(),
        },
        metadata.nlink(),
    )))
}

#[cfg(not(unix))]
fn stat_identity(_path: &Path) -> std::io::Result<Option<(FileIdentity, u64)>> {
    Ok(None)
}

fn digest_torrent_set(torrents: &[Torrent]) -> String {
    let mut pairs: Vec<(String, String)> = torrents
        .iter()
        .map(|t| (t.hash.clone(), t.save_path.clone()))
        .collect();
    pairs.sort_unstable();
    let mut hasher = Sha256::new();
    for (hash, save_path) in pairs {
        hasher.update(hash.as_bytes());
        hasher.update(b"\0");
        hasher.update(save_path.as_bytes());
        hasher.update(b"\0");
    }
    let digest = hasher.finalize();
    digest.iter().take(8).map(|byte| format!("{byte:02x}")).collect()
}

struct CachedEntry {
    index: Arc<HardlinkIndex>,
    built_at: Instant,
}

/// Per-instance cache of [`HardlinkIndex`] builds, TTL-expired and
/// singleflight-guarded per instance. A lookup for one instance never
/// blocks behind another instance's in-flight build: the cache map itself
/// is an `RwLock` (readers share the cache-hit fast path; only an actual
/// insert takes the write side), and a separate per-instance lock
/// serializes concurrent builders racing on the same instance.
#[derive(Default)]
pub struct HardlinkIndexCache {
    entries: RwLock<HashMap<String, CachedEntry>>,
    build_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    ttl: Duration,
}

impl HardlinkIndexCache {
    /// Construct a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            build_locks: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn fresh_entry(entries: &HashMap<String, CachedEntry>, instance: &str, digest: &str, ttl: Duration) -> Option<Arc<HardlinkIndex>> {
        let entry = entries.get(instance)?;
        let fresh = entry.index.digest == digest && entry.built_at.elapsed() < ttl;
        fresh.then(|| Arc::clone(&entry.index))
    }

    async fn build_lock(&self, instance: &str) -> Arc<Mutex<()>> {
        let mut locks = self.build_locks.lock().await;
        Arc::clone(locks.entry(instance.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Fetch a valid cached index for `instance`/`torrents`, building (and
    /// caching) a fresh one if absent, stale by digest, or expired by TTL.
    ///
    /// Only the build for `instance` is serialized; a concurrent lookup or
    /// build for a different instance proceeds without waiting on it.
    ///
    /// # Errors
    ///
    /// Propagates build errors. On error, no entry is cached, so the next
    /// call retries.
    pub async fn get_or_build(
        &self,
        client: &dyn TorrentClient,
        instance: &str,
        torrents: &[Torrent],
    ) -> Result<Arc<HardlinkIndex>> {
        let digest = digest_torrent_set(torrents);

        if let Some(index) = Self::fresh_entry(&*self.entries.read().await, instance, &digest, self.ttl) {
            return Ok(index);
        }

        let build_lock = self.build_lock(instance).await;
        let _build_guard = build_lock.lock().await;

        // Another builder may have finished while we waited for the instance lock.
        if let Some(index) = Self::fresh_entry(&*self.entries.read().await, instance, &digest, self.ttl) {
            return Ok(index);
        }

        let built = Arc::new(HardlinkIndex::build(client, instance, torrents).await?);
        self.entries.write().await.insert(
            instance.to_string(),
            CachedEntry {
                index: Arc::clone(&built),
                built_at: Instant::now(),
            },
        );
        Ok(built)
    }

    /// Drop any cached index for `instance`, forcing the next lookup to
    /// rebuild.
    pub async fn invalidate(&self, instance: &str) {
        self.entries.write().await.remove(instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use seedkeeper_client::{ClientError, TorrentFile};
    use seedkeeper_core::model::TorrentStateKind;
    use std::collections::HashMap as StdHashMap;
    use tempfile::tempdir;

    fn torrent(hash: &str, save_path: &str) -> Torrent {
        Torrent {
            hash: hash.into(),
            name: hash.into(),
            category: String::new(),
            tags: Vec::new(),
            tracker: String::new(),
            state: TorrentStateKind::Seeding,
            size: 0,
            total_size: 0,
            downloaded: 0,
            uploaded: 0,
            amount_left: 0,
            ratio: 0.0,
            progress: 1.0,
            availability: 0.0,
            dl_speed: 0,
            up_speed: 0,
            seeds: 0,
            leechs: 0,
            complete: 0,
            incomplete: 0,
            trackers_count: 0,
            added_on: 0,
            completion_on: 0,
            last_activity: 0,
            seeding_time: 0,
            time_active: 0,
            save_path: save_path.into(),
            content_path: format!("{save_path}/{hash}"),
            comment: String::new(),
            private: false,
        }
    }

    struct FakeClient {
        files: StdHashMap<String, Vec<TorrentFile>>,
    }

    #[async_trait]
    impl TorrentClient for FakeClient {
        async fn list_torrents(
            &self,
            _instance: &str,
        ) -> seedkeeper_client::Result<Vec<Torrent>> {
            Err(ClientError::Unsupported {
                operation: "list_torrents",
            })
        }

        async fn get_files(
            &self,
            _instance: &str,
            hashes: &[String],
        ) -> seedkeeper_client::Result<StdHashMap<String, Vec<TorrentFile>>> {
            Ok(hashes
                .iter()
                .filter_map(|hash| self.files.get(hash).map(|f| (hash.clone(), f.clone())))
                .collect())
        }

        async fn get_free_space(&self, _instance: &str) -> seedkeeper_client::Result<i64> {
            Err(ClientError::Unsupported {
                operation: "get_free_space",
            })
        }
    }

    #[tokio::test]
    async fn hardlinked_files_group_torrents_by_signature() {
        let dir = tempdir().expect("tempdir");
        let save_path = dir.path().to_string_lossy().to_string();

        let shared_a = dir.path().join("shared_a.mkv");
        std::fs::write(&shared_a, b"data").expect("write");
        let shared_b = dir.path().join("shared_b.mkv");
        std::fs::hard_link(&shared_a, &shared_b).expect("hardlink");

        let mut files = StdHashMap::new();
        files.insert(
            "t1".to_string(),
            vec![TorrentFile {
                name: "shared_a.mkv".into(),
                size: 4,
            }],
        );
        files.insert(
            "t2".to_string(),
            vec![TorrentFile {
                name: "shared_b.mkv".into(),
                size: 4,
            }],
        );
        let client = FakeClient { files };
        let torrents = vec![torrent("t1", &save_path), torrent("t2", &save_path)];

        let index = HardlinkIndex::build(&client, "instance-1", &torrents)
            .await
            .expect("build");

        assert_eq!(index.scope_of("t1"), Some(HardlinkScope::TorrentsOnly));
        assert_eq!(index.scope_of("t2"), Some(HardlinkScope::TorrentsOnly));
        assert_eq!(index.copies_of("t1"), vec!["t2".to_string()]);
        assert_eq!(
            index.signature_of("t1"),
            index.signature_of("t2")
        );
    }

    #[tokio::test]
    async fn lone_torrent_with_no_links_has_none_scope() {
        let dir = tempdir().expect("tempdir");
        let save_path = dir.path().to_string_lossy().to_string();
        let file_path = dir.path().join("solo.mkv");
        std::fs::write(&file_path, b"data").expect("write");

        let mut files = StdHashMap::new();
        files.insert(
            "t1".to_string(),
            vec![TorrentFile {
                name: "solo.mkv".into(),
                size: 4,
            }],
        );
        let client = FakeClient { files };
        let torrents = vec![torrent("t1", &save_path)];

        let index = HardlinkIndex::build(&client, "instance-1", &torrents)
            .await
            .expect("build");
        assert_eq!(index.scope_of("t1"), Some(HardlinkScope::None));
        assert!(index.copies_of("t1").is_empty());
        assert!(index.signature_of("t1").is_none());
    }

    #[tokio::test]
    async fn cache_reuses_build_while_digest_and_ttl_hold() {
        let dir = tempdir().expect("tempdir");
        let save_path = dir.path().to_string_lossy().to_string();
        let client = FakeClient {
            files: StdHashMap::new(),
        };
        let torrents = vec![torrent("t1", &save_path)];
        let cache = HardlinkIndexCache::new(Duration::from_secs(60));

        let first = cache
            .get_or_build(&client, "instance-1", &torrents)
            .await
            .expect("build");
        let second = cache
            .get_or_build(&client, "instance-1", &torrents)
            .await
            .expect("build");
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate("instance-1").await;
        let third = cache
            .get_or_build(&client, "instance-1", &torrents)
            .await
            .expect("build");
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
