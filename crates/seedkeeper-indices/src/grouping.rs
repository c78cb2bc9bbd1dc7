//! Grouping engine: per-rule, per-group-definition indices over arbitrary
//! keying (content, release, tracker, hardlink signature).

use std::collections::{HashMap, HashSet};

use seedkeeper_client::ReleaseParser;
use seedkeeper_core::model::Torrent;
use seedkeeper_core::path::{is_content_path_ambiguous, normalize};

use crate::hardlink::HardlinkIndex;

/// Built-in group id for "same content directory".
pub const GROUP_CONTENT_PATH: &str = "content_path";
/// Built-in group id for "same content directory and save directory".
pub const GROUP_CONTENT_SAVE_PATH: &str = "content_save_path";
/// Built-in group id for "same parsed release item".
pub const GROUP_RELEASE_ITEM: &str = "release_item";
/// Built-in group id for "same tracker and parsed release item".
pub const GROUP_TRACKER_RELEASE_ITEM: &str = "tracker_release_item";
/// Built-in group id for "same hardlink signature".
pub const GROUP_HARDLINK_SIGNATURE: &str = "hardlink_signature";

/// A built grouping over one key definition.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    key_by_hash: HashMap<String, String>,
    hashes_by_key: HashMap<String, Vec<String>>,
    size_by_hash: HashMap<String, u32>,
    ambiguous_keys: HashSet<String>,
}

impl GroupIndex {
    fn insert(&mut self, hash: &str, key: String, ambiguous: bool) {
        self.key_by_hash.insert(hash.to_string(), key.clone());
        self.hashes_by_key
            .entry(key.clone())
            .or_default()
            .push(hash.to_string());
        if ambiguous {
            self.ambiguous_keys.insert(key);
        }
    }

    fn finalize(mut self) -> Self {
        for hashes in self.hashes_by_key.values_mut() {
            hashes.sort_unstable();
        }
        let sizes: HashMap<String, u32> = self
            .hashes_by_key
            .iter()
            .map(|(key, hashes)| (key.clone(), u32::try_from(hashes.len()).unwrap_or(u32::MAX)))
            .collect();
        self.size_by_hash = self
            .key_by_hash
            .iter()
            .filter_map(|(hash, key)| sizes.get(key).map(|size| (hash.clone(), *size)))
            .collect();
        self
    }

    /// Whether `hash` belongs to a group of size `>= 2`.
    #[must_use]
    pub fn is_grouped(&self, hash: &str) -> bool {
        self.size_of(hash) >= 2
    }

    /// Size of the group `hash` belongs to, `0` if it isn't in this index.
    #[must_use]
    pub fn size_of(&self, hash: &str) -> u32 {
        self.size_by_hash.get(hash).copied().unwrap_or(0)
    }

    /// All other members of `hash`'s group, `hash` itself excluded.
    #[must_use]
    pub fn peers_of(&self, hash: &str) -> Vec<String> {
        let Some(key) = self.key_by_hash.get(hash) else {
            return Vec::new();
        };
        self.hashes_by_key
            .get(key)
            .into_iter()
            .flatten()
            .filter(|peer| peer.as_str() != hash)
            .cloned()
            .collect()
    }

    /// Whether `hash`'s group key is ambiguous (its content path equals
    /// its save path, so the group key does not distinguish this
    /// torrent's own content from a shared directory).
    #[must_use]
    pub fn is_ambiguous(&self, hash: &str) -> bool {
        self.key_by_hash
            .get(hash)
            .is_some_and(|key| self.ambiguous_keys.contains(key))
    }
}

fn release_item_key(parser: &dyn ReleaseParser, torrent: &Torrent) -> Option<String> {
    let release = parser.parse(&torrent.name)?;
    Some(format!(
        "{}|{:?}|{:?}|{:?}",
        release.title.to_ascii_lowercase(),
        release.year,
        release.series,
        release.episode
    ))
}

fn tracker_host(tracker: &str) -> String {
    tracker
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split(['/', ':'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Build the index for one built-in or custom group id.
///
/// Unknown custom group ids (not one of the `GROUP_*` constants) build an
/// empty index — a leaf referencing them simply never matches, per the
/// evaluator's "unknown field/group never errors" contract.
#[must_use]
pub fn build_group_index(
    group_id: &str,
    torrents: &[Torrent],
    release_parser: Option<&dyn ReleaseParser>,
    hardlink_index: Option<&HardlinkIndex>,
) -> GroupIndex {
    let mut index = GroupIndex::default();
    match group_id {
        GROUP_CONTENT_PATH => {
            for torrent in torrents {
                if torrent.content_path.is_empty() {
                    continue;
                }
                let key = normalize(&torrent.content_path);
                let ambiguous = is_content_path_ambiguous(torrent);
                index.insert(&torrent.hash, key, ambiguous);
            }
        }
        GROUP_CONTENT_SAVE_PATH => {
            for torrent in torrents {
                if torrent.content_path.is_empty() {
                    continue;
                }
                let key = format!(
                    "{}|{}",
                    normalize(&torrent.content_path),
                    normalize(&torrent.save_path)
                );
                let ambiguous = is_content_path_ambiguous(torrent);
                index.insert(&torrent.hash, key, ambiguous);
            }
        }
        GROUP_RELEASE_ITEM => {
            if let Some(parser) = release_parser {
                for torrent in torrents {
                    if let Some(key) = release_item_key(parser, torrent) {
                        index.insert(&torrent.hash, key, false);
                    }
                }
            }
        }
        GROUP_TRACKER_RELEASE_ITEM => {
            if let Some(parser) = release_parser {
                for torrent in torrents {
                    if let Some(release_key) = release_item_key(parser, torrent) {
                        let key = format!("{}|{}", tracker_host(&torrent.tracker), release_key);
                        index.insert(&torrent.hash, key, false);
                    }
                }
            }
        }
        GROUP_HARDLINK_SIGNATURE => {
            if let Some(hardlink_index) = hardlink_index {
                for torrent in torrents {
                    if let Some(signature) = hardlink_index.signature_of(&torrent.hash) {
                        index.insert(&torrent.hash, signature.to_string(), false);
                    }
                }
            }
        }
        _ => {}
    }
    index.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedkeeper_core::model::TorrentStateKind;

    fn torrent(hash: &str, content_path: &str, save_path: &str) -> Torrent {
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
            content_path: content_path.into(),
            comment: String::new(),
            private: false,
        }
    }

    #[test]
    fn content_path_groups_share_directory() {
        let torrents = vec![
            torrent("a", "/data/movie", "/data"),
            torrent("b", "/data/movie", "/data"),
            torrent("c", "/data/other", "/data"),
        ];
        let index = build_group_index(GROUP_CONTENT_PATH, &torrents, None, None);
        assert!(index.is_grouped("a"));
        assert_eq!(index.size_of("a"), 2);
        assert!(!index.is_grouped("c"));
    }

    #[test]
    fn ambiguous_flag_follows_content_equals_save_path() {
        let torrents = vec![torrent("a", "/data", "/data")];
        let index = build_group_index(GROUP_CONTENT_PATH, &torrents, None, None);
        assert!(index.is_ambiguous("a"));
    }

    #[test]
    fn unknown_group_id_yields_empty_index() {
        let torrents = vec![torrent("a", "/data/movie", "/data")];
        let index = build_group_index("not_a_real_group", &torrents, None, None);
        assert!(!index.is_grouped("a"));
        assert_eq!(index.size_of("a"), 0);
    }
}
