//! Cross-seed index: torrents that point at identical on-disk content.

use std::collections::HashMap;

use seedkeeper_core::model::Torrent;
use seedkeeper_core::path::cross_seed_key;

/// Maps `(normalized content path, normalized save path)` to the set of
/// torrent hashes sharing that content.
#[derive(Debug, Clone, Default)]
pub struct CrossSeedIndex {
    by_key: HashMap<(String, String), Vec<String>>,
    key_by_hash: HashMap<String, (String, String)>,
}

impl CrossSeedIndex {
    /// Build an index over `torrents`. Torrents with an empty content path
    /// (no stable key) are excluded.
    #[must_use]
    pub fn build(torrents: &[Torrent]) -> Self {
        let mut by_key: HashMap<(String, String), Vec<String>> = HashMap::new();
        let mut key_by_hash = HashMap::new();
        for torrent in torrents {
            if let Some(key) = cross_seed_key(torrent) {
                by_key.entry(key.clone()).or_default().push(torrent.hash.clone());
                key_by_hash.insert(torrent.hash.clone(), key);
            }
        }
        Self { by_key, key_by_hash }
    }

    /// All torrents sharing content with `hash`, `hash` itself excluded.
    /// Empty if `hash` has no stable key or no peers.
    #[must_use]
    pub fn peers_of(&self, hash: &str) -> Vec<String> {
        let Some(key) = self.key_by_hash.get(hash) else {
            return Vec::new();
        };
        self.by_key
            .get(key)
            .into_iter()
            .flatten()
            .filter(|peer| peer.as_str() != hash)
            .cloned()
            .collect()
    }

    /// Whether `hash` has at least one cross-seed peer.
    #[must_use]
    pub fn has_peer(&self, hash: &str) -> bool {
        !self.peers_of(hash).is_empty()
    }

    /// The cross-seed key for `hash`, if it has one.
    #[must_use]
    pub fn key_of(&self, hash: &str) -> Option<&(String, String)> {
        self.key_by_hash.get(hash)
    }
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
    fn peers_share_normalized_key() {
        let torrents = vec![
            torrent("a", "/data/Movie", "/data"),
            torrent("b", "/data/movie/", "/Data"),
            torrent("c", "/data/other", "/data"),
        ];
        let index = CrossSeedIndex::build(&torrents);
        assert_eq!(index.peers_of("a"), vec!["b".to_string()]);
        assert!(index.has_peer("a"));
        assert!(!index.has_peer("c"));
    }

    #[test]
    fn torrents_without_content_path_are_excluded() {
        let torrents = vec![torrent("a", "", "/data")];
        let index = CrossSeedIndex::build(&torrents);
        assert_eq!(index.key_of("a"), None);
        assert!(index.peers_of("a").is_empty());
    }
}
