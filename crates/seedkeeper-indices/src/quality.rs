//! Quality engine: per-profile best/inferior hash sets computed from a
//! ranking vector over parsed release fields.

use std::collections::{HashMap, HashSet};

use seedkeeper_client::{ParsedRelease, ReleaseParser};
use seedkeeper_core::model::Torrent;

/// Release field a quality tier ranks on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityField {
    /// Resolution tag (e.g. `1080p`).
    Resolution,
    /// Source tag (e.g. `BluRay`).
    Source,
    /// Video codec tag.
    Codec,
    /// HDR format tag.
    Hdr,
    /// Audio codec tag.
    Audio,
    /// Channel layout tag.
    Channels,
    /// Release group tag.
    Group,
}

impl QualityField {
    fn extract(self, release: &ParsedRelease) -> Option<&str> {
        match self {
            Self::Resolution => release.resolution.as_deref(),
            Self::Source => release.source.as_deref(),
            Self::Codec => release.codec.as_deref(),
            Self::Hdr => release.hdr.as_deref(),
            Self::Audio => release.audio.as_deref(),
            Self::Channels => release.channels.as_deref(),
            Self::Group => release.group.as_deref(),
        }
    }

    /// Source and codec tags get stripped-punctuation normalization so
    /// `WEB-DL` and `WEBDL` compare equal.
    fn normalizes_punctuation(self) -> bool {
        matches!(self, Self::Source | Self::Codec)
    }
}

/// Release field a group key is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    /// Release title.
    Title,
    /// Release year.
    Year,
    /// Series name.
    Series,
    /// Episode identifier.
    Episode,
    /// Platform tag.
    Platform,
    /// Collection tag.
    Collection,
}

impl GroupField {
    fn extract(self, release: &ParsedRelease) -> String {
        match self {
            Self::Title => release.title.to_ascii_lowercase(),
            Self::Year => release.year.map_or_else(String::new, |year| year.to_string()),
            Self::Series => release.series.clone().unwrap_or_default().to_ascii_lowercase(),
            Self::Episode => release.episode.clone().unwrap_or_default().to_ascii_lowercase(),
            Self::Platform => release.platform.clone().unwrap_or_default().to_ascii_lowercase(),
            Self::Collection => release.collection.clone().unwrap_or_default().to_ascii_lowercase(),
        }
    }
}

/// One ranking dimension: an ordered list of values from best to worst.
#[derive(Debug, Clone)]
pub struct QualityTier {
    /// Field this tier ranks on.
    pub field: QualityField,
    /// Values in best-to-worst order.
    pub value_order: Vec<String>,
}

/// A quality profile: how torrents are grouped, and how group members are
/// ranked against each other.
#[derive(Debug, Clone)]
pub struct QualityProfile {
    /// Profile identifier.
    pub id: String,
    /// Fields used to build the grouping key.
    pub group_fields: Vec<GroupField>,
    /// Ranking tiers, most significant first.
    pub tiers: Vec<QualityTier>,
}

/// Computed best/inferior hash sets for one profile.
#[derive(Debug, Clone, Default)]
pub struct QualitySets {
    /// Hashes tied for the best rank within their group.
    pub best: HashSet<String>,
    /// Hashes with at least one strictly-better-ranked peer in their group.
    pub inferior: HashSet<String>,
}

impl QualitySets {
    /// Whether `hash` is a best-ranked member of its group.
    #[must_use]
    pub fn is_best(&self, hash: &str) -> bool {
        self.best.contains(hash)
    }

    /// Whether `hash` has a strictly-better-ranked peer in its group.
    #[must_use]
    pub fn is_inferior(&self, hash: &str) -> bool {
        self.inferior.contains(hash)
    }
}

fn normalize_value(field: QualityField, raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if field.normalizes_punctuation() {
        lower.chars().filter(char::is_ascii_alphanumeric).collect()
    } else {
        lower
    }
}

fn rank_vector(profile: &QualityProfile, release: &ParsedRelease) -> Vec<usize> {
    profile
        .tiers
        .iter()
        .map(|tier| {
            let Some(raw) = tier.field.extract(release) else {
                return tier.value_order.len();
            };
            let normalized = normalize_value(tier.field, raw);
            tier.value_order
                .iter()
                .position(|candidate| normalize_value(tier.field, candidate) == normalized)
                .unwrap_or(tier.value_order.len())
        })
        .collect()
}

/// Compute best/inferior sets for `profile` over `torrents`.
///
/// Torrents whose name cannot be parsed are excluded entirely. Groups with
/// fewer than two parseable members contribute no entries to either set.
#[must_use]
pub fn compute(
    profile: &QualityProfile,
    torrents: &[Torrent],
    parser: &dyn ReleaseParser,
) -> QualitySets {
    let mut groups: HashMap<String, Vec<(String, Vec<usize>)>> = HashMap::new();
    for torrent in torrents {
        let Some(release) = parser.parse(&torrent.name) else {
            continue;
        };
        let key = profile
            .group_fields
            .iter()
            .map(|field| field.extract(&release))
            .collect::<Vec<_>>()
            .join("|");
        let vector = rank_vector(profile, &release);
        groups.entry(key).or_default().push((torrent.hash.clone(), vector));
    }

    let mut sets = QualitySets::default();
    for members in groups.values() {
        if members.len() < 2 {
            continue;
        }
        let min_vector = members
            .iter()
            .map(|(_, vector)| vector)
            .min()
            .expect("non-empty group");
        for (hash, vector) in members {
            if vector == min_vector {
                sets.best.insert(hash.clone());
            } else {
                sets.inferior.insert(hash.clone());
            }
        }
    }
    sets
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedParser(HashMap<String, ParsedRelease>);

    impl ReleaseParser for FixedParser {
        fn parse(&self, name: &str) -> Option<ParsedRelease> {
            self.0.get(name).cloned()
        }
    }

    fn release(title: &str, resolution: &str, source: &str) -> ParsedRelease {
        ParsedRelease {
            title: title.to_string(),
            resolution: Some(resolution.to_string()),
            source: Some(source.to_string()),
            ..ParsedRelease::default()
        }
    }

    fn torrent(hash: &str, name: &str) -> Torrent {
        use seedkeeper_core::model::TorrentStateKind;
        Torrent {
            hash: hash.into(),
            name: name.into(),
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
            save_path: "/data".into(),
            content_path: "/data/x".into(),
            comment: String::new(),
            private: false,
        }
    }

    #[test]
    fn best_ranked_member_is_not_inferior() {
        let mut releases = HashMap::new();
        releases.insert("a.mkv".to_string(), release("Movie", "2160p", "BluRay"));
        releases.insert("b.mkv".to_string(), release("Movie", "1080p", "WEB-DL"));
        let parser = FixedParser(releases);

        let profile = QualityProfile {
            id: "p1".into(),
            group_fields: vec![GroupField::Title],
            tiers: vec![
                QualityTier {
                    field: QualityField::Resolution,
                    value_order: vec!["2160p".into(), "1080p".into()],
                },
                QualityTier {
                    field: QualityField::Source,
                    value_order: vec!["bluray".into(), "webdl".into()],
                },
            ],
        };

        let torrents = vec![torrent("a", "a.mkv"), torrent("b", "b.mkv")];
        let sets = compute(&profile, &torrents, &parser);
        assert!(sets.is_best("a"));
        assert!(!sets.is_inferior("a"));
        assert!(sets.is_inferior("b"));
        assert!(!sets.is_best("b"));
    }

    #[test]
    fn lone_member_group_has_no_entries() {
        let mut releases = HashMap::new();
        releases.insert("a.mkv".to_string(), release("Solo", "1080p", "WEB-DL"));
        let parser = FixedParser(releases);
        let profile = QualityProfile {
            id: "p1".into(),
            group_fields: vec![GroupField::Title],
            tiers: vec![],
        };
        let torrents = vec![torrent("a", "a.mkv")];
        let sets = compute(&profile, &torrents, &parser);
        assert!(!sets.is_best("a"));
        assert!(!sets.is_inferior("a"));
    }
}
