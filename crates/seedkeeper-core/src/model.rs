//! Observed torrent state, as reported by the torrent client for one cycle.

use serde::{Deserialize, Serialize};

/// A torrent as observed from the client at the start of a cycle.
///
/// This is treated as immutable input for the duration of one cycle: the
/// rule processor never mutates it, only the [`crate::desired_state::TorrentDesiredState`]
/// record built alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Torrent {
    /// Unique identifier assigned by the torrent client (infohash or similar).
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Single category assigned to the torrent, empty if none.
    pub category: String,
    /// Tags, order-preserving as reported by the client.
    pub tags: Vec<String>,
    /// Current announce URL / tracker the client is using.
    pub tracker: String,
    /// Current lifecycle state.
    pub state: TorrentStateKind,
    /// Total size in bytes, including unselected files.
    pub size: u64,
    /// Total size of selected files in bytes.
    pub total_size: u64,
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Bytes uploaded so far.
    pub uploaded: u64,
    /// Bytes remaining to complete the selected files.
    pub amount_left: u64,
    /// Upload/download ratio as reported by the client.
    pub ratio: f64,
    /// Fraction of selected content completed, `0.0..=1.0`.
    pub progress: f64,
    /// Availability of the swarm for this torrent, `-1.0` if unknown.
    pub availability: f64,
    /// Current download speed in bytes/second.
    pub dl_speed: u64,
    /// Current upload speed in bytes/second.
    pub up_speed: u64,
    /// Number of seeds connected.
    pub seeds: u32,
    /// Number of leechers connected.
    pub leechs: u32,
    /// Number of seeds reported by the tracker (swarm total).
    pub complete: u32,
    /// Number of leechers reported by the tracker (swarm total).
    pub incomplete: u32,
    /// Number of trackers configured for the torrent.
    pub trackers_count: u32,
    /// Unix timestamp the torrent was added, `0` if unknown.
    pub added_on: i64,
    /// Unix timestamp the torrent completed, `0` if not yet complete.
    pub completion_on: i64,
    /// Unix timestamp of the last observed activity.
    pub last_activity: i64,
    /// Cumulative seeding time in seconds.
    pub seeding_time: i64,
    /// Cumulative active time in seconds (downloading or seeding).
    pub time_active: i64,
    /// Directory the client saves the torrent's content into.
    pub save_path: String,
    /// Resolved path to the torrent's content (file or top-level directory).
    pub content_path: String,
    /// User-supplied comment field from the torrent metadata.
    pub comment: String,
    /// Whether the torrent is marked private (no DHT/PEX/LSD).
    pub private: bool,
}

impl Torrent {
    /// Age in seconds since the torrent was added, clamped to `0`.
    ///
    /// Returns `None` when `added_on` is `0` (unknown), matching the
    /// evaluator's rule that `AddedAge` conditions never match torrents
    /// with no recorded add time.
    #[must_use]
    pub fn added_age_secs(&self, now: i64) -> Option<i64> {
        (self.added_on > 0).then(|| (now - self.added_on).max(0))
    }

    /// Age in seconds since the torrent completed, clamped to `0`.
    #[must_use]
    pub fn completed_age_secs(&self, now: i64) -> Option<i64> {
        (self.completion_on > 0).then(|| (now - self.completion_on).max(0))
    }

    /// Time in seconds since the last observed activity, clamped to `0`.
    #[must_use]
    pub fn inactive_time_secs(&self, now: i64) -> Option<i64> {
        (self.last_activity > 0).then(|| (now - self.last_activity).max(0))
    }

    /// Whether the torrent is currently in a paused/stopped state.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        matches!(self.state, TorrentStateKind::Paused)
    }

    /// Whether the torrent is currently being checked (hash-checking).
    #[must_use]
    pub const fn is_checking(&self) -> bool {
        matches!(self.state, TorrentStateKind::Checking)
    }

    /// Tags rendered as a single comma-separated string, matching the
    /// wire format used by the torrent client's bulk tag endpoints.
    #[must_use]
    pub fn tags_csv(&self) -> String {
        self.tags.join(",")
    }

    /// Whether `tag` is currently present (case-sensitive, matching
    /// client semantics).
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| existing == tag)
    }
}

/// Lifecycle state of a torrent, collapsed from the client's richer
/// per-backend state strings into the subset the automation core reasons
/// about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStateKind {
    /// Actively downloading.
    Downloading,
    /// Actively seeding.
    Seeding,
    /// Paused or stopped by the user or automation.
    Paused,
    /// Hash-checking in progress.
    Checking,
    /// Stalled, errored, or otherwise not making progress.
    Stalled,
    /// Queued, waiting for a slot.
    Queued,
    /// Any state not represented above.
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Torrent {
        Torrent {
            hash: "abc123".into(),
            name: "Example.Release-GRP".into(),
            category: "movies".into(),
            tags: vec!["keep".into()],
            tracker: "https://tracker.example.com/announce".into(),
            state: TorrentStateKind::Seeding,
            size: 20_000_000_000,
            total_size: 20_000_000_000,
            downloaded: 20_000_000_000,
            uploaded: 5_000_000_000,
            amount_left: 0,
            ratio: 0.25,
            progress: 1.0,
            availability: 2.0,
            dl_speed: 0,
            up_speed: 1_000_000,
            seeds: 3,
            leechs: 1,
            complete: 10,
            incomplete: 2,
            trackers_count: 1,
            added_on: 1_000,
            completion_on: 2_000,
            last_activity: 3_000,
            seeding_time: 500,
            time_active: 1_500,
            save_path: "/data/movies".into(),
            content_path: "/data/movies/Example.Release-GRP".into(),
            comment: String::new(),
            private: true,
        }
    }

    #[test]
    fn unknown_added_on_yields_no_age() {
        let mut torrent = sample();
        torrent.added_on = 0;
        assert_eq!(torrent.added_age_secs(5_000), None);
    }

    #[test]
    fn ages_are_clamped_to_zero() {
        let torrent = sample();
        assert_eq!(torrent.added_age_secs(500), Some(0));
        assert_eq!(torrent.added_age_secs(5_000), Some(4_000));
    }

    #[test]
    fn has_tag_is_case_sensitive() {
        let torrent = sample();
        assert!(torrent.has_tag("keep"));
        assert!(!torrent.has_tag("Keep"));
    }
}
