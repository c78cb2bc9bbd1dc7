//! Path normalization and cross-seed keying.

use crate::model::Torrent;

/// Canonicalize a path for cross-platform comparison: lowercase,
/// backslashes replaced with forward slashes, trailing slash stripped.
/// An empty input stays empty.
#[must_use]
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let unified = raw.replace('\\', "/").to_ascii_lowercase();
    unified
        .strip_suffix('/')
        .map_or(unified.clone(), str::to_string)
}

/// Key used to group torrents that point at identical on-disk content,
/// i.e. cross-seeds. `None` when `content_path` is empty (no stable key
/// can be formed, so the torrent is excluded from cross-seed grouping).
#[must_use]
pub fn cross_seed_key(torrent: &Torrent) -> Option<(String, String)> {
    if torrent.content_path.is_empty() {
        return None;
    }
    Some((
        normalize(&torrent.content_path),
        normalize(&torrent.save_path),
    ))
}

/// Whether a torrent's content path is indistinguishable from its bare
/// save directory — the client reported a shared directory rather than
/// the torrent's own content, so content-scoped destructive actions are
/// unsafe.
#[must_use]
pub fn is_content_path_ambiguous(torrent: &Torrent) -> bool {
    normalize(&torrent.content_path) == normalize(&torrent.save_path)
}

/// Whether `full` resolves to a location inside `base` once both are
/// cleaned. Used to reject traversal before following the hardlink
/// index's or the mover's path arithmetic.
#[must_use]
pub fn is_path_inside_base(base: &str, full: &str) -> bool {
    let base = normalize(base);
    let full = normalize(full);
    if base.is_empty() || full.is_empty() {
        return false;
    }
    let relative = match full.strip_prefix(&base) {
        Some(rest) => rest,
        None => return false,
    };
    if relative.is_empty() {
        return true;
    }
    let Some(relative) = relative.strip_prefix('/') else {
        return false;
    };
    !relative
        .split('/')
        .any(|segment| segment == ".." || segment == ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent_with_paths(content_path: &str, save_path: &str) -> Torrent {
        use crate::model::TorrentStateKind;
        Torrent {
            hash: "h".into(),
            name: "n".into(),
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
    fn normalize_is_idempotent() {
        let path = r"C:\Data\Movies\\";
        assert_eq!(normalize(&normalize(path)), normalize(path));
    }

    #[test]
    fn normalize_strips_trailing_slash_and_folds_separators() {
        assert_eq!(normalize("/Data/Movies/"), "/data/movies");
        assert_eq!(normalize(r"C:\Data\Movies"), "c:/data/movies");
    }

    #[test]
    fn cross_seed_key_requires_content_path() {
        let torrent = torrent_with_paths("", "/data/movies");
        assert_eq!(cross_seed_key(&torrent), None);

        let torrent = torrent_with_paths("/data/movies/Example", "/data/movies");
        assert_eq!(
            cross_seed_key(&torrent),
            Some(("/data/movies/example".into(), "/data/movies".into()))
        );
    }

    #[test]
    fn ambiguous_when_content_equals_save_path() {
        let torrent = torrent_with_paths("/data/movies", "/data/movies");
        assert!(is_content_path_ambiguous(&torrent));

        let torrent = torrent_with_paths("/data/movies/Example", "/data/movies");
        assert!(!is_content_path_ambiguous(&torrent));
    }

    #[test]
    fn traversal_outside_base_is_rejected() {
        assert!(is_path_inside_base("/data/movies", "/data/movies/Example"));
        assert!(is_path_inside_base("/data/movies", "/data/movies"));
        assert!(!is_path_inside_base("/data/movies", "/data/movies/../etc"));
        assert!(!is_path_inside_base("/data/movies", "/data/other"));
    }
}
