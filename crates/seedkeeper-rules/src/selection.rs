//! Rule selection and ordering.

use seedkeeper_core::matcher;
use seedkeeper_core::model::Torrent;
use seedkeeper_core::rule::Rule;

use crate::domain::tracker_domains;

/// Whether `rule` applies to `torrent`: the rule must be enabled and its
/// tracker pattern must match the torrent's tracker domain.
#[must_use]
pub fn rule_matches_torrent(rule: &Rule, torrent: &Torrent) -> bool {
    rule.enabled && matcher::matches_any(&rule.tracker_pattern, &tracker_domains(&torrent.tracker))
}

/// Sort `rules` in processing order: `(sort_order ASC, id ASC)`.
pub fn sort_rules(rules: &mut [Rule]) {
    rules.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
}

/// Sort `torrents` in processing order: `(added_on ASC, hash ASC)`, the
/// order that makes `FreeSpace` self-termination reproducible.
pub fn sort_torrents(torrents: &mut [Torrent]) {
    torrents.sort_by(|a, b| a.added_on.cmp(&b.added_on).then_with(|| a.hash.cmp(&b.hash)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedkeeper_core::model::TorrentStateKind;

    fn rule(id: &str, enabled: bool, pattern: &str) -> Rule {
        Rule {
            id: id.into(),
            name: id.into(),
            instance_id: "inst".into(),
            enabled,
            sort_order: 0,
            tracker_pattern: pattern.into(),
            actions: seedkeeper_core::rule::ActionConditions::default(),
            free_space_source: None,
        }
    }

    fn torrent(tracker: &str) -> Torrent {
        Torrent {
            hash: "h".into(),
            name: "n".into(),
            category: String::new(),
            tags: Vec::new(),
            tracker: tracker.into(),
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
            save_path: String::new(),
            content_path: String::new(),
            comment: String::new(),
            private: false,
        }
    }

    #[test]
    fn disabled_rule_never_matches() {
        let rule = rule("r1", false, "*");
        assert!(!rule_matches_torrent(&rule, &torrent("https://tracker.example.com/announce")));
    }

    #[test]
    fn pattern_matches_extracted_domain() {
        let rule = rule("r1", true, "tracker.example.com");
        assert!(rule_matches_torrent(&rule, &torrent("https://tracker.example.com/announce")));
        assert!(!rule_matches_torrent(&rule, &torrent("https://other.example.com/announce")));
    }

    #[test]
    fn rules_sort_by_sort_order_then_id() {
        let mut rules = vec![rule("b", true, "*"), rule("a", true, "*")];
        rules[0].sort_order = 1;
        rules[1].sort_order = 1;
        sort_rules(&mut rules);
        assert_eq!(rules[0].id, "a");
        assert_eq!(rules[1].id, "b");
    }
}
