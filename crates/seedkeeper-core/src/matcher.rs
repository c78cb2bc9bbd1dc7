//! Tracker/domain pattern matching.
//!
//! A rule's tracker pattern is a `,`/`;`/`|`-delimited list of alternatives;
//! a torrent matches if any alternative matches any of its tracker domains.

/// Split a raw pattern string into trimmed, non-empty alternatives.
fn split_alternatives(pattern: &str) -> Vec<&str> {
    pattern
        .split([',', ';', '|'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Whether `pattern` matches any domain in `domains`.
///
/// Matching is case-insensitive throughout. An alternative of exactly `*`
/// matches every torrent, including one with no tracker domains at all. A
/// leading `.` denotes a suffix match (`.example.com` matches
/// `example.com` and `sub.example.com` but not `notexample.com`). An
/// alternative containing `*` or `?` is treated as a glob, anchored to the
/// full domain. Anything else is an exact match.
#[must_use]
pub fn matches_any(pattern: &str, domains: &[String]) -> bool {
    let alternatives = split_alternatives(pattern);
    if alternatives.is_empty() {
        return false;
    }
    alternatives
        .iter()
        .any(|alternative| matches_one(alternative, domains))
}

fn matches_one(alternative: &str, domains: &[String]) -> bool {
    if alternative == "*" {
        return true;
    }
    if let Some(suffix) = alternative.strip_prefix('.') {
        let suffix = suffix.to_ascii_lowercase();
        return domains.iter().any(|domain| {
            let domain = domain.to_ascii_lowercase();
            domain == suffix || domain.ends_with(&format!(".{suffix}"))
        });
    }
    if alternative.contains('*') || alternative.contains('?') {
        return domains
            .iter()
            .any(|domain| glob_match(alternative, domain));
    }
    let alternative = alternative.to_ascii_lowercase();
    domains
        .iter()
        .any(|domain| domain.to_ascii_lowercase() == alternative)
}

/// Anchored glob match supporting `*` (any run, including empty) and `?`
/// (exactly one character), case-insensitive.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_ascii_lowercase().chars().collect();
    let text: Vec<char> = text.to_ascii_lowercase().chars().collect();
    glob_match_inner(&pattern, &text)
}

fn glob_match_inner(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') => {
            glob_match_inner(&pattern[1..], text)
                || (!text.is_empty() && glob_match_inner(pattern, &text[1..]))
        }
        Some('?') => !text.is_empty() && glob_match_inner(&pattern[1..], &text[1..]),
        Some(ch) => text.first() == Some(ch) && glob_match_inner(&pattern[1..], &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn wildcard_alone_matches_everything() {
        assert!(matches_any("*", &domains(&[])));
        assert!(matches_any("*", &domains(&["tracker.example.com"])));
    }

    #[test]
    fn empty_pattern_never_matches() {
        assert!(!matches_any("", &domains(&["tracker.example.com"])));
        assert!(!matches_any("   ", &domains(&["tracker.example.com"])));
    }

    #[test]
    fn suffix_match_requires_dot_boundary() {
        assert!(matches_any(".example.com", &domains(&["example.com"])));
        assert!(matches_any(
            ".example.com",
            &domains(&["sub.example.com"])
        ));
        assert!(!matches_any(
            ".example.com",
            &domains(&["notexample.com"])
        ));
    }

    #[test]
    fn glob_alternative_is_anchored() {
        assert!(matches_any("*.private.*", &domains(&["tracker.private.io"])));
        assert!(!matches_any(
            "*.private.*",
            &domains(&["tracker.private.io.evil.com"])
        ));
    }

    #[test]
    fn multi_delimited_alternatives_are_independent() {
        let pattern = "tracker-a.example.com, .tracker-b.net | tracker-c.*";
        assert!(matches_any(pattern, &domains(&["tracker-a.example.com"])));
        assert!(matches_any(pattern, &domains(&["sub.tracker-b.net"])));
        assert!(matches_any(pattern, &domains(&["tracker-c.io"])));
        assert!(!matches_any(pattern, &domains(&["tracker-d.io"])));
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        assert!(matches_any("Tracker.Example.COM", &domains(&["tracker.example.com"])));
    }
}
