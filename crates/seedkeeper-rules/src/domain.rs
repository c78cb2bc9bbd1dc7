//! Tracker URL to bare-domain extraction, shared by rule selection and the
//! `Tracker` condition field.

/// Extract the host portion of a tracker announce URL, lowercased, with
/// any userinfo/port stripped. Empty input yields an empty list (no
/// domain to match against).
pub(crate) fn tracker_domains(tracker: &str) -> Vec<String> {
    if tracker.is_empty() {
        return Vec::new();
    }
    let without_scheme = tracker
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("udp://");
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    let host = host.rsplit_once('@').map_or(host, |(_, rest)| rest);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        Vec::new()
    } else {
        vec![host.to_ascii_lowercase()]
    }
}
