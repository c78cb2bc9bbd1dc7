//! Per-hash, per-instance debounce: once a hash has had an action applied,
//! it is exempt from further processing for one cooldown window (default
//! 2 minutes, configurable via `seedkeeper-config`).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks the last time an action was applied to each `(instance, hash)`
/// pair, behind a single mutex. Keying the one map on the instance as
/// part of the key is equivalent to a per-instance lock under
/// uncontended access and far simpler than a map of mutexes.
#[derive(Default)]
pub struct Debouncer {
    last_applied: Mutex<HashMap<(String, String), Instant>>,
}

impl Debouncer {
    /// Construct an empty debouncer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `hash` on `instance` is still inside its cooldown window.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned.
    #[must_use]
    pub fn is_debounced(&self, instance: &str, hash: &str, window: Duration, now: Instant) -> bool {
        let guard = match self.last_applied.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .get(&(instance.to_string(), hash.to_string()))
            .is_some_and(|last| now.duration_since(*last) < window)
    }

    /// Record that an action was just applied to `hash` on `instance`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned.
    pub fn mark(&self, instance: &str, hash: &str, now: Instant) {
        let mut guard = match self.last_applied.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert((instance.to_string(), hash.to_string()), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_hash_is_debounced_until_window_elapses() {
        let debouncer = Debouncer::new();
        let now = Instant::now();
        let window = Duration::from_secs(120);

        assert!(!debouncer.is_debounced("main", "abc", window, now));
        debouncer.mark("main", "abc", now);
        assert!(debouncer.is_debounced("main", "abc", window, now));

        let later = now + Duration::from_secs(121);
        assert!(!debouncer.is_debounced("main", "abc", window, later));
    }

    #[test]
    fn debounce_is_scoped_per_instance() {
        let debouncer = Debouncer::new();
        let now = Instant::now();
        debouncer.mark("main", "abc", now);
        assert!(!debouncer.is_debounced("other", "abc", Duration::from_secs(120), now));
    }
}
