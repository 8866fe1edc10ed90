//! Trailing-edge debouncing of keyed requests.
//!
//! A request fires once its key has been quiet for the configured interval.
//! A newer request for the same key replaces the pending one and restarts the
//! wait, so a burst collapses into a single firing carrying the latest value.
//! Time is passed in explicitly; callers drive it from their frame loop.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use web_time::Instant;

#[derive(Debug)]
struct Pending<V> {
    value: V,
    deadline: Instant,
}

/// Keyed trailing-edge debouncer.
#[derive(Debug)]
pub struct Debouncer<K, V> {
    interval: Duration,
    pending: HashMap<K, Pending<V>>,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    /// Create a debouncer with the given quiet interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: HashMap::new(),
        }
    }

    /// Schedule `value` under `key`. Returns `true` if a pending request for
    /// the same key was replaced.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) -> bool {
        let deadline = now + self.interval;
        self.pending
            .insert(key, Pending { value, deadline })
            .is_some()
    }

    /// Remove and return every request whose deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, V)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        due.into_iter()
            .filter_map(|key| {
                self.pending
                    .remove(&key)
                    .map(|pending| (key, pending.value))
            })
            .collect()
    }

    /// Drop the pending request for `key`.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    /// Drop all pending requests.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest deadline among pending requests.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// The quiet interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
