//! In-memory table of entry name -> expiration time.
//!
//! Owned by whoever drives the cycle and passed by `&mut` into the scanner and
//! the expirer. Never persisted: a restart rebuilds it from the directory.

use std::collections::BTreeMap;
use std::time::SystemTime;

/// Mapping from entry name to the instant the entry expires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedSet {
    entries: BTreeMap<String, SystemTime>,
}

impl TrackedSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous expiration, if any.
    pub fn upsert(&mut self, name: impl Into<String>, expires_at: SystemTime) -> Option<SystemTime> {
        self.entries.insert(name.into(), expires_at)
    }

    /// Stop tracking `name`. Returns its expiration if it was tracked.
    pub fn remove(&mut self, name: &str) -> Option<SystemTime> {
        self.entries.remove(name)
    }

    /// Expiration for `name`.
    pub fn get(&self, name: &str) -> Option<SystemTime> {
        self.entries.get(name).copied()
    }

    /// Whether `name` is tracked.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the names whose expiration is at or before `now`.
    ///
    /// Returned as an owned list so the caller can mutate the set while walking it.
    pub fn expired_at(&self, now: SystemTime) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, expires_at)| **expires_at <= now)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Iterate `(name, expiration)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SystemTime)> {
        self.entries
            .iter()
            .map(|(name, expires_at)| (name.as_str(), *expires_at))
    }
}

impl FromIterator<(String, SystemTime)> for TrackedSet {
    fn from_iter<I: IntoIterator<Item = (String, SystemTime)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
