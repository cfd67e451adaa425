//! Key Tracker Module
//!
//! Records which namespaced keys the cache service has written, so that
//! `clear()` can delete them without scanning the whole store.

use std::collections::HashSet;

// == Key Tracker ==
/// Set of namespaced keys written by this process.
///
/// Not authoritative: keys that expire in the store stay here until the
/// next `drain`. Deleting them then is a harmless no-op.
#[derive(Debug, Default)]
pub struct KeyTracker {
    keys: HashSet<String>,
}

impl KeyTracker {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Track ==
    /// Records a key. Tracking the same key twice keeps one entry.
    pub fn track(&mut self, key: &str) {
        self.keys.insert(key.to_string());
    }

    // == Untrack ==
    /// Forgets a key.
    pub fn untrack(&mut self, key: &str) {
        self.keys.remove(key);
    }

    // == Drain ==
    /// Takes every tracked key, leaving the tracker empty.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.keys).into_iter().collect()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}
