//! Ref-counted event listener registry.
//!
//! Tracks how many active subscriptions the consumer holds per event name.
//! Owned by the emitter's coordinator thread, so it needs no locking.

use std::collections::{BTreeMap, HashMap};

/// Maps event names to their active subscription count.
///
/// A name is present only while its count is at least one; absence means
/// zero subscribers.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    counts: HashMap<String, usize>,
    total: usize,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one subscription for `name` and returns the new count.
    pub fn add(&mut self, name: &str) -> usize {
        self.total += 1;
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Removes one subscription for `name`, or every subscription when `all`
    /// is set. Returns the remaining count.
    ///
    /// Unknown names are ignored.
    pub fn remove(&mut self, name: &str, all: bool) -> usize {
        let Some(count) = self.counts.get_mut(name) else {
            return 0;
        };
        if all || *count <= 1 {
            let removed = *count;
            self.counts.remove(name);
            self.total = self.total.saturating_sub(removed);
            0
        } else {
            *count -= 1;
            self.total = self.total.saturating_sub(1);
            *count
        }
    }

    /// Returns `true` if at least one subscription exists for `name`.
    #[must_use]
    pub fn has_listener(&self, name: &str) -> bool {
        self.counts.contains_key(name)
    }

    /// Returns the subscription count for `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Total number of active subscriptions across all names.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Copies the per-name counts, ordered by name.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.counts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_listeners() {
        let reg = ListenerRegistry::new();
        assert!(!reg.has_listener("tok"));
        assert_eq!(reg.count("tok"), 0);
        assert_eq!(reg.total(), 0);
    }

    #[test]
    fn add_creates_and_increments() {
        let mut reg = ListenerRegistry::new();
        assert_eq!(reg.add("tok"), 1);
        assert_eq!(reg.add("tok"), 2);
        assert_eq!(reg.add("other"), 1);
        assert_eq!(reg.total(), 3);
        assert!(reg.has_listener("tok"));
    }

    #[test]
    fn remove_decrements_then_deletes() {
        let mut reg = ListenerRegistry::new();
        reg.add("tok");
        reg.add("tok");
        assert_eq!(reg.remove("tok", false), 1);
        assert!(reg.has_listener("tok"));
        assert_eq!(reg.remove("tok", false), 0);
        assert!(!reg.has_listener("tok"));
        assert_eq!(reg.total(), 0);
    }

    #[test]
    fn remove_all_deletes_key_outright() {
        let mut reg = ListenerRegistry::new();
        reg.add("tok");
        reg.add("tok");
        reg.add("tok");
        reg.add("other");
        assert_eq!(reg.remove("tok", true), 0);
        assert!(!reg.has_listener("tok"));
        assert_eq!(reg.total(), 1);
    }

    #[test]
    fn over_removal_never_goes_negative_or_resurrects() {
        let mut reg = ListenerRegistry::new();
        reg.add("tok");
        for _ in 0..5 {
            assert_eq!(reg.remove("tok", false), 0);
        }
        assert!(!reg.has_listener("tok"));
        assert_eq!(reg.count("tok"), 0);
        assert_eq!(reg.total(), 0);
        assert!(reg.to_map().is_empty());
    }

    #[test]
    fn to_map_is_sorted_copy() {
        let mut reg = ListenerRegistry::new();
        reg.add("b");
        reg.add("a");
        reg.add("a");
        let map = reg.to_map();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(map.get("a"), Some(&2));
    }
}
