//! FIFO of events that could not be delivered yet.
//!
//! Events land here when nobody listens for their name, or the consumer is
//! missing or not ready. The emitter retries them on every listener,
//! readiness or consumer change.

use std::collections::{HashMap, VecDeque};

use super::Event;

/// Ordered queue of undelivered events with an optional depth limit.
///
/// When the limit is reached the oldest event is evicted to make room, and
/// the eviction is counted so the diagnostics snapshot can report it.
#[derive(Debug)]
pub struct PendingQueue {
    events: VecDeque<Event>,
    /// Queued events per name, kept in step with `events`.
    per_name: HashMap<String, usize>,
    capacity: Option<usize>,
    evicted: u64,
}

impl PendingQueue {
    /// Creates a queue. `None` (or `Some(0)`) means unbounded.
    #[must_use]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            events: VecDeque::new(),
            per_name: HashMap::new(),
            capacity: capacity.filter(|c| *c > 0),
            evicted: 0,
        }
    }

    /// Appends an event, returning the evicted oldest event if the queue
    /// was full.
    pub fn push(&mut self, event: Event) -> Option<Event> {
        let evicted = match self.capacity {
            Some(cap) if self.events.len() >= cap => {
                self.evicted = self.evicted.saturating_add(1);
                self.events.pop_front()
            }
            _ => None,
        };
        if let Some(old) = &evicted {
            self.forget(old.name());
        }
        *self.per_name.entry(event.name().to_string()).or_default() += 1;
        self.events.push_back(event);
        evicted
    }

    /// Moves every queued event out, leaving the queue empty.
    ///
    /// A flush pass works on this detached copy and hands back whatever it
    /// could not deliver through [`PendingQueue::restore`].
    pub fn take(&mut self) -> VecDeque<Event> {
        self.per_name.clear();
        std::mem::take(&mut self.events)
    }

    /// Puts undelivered events back in front of anything queued since
    /// [`PendingQueue::take`], keeping their original order.
    pub fn restore(&mut self, mut kept: VecDeque<Event>) {
        for event in &kept {
            *self.per_name.entry(event.name().to_string()).or_default() += 1;
        }
        kept.append(&mut self.events);
        self.events = kept;
    }

    /// Returns `true` if an event with the given name is waiting.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.per_name.contains_key(name)
    }

    /// Number of queued events with the given name.
    #[must_use]
    pub fn count_for(&self, name: &str) -> usize {
        self.per_name.get(name).copied().unwrap_or(0)
    }

    fn forget(&mut self, name: &str) {
        if let Some(count) = self.per_name.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                self.per_name.remove(name);
            }
        }
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events evicted since creation.
    #[must_use]
    pub const fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Configured depth limit, if any.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(queue: &mut PendingQueue) -> Vec<String> {
        let events = queue.take();
        let out = events.iter().map(|e| e.name().to_string()).collect();
        queue.restore(events);
        out
    }

    #[test]
    fn push_preserves_fifo_order() {
        let mut queue = PendingQueue::default();
        queue.push(Event::new("a", json!(1)));
        queue.push(Event::new("b", json!(2)));
        queue.push(Event::new("c", json!(3)));
        assert_eq!(queue.len(), 3);
        assert_eq!(names(&mut queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn zero_capacity_means_unbounded() {
        let mut queue = PendingQueue::new(Some(0));
        assert_eq!(queue.capacity(), None);
        for i in 0..100 {
            assert!(queue.push(Event::new("e", json!(i))).is_none());
        }
        assert_eq!(queue.len(), 100);
        assert_eq!(queue.evicted(), 0);
    }

    #[test]
    fn full_queue_evicts_oldest() {
        let mut queue = PendingQueue::new(Some(2));
        queue.push(Event::new("a", json!(1)));
        queue.push(Event::new("b", json!(2)));
        let evicted = queue.push(Event::new("c", json!(3)));
        assert_eq!(evicted.map(|e| e.name().to_string()), Some("a".to_string()));
        assert_eq!(queue.evicted(), 1);
        assert_eq!(names(&mut queue), vec!["b", "c"]);
    }

    #[test]
    fn restore_puts_kept_events_first() {
        let mut queue = PendingQueue::default();
        queue.push(Event::new("a", json!(1)));
        queue.push(Event::new("b", json!(2)));
        let taken = queue.take();
        assert!(queue.is_empty());
        queue.push(Event::new("late", json!(3)));
        queue.restore(taken);
        assert_eq!(names(&mut queue), vec!["a", "b", "late"]);
    }

    #[test]
    fn name_counts_follow_push_take_and_restore() {
        let mut queue = PendingQueue::default();
        queue.push(Event::new("a", json!(1)));
        queue.push(Event::new("a", json!(2)));
        queue.push(Event::new("b", json!(3)));
        assert!(queue.contains_name("a"));
        assert_eq!(queue.count_for("a"), 2);
        assert!(!queue.contains_name("c"));

        let mut taken = queue.take();
        assert!(!queue.contains_name("a"));
        queue.push(Event::new("c", json!(4)));
        // Keep only the second "a" and "b", as a partial flush would.
        taken.pop_front();
        queue.restore(taken);
        assert_eq!(queue.count_for("a"), 1);
        assert_eq!(queue.count_for("b"), 1);
        assert_eq!(queue.count_for("c"), 1);
    }

    #[test]
    fn eviction_releases_name_count() {
        let mut queue = PendingQueue::new(Some(2));
        queue.push(Event::new("a", json!(1)));
        queue.push(Event::new("b", json!(2)));
        queue.push(Event::new("c", json!(3)));
        assert!(!queue.contains_name("a"));
        assert_eq!(queue.count_for("b"), 1);
        assert_eq!(queue.count_for("c"), 1);
    }
}
