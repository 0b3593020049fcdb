//! Point-in-time view of the emitter's state for diagnostics.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{ListenerRegistry, PendingQueue};

/// Copy of the coordinator-owned emitter state.
///
/// Published by the coordinator after every command, so reading one never
/// touches the live registry or queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmitterSnapshot {
    /// Total active subscriptions across all names.
    pub listeners: usize,
    /// Number of events waiting in the pending queue.
    pub queued: usize,
    /// Active subscription count per event name.
    pub events: BTreeMap<String, usize>,
    /// Whether the consumer reported itself ready.
    pub ready: bool,
    /// Whether a consumer is attached.
    pub consumer_attached: bool,
    /// Events evicted from a full pending queue since start.
    pub evicted: u64,
}

impl EmitterSnapshot {
    /// Captures the current coordinator state.
    #[must_use]
    pub fn capture(
        listeners: &ListenerRegistry,
        queue: &PendingQueue,
        ready: bool,
        consumer_attached: bool,
    ) -> Self {
        Self {
            listeners: listeners.total(),
            queued: queue.len(),
            events: listeners.to_map(),
            ready,
            consumer_attached,
            evicted: queue.evicted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Event;
    use serde_json::json;

    #[test]
    fn capture_copies_counts_and_depth() {
        let mut listeners = ListenerRegistry::new();
        listeners.add("tok");
        listeners.add("tok");
        let mut queue = PendingQueue::default();
        queue.push(Event::new("other", json!(null)));

        let snap = EmitterSnapshot::capture(&listeners, &queue, true, false);
        assert_eq!(snap.listeners, 2);
        assert_eq!(snap.queued, 1);
        assert_eq!(snap.events.get("tok"), Some(&2));
        assert!(snap.ready);
        assert!(!snap.consumer_attached);

        listeners.add("tok");
        assert_eq!(snap.events.get("tok"), Some(&2));
    }
}
