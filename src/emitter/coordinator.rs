//! The single thread that owns all emitter state.
//!
//! Every emitter call is turned into a [`Command`] and applied here in
//! submission order, so the listener registry, the pending queue and the
//! consumer state never need a lock.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::EventConsumer;
use crate::domain::{EmitterSnapshot, Event, ListenerRegistry, PendingQueue};
use crate::error::{BridgeError, DeliveryError, panic_message};

/// Name given to the coordinator OS thread.
pub const COORDINATOR_THREAD_NAME: &str = "bridge-event-coordinator";

/// A mutation or query marshalled onto the coordinator.
#[derive(Debug)]
pub(crate) enum Command {
    Attach(Arc<dyn EventConsumer>),
    Detach,
    SetReady(bool),
    AddListener(String),
    RemoveListener { name: String, all: bool },
    Send(Event),
    Sync(oneshot::Sender<EmitterSnapshot>),
}

impl Command {
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::Attach(_) => "attach_consumer",
            Self::Detach => "detach_consumer",
            Self::SetReady(_) => "set_ready",
            Self::AddListener(_) => "add_listener",
            Self::RemoveListener { .. } => "remove_listener",
            Self::Send(_) => "send",
            Self::Sync(_) => "sync",
        }
    }
}

/// Coordinator-owned emitter state.
#[derive(Debug)]
pub(crate) struct Coordinator {
    listeners: ListenerRegistry,
    queue: PendingQueue,
    consumer: Option<Arc<dyn EventConsumer>>,
    ready: bool,
    snapshot: watch::Sender<EmitterSnapshot>,
}

impl Coordinator {
    pub(crate) fn new(queue_capacity: Option<usize>, snapshot: watch::Sender<EmitterSnapshot>) -> Self {
        Self {
            listeners: ListenerRegistry::new(),
            queue: PendingQueue::new(queue_capacity),
            consumer: None,
            ready: false,
            snapshot,
        }
    }

    /// Applies commands until every sender is dropped.
    pub(crate) fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("event coordinator started");
        while let Some(command) = commands.blocking_recv() {
            self.apply(command);
        }
        tracing::debug!(queued = self.queue.len(), "event coordinator stopped");
    }

    pub(crate) fn apply(&mut self, command: Command) {
        match command {
            Command::Attach(consumer) => {
                tracing::debug!(consumer = ?consumer, "consumer attached");
                self.consumer = Some(consumer);
                self.flush(None);
            }
            Command::Detach => {
                tracing::debug!("consumer detached");
                self.consumer = None;
            }
            Command::SetReady(ready) => {
                self.ready = ready;
                if ready {
                    self.flush(None);
                }
            }
            Command::AddListener(name) => {
                let count = self.listeners.add(&name);
                tracing::trace!(event = %name, count, "listener added");
                self.flush(Some(&name));
            }
            Command::RemoveListener { name, all } => {
                let count = self.listeners.remove(&name, all);
                tracing::trace!(event = %name, all, count, "listener removed");
            }
            Command::Send(event) => self.send(event),
            Command::Sync(reply) => {
                let _ = reply.send(self.capture());
            }
        }
        self.snapshot.send_replace(self.capture());
    }

    fn capture(&self) -> EmitterSnapshot {
        EmitterSnapshot::capture(
            &self.listeners,
            &self.queue,
            self.ready,
            self.consumer.is_some(),
        )
    }

    /// Returns the consumer if an event named `name` can be delivered now.
    fn deliverable(&self, name: &str) -> Option<&Arc<dyn EventConsumer>> {
        if !self.ready || !self.listeners.has_listener(name) {
            return None;
        }
        self.consumer.as_ref().filter(|c| c.is_alive())
    }

    fn send(&mut self, event: Event) {
        if self.deliverable(event.name()).is_none() {
            self.enqueue(event);
            return;
        }

        // Older events of this name are still waiting after a failed
        // delivery; queue behind them so the name stays in order.
        if self.queue.contains_name(event.name()) {
            let name = event.name().to_string();
            self.enqueue(event);
            self.flush(Some(&name));
            return;
        }

        let result = self.deliverable(event.name()).map(|c| deliver(c, &event));
        if let Some(Err(reason)) = result {
            log_failure(&event, reason);
            self.enqueue(event);
        }
    }

    fn enqueue(&mut self, event: Event) {
        let name = event.name().to_string();
        let id = event.id();
        match self.queue.push(event) {
            Some(evicted) => tracing::warn!(
                event = evicted.name(),
                id = %evicted.id(),
                capacity = ?self.queue.capacity(),
                "pending queue full; evicted oldest event"
            ),
            None => tracing::trace!(event = %name, %id, queued = self.queue.len(), "event queued"),
        }
    }

    /// Retries queued events, optionally only those named `scope`.
    ///
    /// Works on a detached copy of the queue. Stops attempting deliveries
    /// after the first failure in the pass.
    fn flush(&mut self, scope: Option<&str>) {
        if self.queue.is_empty() {
            return;
        }
        let pending = self.queue.take();
        let mut kept = VecDeque::with_capacity(pending.len());
        let mut stalled = false;
        let mut delivered = 0_usize;

        for event in pending {
            let in_scope = scope.is_none_or(|s| s == event.name());
            if stalled || !in_scope {
                kept.push_back(event);
                continue;
            }
            let Some(consumer) = self.deliverable(event.name()) else {
                kept.push_back(event);
                continue;
            };
            match deliver(consumer, &event) {
                Ok(()) => delivered += 1,
                Err(reason) => {
                    log_failure(&event, reason);
                    stalled = true;
                    kept.push_back(event);
                }
            }
        }

        self.queue.restore(kept);
        if delivered > 0 {
            tracing::debug!(
                delivered,
                remaining = self.queue.len(),
                scope = scope.unwrap_or("*"),
                "flushed pending events"
            );
        }
    }
}

/// Calls the consumer, turning a panic into a [`DeliveryError`].
fn deliver(consumer: &Arc<dyn EventConsumer>, event: &Event) -> Result<(), DeliveryError> {
    match catch_unwind(AssertUnwindSafe(|| consumer.deliver(event))) {
        Ok(result) => result,
        Err(payload) => Err(DeliveryError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn log_failure(event: &Event, reason: DeliveryError) {
    let err = BridgeError::DeliveryFailed {
        event: event.name().to_string(),
        reason,
    };
    tracing::warn!(id = %event.id(), error = %err, "event delivery failed; keeping it queued");
}
