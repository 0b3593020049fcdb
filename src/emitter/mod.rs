//! Ordered event delivery from many producer threads to one consumer.
//!
//! [`EventEmitter`] is a cheap cloneable handle. Every call is marshalled
//! onto a single coordinator thread which owns the listener registry, the
//! pending queue and the consumer state:
//!
//! ```text
//! producer threads ──send()──┐
//! runtime ──add_listener()───┼──► command channel ──► coordinator thread
//! runtime ──set_ready()──────┘                           │
//!                                   ┌────────────────────┤
//!                                   ▼                    ▼
//!                             PendingQueue        EventConsumer::deliver
//! ```
//!
//! Calls return immediately. Commands from one thread are applied in call
//! order; commands from different threads are each applied exactly once,
//! in channel order.

mod consumer;
mod coordinator;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};

pub use consumer::{ChannelConsumer, EventConsumer};
pub use coordinator::COORDINATOR_THREAD_NAME;

use crate::domain::{EmitterSnapshot, Event};
use crate::error::BridgeError;
use coordinator::{Command, Coordinator};

/// Handle to the process-wide event emitter.
///
/// Construct one with [`EventEmitter::spawn`] in the composition root and
/// clone it into every feature module. The coordinator thread stops once
/// the last handle is dropped.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<EmitterSnapshot>,
}

impl EventEmitter {
    /// Starts the coordinator thread.
    ///
    /// `queue_capacity` bounds the pending queue; `None` or `Some(0)` leaves
    /// it unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ThreadSpawn`] if the OS refuses to start the
    /// coordinator thread.
    pub fn spawn(queue_capacity: Option<usize>) -> Result<Self, BridgeError> {
        let (commands, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(EmitterSnapshot::default());
        let coordinator = Coordinator::new(queue_capacity, snapshot_tx);

        std::thread::Builder::new()
            .name(COORDINATOR_THREAD_NAME.to_string())
            .spawn(move || coordinator.run(rx))
            .map_err(|e| BridgeError::ThreadSpawn {
                name: COORDINATOR_THREAD_NAME.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(capacity = ?queue_capacity, "event emitter started");
        Ok(Self { commands, snapshot })
    }

    /// Replaces the consumer and retries every queued event.
    ///
    /// Listener counts and queued events survive across reattachment.
    pub fn attach_consumer(&self, consumer: Arc<dyn EventConsumer>) {
        self.submit(Command::Attach(consumer));
    }

    /// Drops the consumer reference; events queue until the next attach.
    pub fn detach_consumer(&self) {
        self.submit(Command::Detach);
    }

    /// Sets consumer readiness. `true` retries every queued event.
    pub fn set_ready(&self, ready: bool) {
        self.submit(Command::SetReady(ready));
    }

    /// Adds a subscription for `name` and delivers its backlog.
    pub fn add_listener(&self, name: impl Into<String>) {
        self.submit(Command::AddListener(name.into()));
    }

    /// Removes one subscription for `name`, or all of them when `all` is set.
    pub fn remove_listener(&self, name: impl Into<String>, all: bool) {
        self.submit(Command::RemoveListener {
            name: name.into(),
            all,
        });
    }

    /// Delivers `event` now if possible, otherwise queues it.
    pub fn send(&self, event: Event) {
        self.submit(Command::Send(event));
    }

    /// Sends an event built from `name` and `body` and returns the body.
    ///
    /// Used by the runtime's test harness to round-trip an event through
    /// the emitter.
    pub fn ping(&self, name: impl Into<String>, body: Value) -> Value {
        self.send(Event::new(name, body.clone()));
        body
    }

    /// Returns the last state published by the coordinator.
    ///
    /// Safe to call from any thread. Commands still in flight are not
    /// reflected; use [`EventEmitter::sync`] to wait for them.
    #[must_use]
    pub fn snapshot(&self) -> EmitterSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Waits until every command submitted before this call is applied and
    /// returns the state at that point.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::CoordinatorStopped`] if the coordinator thread
    /// has exited.
    pub async fn sync(&self) -> Result<EmitterSnapshot, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Sync(tx))
            .map_err(|_| BridgeError::CoordinatorStopped)?;
        rx.await.map_err(|_| BridgeError::CoordinatorStopped)
    }

    fn submit(&self, command: Command) {
        if let Err(mpsc::error::SendError(command)) = self.commands.send(command) {
            tracing::warn!(command = command.kind(), "event coordinator stopped; command dropped");
        }
    }
}
