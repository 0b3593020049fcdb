//! Domain layer: events and the coordinator-owned event bookkeeping.
//!
//! This module contains the immutable [`Event`] value, the ref-counted
//! [`ListenerRegistry`], the [`PendingQueue`] of undelivered events, and
//! the [`EmitterSnapshot`] diagnostics view built from both.

pub mod event;
pub mod listener_registry;
pub mod pending_queue;
pub mod snapshot;

pub use event::Event;
pub use listener_registry::ListenerRegistry;
pub use pending_queue::PendingQueue;
pub use snapshot::EmitterSnapshot;
