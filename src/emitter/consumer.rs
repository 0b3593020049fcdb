//! The consumer side of the emitter.
//!
//! The embedding runtime implements [`EventConsumer`]; the emitter calls it
//! from the coordinator thread only.

use std::fmt;

use tokio::sync::mpsc;

use crate::domain::Event;
use crate::error::DeliveryError;

/// Event sink supplied by the embedding runtime.
///
/// `deliver` runs on the coordinator thread and should return quickly:
/// every other emitter operation waits behind it.
pub trait EventConsumer: Send + Sync + fmt::Debug {
    /// Hands one event to the runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if the runtime could not take the event.
    /// The emitter keeps the event queued and retries it on the next
    /// listener, readiness or consumer change.
    fn deliver(&self, event: &Event) -> Result<(), DeliveryError>;

    /// Returns `false` once the runtime behind this consumer is torn down.
    fn is_alive(&self) -> bool {
        true
    }
}

/// Consumer that forwards delivered events into a tokio channel.
///
/// Lets an async runtime loop receive events with `recv().await`. The
/// consumer reports itself dead as soon as the receiver is dropped.
#[derive(Debug, Clone)]
pub struct ChannelConsumer {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelConsumer {
    /// Creates a consumer and the receiver that will observe its events.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventConsumer for ChannelConsumer {
    fn deliver(&self, event: &Event) -> Result<(), DeliveryError> {
        self.tx
            .send(event.clone())
            .map_err(|_| DeliveryError::ConsumerGone)
    }

    fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn channel_consumer_forwards_events() {
        let (consumer, mut rx) = ChannelConsumer::new();
        assert!(consumer.is_alive());
        let event = Event::new("tok", json!("abc"));
        assert!(consumer.deliver(&event).is_ok());

        let Some(received) = rx.recv().await else {
            panic!("expected an event");
        };
        assert_eq!(received.id(), event.id());
    }

    #[test]
    fn channel_consumer_dies_with_receiver() {
        let (consumer, rx) = ChannelConsumer::new();
        drop(rx);
        assert!(!consumer.is_alive());
        let result = consumer.deliver(&Event::new("tok", json!(null)));
        assert_eq!(result, Err(DeliveryError::ConsumerGone));
    }
}
