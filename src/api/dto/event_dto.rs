//! Emitter DTOs: snapshot and ping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::EmitterSnapshot;

/// Response body for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EmitterSnapshotDto {
    /// Total active subscriptions.
    pub listeners: usize,
    /// Events waiting for a listener or a ready consumer.
    pub queued: usize,
    /// Active subscriptions per event name.
    pub events: BTreeMap<String, usize>,
    /// Consumer readiness flag.
    pub ready: bool,
    /// Whether a consumer is attached.
    pub consumer_attached: bool,
    /// Events evicted from a full pending queue.
    pub evicted: u64,
}

impl From<EmitterSnapshot> for EmitterSnapshotDto {
    fn from(s: EmitterSnapshot) -> Self {
        Self {
            listeners: s.listeners,
            queued: s.queued,
            events: s.events,
            ready: s.ready,
            consumer_attached: s.consumer_attached,
            evicted: s.evicted,
        }
    }
}

/// Request body for `POST /events/ping`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PingRequest {
    /// Event name to send.
    pub event_name: String,
    /// Arbitrary JSON payload.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub body: Value,
}

/// Response body for `POST /events/ping` (202 Accepted).
#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    /// Event name echoed from the request.
    pub event_name: String,
    /// Payload echoed from the request.
    #[schema(value_type = Object)]
    pub body: Value,
}
