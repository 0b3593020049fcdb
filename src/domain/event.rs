//! Events produced by native callbacks and delivered to the consumer.
//!
//! An [`Event`] is immutable once built. Producers construct one on
//! whatever thread their SDK callback arrives on and hand it to
//! [`crate::emitter::EventEmitter::send`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// A named event with an opaque structured body.
///
/// `scope_key` carries the SDK app instance name the event belongs to,
/// when the producing module is app-scoped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    id: Uuid,
    name: String,
    body: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl Event {
    /// Creates an unscoped event.
    #[must_use]
    pub fn new(name: impl Into<String>, body: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            body,
            scope_key: None,
            created_at: Utc::now(),
        }
    }

    /// Creates an event scoped to the given app instance.
    #[must_use]
    pub fn scoped(name: impl Into<String>, body: Value, scope_key: impl Into<String>) -> Self {
        Self {
            scope_key: Some(scope_key.into()),
            ..Self::new(name, body)
        }
    }

    /// Unique id of this occurrence.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Event name listeners subscribe to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event payload.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// App instance the event is scoped to, if any.
    #[must_use]
    pub fn scope_key(&self) -> Option<&str> {
        self.scope_key.as_deref()
    }

    /// Time the producer built the event.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Renders the shape the scripting side expects:
    /// `{"eventName": .., "body": .., "appName": ..}`.
    ///
    /// `appName` is omitted for unscoped events.
    #[must_use]
    pub fn envelope(&self) -> Value {
        let mut map = Map::with_capacity(3);
        map.insert("eventName".to_string(), Value::String(self.name.clone()));
        map.insert("body".to_string(), self.body.clone());
        if let Some(scope) = &self.scope_key {
            map.insert("appName".to_string(), Value::String(scope.clone()));
        }
        Value::Object(map)
    }
}
