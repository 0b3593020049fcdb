//! Error types for the bridge core and the diagnostics API.
//!
//! [`BridgeError`] is the central error type. Most of its variants are
//! never returned to producers: they describe conditions the core recovers
//! from on its own and are surfaced through logs. Only the diagnostics
//! surface converts them into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "executor not found: StorageExecutor"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Bridge error taxonomy.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
/// | 3000–3999 | Internal        | 500 Internal Server Error |
/// | 4000–4999 | Delivery/Pools  | 503 Service Unavailable   |
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// An event could not be handed to the consumer. The event stays queued.
    #[error("delivery of `{event}` failed: {reason}")]
    DeliveryFailed {
        /// Name of the event whose delivery failed.
        event: String,
        /// Why the consumer refused or failed the delivery.
        reason: DeliveryError,
    },

    /// A bounded pool had no idle worker and no room to grow.
    #[error("executor {executor} rejected work")]
    ExecutorRejected {
        /// Name of the rejecting executor.
        executor: String,
    },

    /// No pool configuration exists for the service; defaults were applied.
    #[error("no executor configuration for service {service}")]
    ConfigurationMissing {
        /// Service whose configuration was missing.
        service: String,
    },

    /// Executor with the given name is not registered.
    #[error("executor not found: {0}")]
    ExecutorNotFound(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The event coordinator thread is no longer running.
    #[error("event coordinator stopped")]
    CoordinatorStopped,

    /// Environment configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The OS refused to start a coordinator or worker thread.
    #[error("failed to spawn thread {name}: {reason}")]
    ThreadSpawn {
        /// Name of the thread that failed to start.
        name: String,
        /// OS error message.
        reason: String,
    },
}

impl BridgeError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Config(_) => 1002,
            Self::ExecutorNotFound(_) => 2001,
            Self::ConfigurationMissing { .. } => 2002,
            Self::CoordinatorStopped => 3001,
            Self::ThreadSpawn { .. } => 3002,
            Self::DeliveryFailed { .. } => 4001,
            Self::ExecutorRejected { .. } => 4002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Config(_) => StatusCode::BAD_REQUEST,
            Self::ExecutorNotFound(_) | Self::ConfigurationMissing { .. } => StatusCode::NOT_FOUND,
            Self::CoordinatorStopped | Self::ThreadSpawn { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::DeliveryFailed { .. } | Self::ExecutorRejected { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Error returned by an [`crate::emitter::EventConsumer`] when it cannot
/// take an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The consumer runtime has been torn down.
    #[error("consumer is gone")]
    ConsumerGone,

    /// The underlying transport to the runtime failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The consumer panicked while handling the event.
    #[error("consumer panicked: {0}")]
    Panicked(String),
}

/// Error returned by a [`crate::executor::TaskHandle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The task was dropped without running: its pool and the fallback pool
    /// were both unavailable.
    #[error("task rejected by {0}")]
    Rejected(String),

    /// The pool was shut down before the task ran.
    #[error("task cancelled")]
    Cancelled,

    /// The task panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Renders a panic payload for logs and error values.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
