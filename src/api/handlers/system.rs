//! Health endpoint reporting emitter and executor liveness.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the emitter coordinator has stopped.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Server time.
    pub timestamp: DateTime<Utc>,
    /// Whether the coordinator thread answered.
    pub coordinator_running: bool,
    /// Whether the runtime consumer is attached and ready.
    pub consumer_ready: bool,
    /// Events waiting for delivery.
    pub queued_events: usize,
    /// Registered executor pools.
    pub executors: usize,
}

/// `GET /health`: Emitter and executor liveness.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Round-trips a barrier through the emitter coordinator and reports consumer readiness, queue depth and executor count. Responds 503 when the coordinator thread is gone.",
    responses(
        (status = 200, description = "Bridge is healthy", body = HealthResponse),
        (status = 503, description = "Emitter coordinator stopped", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.emitter.sync().await.ok();
    let coordinator_running = snapshot.is_some();
    let snapshot = snapshot.unwrap_or_default();

    let (code, status) = if coordinator_running {
        (StatusCode::OK, "healthy")
    } else {
        tracing::warn!("health check: event coordinator stopped");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
            coordinator_running,
            consumer_ready: snapshot.consumer_attached && snapshot.ready,
            queued_events: snapshot.queued,
            executors: state.executors.len(),
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
