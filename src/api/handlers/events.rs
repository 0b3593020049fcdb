//! Emitter endpoints: snapshot and ping.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{EmitterSnapshotDto, PingRequest, PingResponse};
use crate::app_state::AppState;
use crate::error::{BridgeError, ErrorResponse};

/// `GET /events`: Current listener counts and queue depth.
///
/// # Errors
///
/// Returns [`BridgeError::CoordinatorStopped`] if the emitter thread exited.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Emitter snapshot",
    description = "Waits for every previously submitted emitter command to apply, then returns listener counts per event name, the pending queue depth and consumer state.",
    responses(
        (status = 200, description = "Emitter state", body = EmitterSnapshotDto),
        (status = 500, description = "Coordinator stopped", body = ErrorResponse),
    )
)]
pub async fn get_snapshot(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, BridgeError> {
    let snapshot = state.emitter.sync().await?;
    Ok(Json(EmitterSnapshotDto::from(snapshot)))
}

/// `POST /events/ping`: Send a test event and echo its body.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidRequest`] when `event_name` is blank.
#[utoipa::path(
    post,
    path = "/api/v1/events/ping",
    tag = "Events",
    summary = "Ping the emitter",
    description = "Sends an event with the given name and body through the emitter. The event is delivered or queued like any other.",
    request_body = PingRequest,
    responses(
        (status = 202, description = "Event submitted", body = PingResponse),
        (status = 400, description = "Blank event name", body = ErrorResponse),
    )
)]
pub async fn ping(
    State(state): State<AppState>,
    Json(req): Json<PingRequest>,
) -> Result<impl IntoResponse, BridgeError> {
    if req.event_name.trim().is_empty() {
        return Err(BridgeError::InvalidRequest(
            "event_name must not be empty".to_string(),
        ));
    }
    let body = state.emitter.ping(req.event_name.clone(), req.body);
    tracing::debug!(event = %req.event_name, "ping submitted");
    Ok((
        StatusCode::ACCEPTED,
        Json(PingResponse {
            event_name: req.event_name,
            body,
        }),
    ))
}

/// Emitter routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(get_snapshot))
        .route("/events/ping", post(ping))
}
