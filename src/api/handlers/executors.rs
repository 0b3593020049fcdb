//! Executor endpoints: list and remove.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::api::dto::{ExecutorListResponse, ExecutorStatsDto};
use crate::app_state::AppState;
use crate::error::{BridgeError, ErrorResponse};
use crate::executor::ExecutorName;

/// `GET /executors`: Counters of every registered pool.
#[utoipa::path(
    get,
    path = "/api/v1/executors",
    tag = "Executors",
    summary = "List executors",
    description = "Returns worker, queue and rejection counters for every registered executor pool, ordered by name.",
    responses(
        (status = 200, description = "Executor list", body = ExecutorListResponse),
    )
)]
pub async fn list_executors(State(state): State<AppState>) -> impl IntoResponse {
    let data: Vec<ExecutorStatsDto> = state
        .executors
        .stats()
        .into_iter()
        .map(ExecutorStatsDto::from)
        .collect();
    let total = data.len();
    Json(ExecutorListResponse { data, total })
}

/// `DELETE /executors/{name}`: Shut down and unregister a pool.
///
/// # Errors
///
/// Returns [`BridgeError::ExecutorNotFound`] if no pool has that name.
#[utoipa::path(
    delete,
    path = "/api/v1/executors/{name}",
    tag = "Executors",
    summary = "Remove executor",
    description = "Shuts the named pool down. Queued tasks are discarded; a running task finishes. The next request for the name creates a fresh pool.",
    params(
        ("name" = String, Path, description = "Registry name, e.g. StorageExecutor"),
    ),
    responses(
        (status = 204, description = "Executor removed"),
        (status = 404, description = "Executor not found", body = ErrorResponse),
    )
)]
pub async fn remove_executor(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, BridgeError> {
    let name = ExecutorName::from_raw(name);
    if !state.executors.remove_executor(&name) {
        return Err(BridgeError::ExecutorNotFound(name.to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Executor routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/executors", get(list_executors))
        .route("/executors/{name}", delete(remove_executor))
}
