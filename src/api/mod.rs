//! Diagnostics REST API: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; the OpenAPI document is
//! served at `/api-docs/openapi.json`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI description of the diagnostics surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "bridge-core diagnostics"),
    paths(
        handlers::system::health_handler,
        handlers::events::get_snapshot,
        handlers::events::ping,
        handlers::executors::list_executors,
        handlers::executors::remove_executor,
    ),
    components(schemas(
        handlers::system::HealthResponse,
        dto::EmitterSnapshotDto,
        dto::PingRequest,
        dto::PingResponse,
        dto::ExecutorStatsDto,
        dto::ExecutorListResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Events", description = "Event emitter state"),
        (name = "Executors", description = "Executor pools"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(docs_router())
}

#[cfg(feature = "swagger-ui")]
fn docs_router() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()),
    )
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_router() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}
