//! bridge-core diagnostics server entry point.
//!
//! Starts the event emitter and executor registry, attaches a logging
//! consumer, and serves the diagnostics API.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bridge_core::api;
use bridge_core::app_state::AppState;
use bridge_core::config::BridgeConfig;
use bridge_core::emitter::ChannelConsumer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = BridgeConfig::from_env().context("loading configuration")?;
    tracing::info!(addr = %config.listen_addr, "starting bridge-core");

    // Build the core
    let app_state = AppState::from_config(&config).context("starting event emitter")?;

    // Attach a consumer that logs every delivered envelope
    let (consumer, mut deliveries) = ChannelConsumer::new();
    app_state.emitter.attach_consumer(Arc::new(consumer));
    app_state.emitter.set_ready(true);
    tokio::spawn(async move {
        while let Some(event) = deliveries.recv().await {
            tracing::info!(envelope = %event.envelope(), "event delivered");
        }
    });

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    app_state.emitter.detach_consumer();
    let mut removed = 0_usize;
    for stats in app_state.executors.stats() {
        if app_state.executors.remove_executor(&stats.name) {
            removed += 1;
        }
    }
    tracing::info!(executors = removed, "shutdown complete");

    Ok(())
}
