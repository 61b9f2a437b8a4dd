//! HTTP server initialization and routing

use axum::{routing::get, Router};
use log::{error, info};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api_router::configure_api_routes;
use crate::config::ServerConfig;
use crate::security::{create_cors_layer, request_id_middleware};
use crate::shared::state::AppState;

use super::{health_check, shutdown_signal};

/// The full application: API routes, health check and the middleware stack.
/// Dropping a timed-out request drops its pending store futures with it.
pub fn build_router(app_state: Arc<AppState>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(configure_api_routes())
        .with_state(app_state)
        // last added runs first
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(create_cors_layer(config.cors_allowed_origins.clone()))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_axum_server(
    app_state: Arc<AppState>,
    config: &ServerConfig,
    addr: &str,
) -> std::io::Result<()> {
    let app = build_router(app_state, config);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(
                "Failed to bind to {}: {} - is another instance running?",
                addr, e
            );
            return Err(e);
        }
    };
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}
