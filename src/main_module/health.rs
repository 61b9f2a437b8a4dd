//! Health check handler

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use log::warn;
use std::sync::Arc;

use crate::shared::state::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let store_ok = match state.repos.health.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check: store unreachable: {e}");
            false
        }
    };

    let status = if store_ok { "healthy" } else { "degraded" };
    let code = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "service": "prepserver",
            "version": env!("CARGO_PKG_VERSION"),
            "database": store_ok
        })),
    )
}
