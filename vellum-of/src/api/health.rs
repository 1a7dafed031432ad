//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// `sqlite` when orders persist, `degraded` when running without a store
    pub store_mode: String,
}

/// GET /health
///
/// Liveness plus the store mode, so operators can tell a fully functional
/// instance from one running degraded without persistence.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    let store_mode = if state.store.is_degraded() {
        "degraded"
    } else {
        "sqlite"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "vellum-of".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        store_mode: store_mode.to_string(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
