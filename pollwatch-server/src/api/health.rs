//! Health check and realtime statistics endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// Connection counts of the realtime broadcaster
#[derive(Debug, Serialize)]
pub struct RealtimeStats {
    pub clients: usize,
    pub subscriptions: usize,
}

/// GET /health
///
/// Does not require authentication.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "pollwatch-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/realtime/stats
pub async fn realtime_stats(State(state): State<AppState>) -> Json<RealtimeStats> {
    Json(RealtimeStats {
        clients: state.broadcaster.client_count(),
        subscriptions: state.broadcaster.subscription_count(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/realtime/stats", get(realtime_stats))
}
