//! pollwatch-server library
//!
//! Election-monitoring backend: observers and citizens submit station
//! updates and incident reports, trusted reviewers verify them, and every
//! change is pushed to realtime subscribers over WebSocket or SSE. Media
//! assets and live-stream sessions are tracked alongside.

use std::sync::Arc;

use axum::Router;
use pollwatch_common::config::ServerConfig;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod broadcaster;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

use broadcaster::Broadcaster;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Realtime fan-out, one per server
    pub broadcaster: Broadcaster,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ServerConfig) -> Self {
        Self {
            db,
            broadcaster: Broadcaster::new(config.client_buffer),
            config: Arc::new(config),
        }
    }
}

/// Build application router
///
/// Authentication is resolved per handler through the extractors in
/// [`api::auth`]; read endpoints accept anonymous callers.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let submissions = Router::new()
        .route(
            "/api/submissions/:kind",
            get(api::submissions::list_submissions).post(api::submissions::create_submission),
        )
        .route("/api/submissions/:kind/:id", get(api::submissions::get_submission))
        .route(
            "/api/submissions/:kind/:id/verify",
            post(api::submissions::verify_submission),
        )
        .route(
            "/api/submissions/:kind/:id/verifications",
            get(api::submissions::submission_verifications),
        )
        .route(
            "/api/submissions/:kind/:id/respond",
            post(api::submissions::respond_to_incident),
        )
        .route("/api/statistics/:kind", get(api::submissions::submission_statistics))
        .route("/api/verifications", get(api::submissions::list_verifications));

    let media = Router::new()
        .route(
            "/api/media",
            get(api::media::list_media).post(api::media::register_media),
        )
        .route("/api/media/:id", get(api::media::get_media))
        .route("/api/media/:id/moderate", post(api::media::moderate_media))
        .route(
            "/api/livestreams",
            get(api::media::list_streams).post(api::media::create_stream),
        )
        .route("/api/livestreams/active", get(api::media::active_streams))
        .route("/api/livestreams/statistics", get(api::media::stream_statistics))
        .route("/api/livestreams/:id", get(api::media::get_stream))
        .route("/api/livestreams/:id/start", post(api::media::start_stream))
        .route("/api/livestreams/:id/pause", post(api::media::pause_stream))
        .route("/api/livestreams/:id/end", post(api::media::end_stream))
        .route("/api/livestreams/:id/heartbeat", post(api::media::stream_heartbeat));

    let reference = Router::new()
        .route(
            "/api/elections",
            get(api::elections::list_elections).post(api::elections::create_election),
        )
        .route("/api/elections/:id", get(api::elections::get_election))
        .route("/api/elections/:id/live", get(api::elections::live_station_updates))
        .route(
            "/api/polling-stations",
            get(api::elections::list_stations).post(api::elections::create_station),
        )
        .route("/api/users", post(api::elections::create_user))
        .route("/api/me", get(api::elections::current_actor));

    let realtime = Router::new()
        .route("/ws/live-updates", get(api::ws::live_updates))
        .route("/ws/elections/:id", get(api::ws::election_updates))
        .route("/ws/incidents", get(api::ws::incident_updates))
        .route("/api/events", get(api::event_stream));

    Router::new()
        .merge(submissions)
        .merge(media)
        .merge(reference)
        .merge(realtime)
        .route("/api/build_info", get(api::get_build_info))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
