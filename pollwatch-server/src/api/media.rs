//! Media and live-stream endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use pollwatch_common::models::{Actor, LiveStreamSession, MediaAsset};

use super::auth::{AdminActor, MaybeActor, RequireActor};
use crate::error::ApiResult;
use crate::pagination::Page;
use crate::services::media::{self, MediaPayload, MediaQuery, ModerationRequest};
use crate::services::streams::{
    self, view_for, CreatedStream, HeartbeatRequest, StreamPayload, StreamQuery,
    StreamStatistics, StreamView,
};
use crate::AppState;

/// POST /api/media
pub async fn register_media(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Json(payload): Json<MediaPayload>,
) -> ApiResult<(StatusCode, Json<MediaAsset>)> {
    let asset = media::register_media(&state.db, payload, actor.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// GET /api/media
pub async fn list_media(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Query(query): Query<MediaQuery>,
) -> ApiResult<Json<Page<MediaAsset>>> {
    let page = media::list_media(&state.db, &query, state.config.page_size, actor.as_ref()).await?;
    Ok(Json(page))
}

/// GET /api/media/:id
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    MaybeActor(actor): MaybeActor,
) -> ApiResult<Json<MediaAsset>> {
    Ok(Json(media::get_media(&state.db, id, actor.as_ref()).await?))
}

/// POST /api/media/:id/moderate
pub async fn moderate_media(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    AdminActor(actor): AdminActor,
    Json(request): Json<ModerationRequest>,
) -> ApiResult<Json<MediaAsset>> {
    Ok(Json(media::moderate_media(&state.db, id, &actor, request).await?))
}

/// POST /api/livestreams
pub async fn create_stream(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Json(payload): Json<StreamPayload>,
) -> ApiResult<(StatusCode, Json<CreatedStream>)> {
    let session = streams::create_stream(&state.db, payload, &actor).await?;
    let stream_key = session.stream_key.clone();

    Ok((
        StatusCode::CREATED,
        Json(CreatedStream {
            view: view_for(session, Some(&actor), state.config.stream_stale_after_secs),
            stream_key,
        }),
    ))
}

/// GET /api/livestreams
pub async fn list_streams(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Json<Vec<StreamView>>> {
    let sessions = streams::list_streams(&state.db, &query, state.config.page_size).await?;
    Ok(Json(views(&state, sessions, actor.as_ref())))
}

/// GET /api/livestreams/active
pub async fn active_streams(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
) -> ApiResult<Json<Vec<StreamView>>> {
    let sessions = streams::active_streams(&state.db, state.config.page_size).await?;
    Ok(Json(views(&state, sessions, actor.as_ref())))
}

/// GET /api/livestreams/statistics
pub async fn stream_statistics(State(state): State<AppState>) -> ApiResult<Json<StreamStatistics>> {
    Ok(Json(streams::stream_statistics(&state.db).await?))
}

/// GET /api/livestreams/:id
pub async fn get_stream(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    MaybeActor(actor): MaybeActor,
) -> ApiResult<Json<StreamView>> {
    let session = streams::get_stream(&state.db, id).await?;
    Ok(Json(view_for(
        session,
        actor.as_ref(),
        state.config.stream_stale_after_secs,
    )))
}

/// POST /api/livestreams/:id/start
pub async fn start_stream(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    RequireActor(actor): RequireActor,
) -> ApiResult<Json<StreamView>> {
    let session = streams::start_stream(&state.db, id, &actor).await?;
    Ok(Json(view_for(session, Some(&actor), state.config.stream_stale_after_secs)))
}

/// POST /api/livestreams/:id/pause
pub async fn pause_stream(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    RequireActor(actor): RequireActor,
) -> ApiResult<Json<StreamView>> {
    let session = streams::pause_stream(&state.db, id, &actor).await?;
    Ok(Json(view_for(session, Some(&actor), state.config.stream_stale_after_secs)))
}

/// POST /api/livestreams/:id/end
pub async fn end_stream(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    RequireActor(actor): RequireActor,
) -> ApiResult<Json<StreamView>> {
    let session = streams::end_stream(&state.db, id, &actor).await?;
    Ok(Json(view_for(session, Some(&actor), state.config.stream_stale_after_secs)))
}

/// POST /api/livestreams/:id/heartbeat
pub async fn stream_heartbeat(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    MaybeActor(actor): MaybeActor,
    Json(request): Json<HeartbeatRequest>,
) -> ApiResult<Json<StreamView>> {
    let session = streams::heartbeat(&state.db, id, request).await?;
    Ok(Json(view_for(
        session,
        actor.as_ref(),
        state.config.stream_stale_after_secs,
    )))
}

fn views(
    state: &AppState,
    sessions: Vec<LiveStreamSession>,
    actor: Option<&Actor>,
) -> Vec<StreamView> {
    sessions
        .into_iter()
        .map(|s| view_for(s, actor, state.config.stream_stale_after_secs))
        .collect()
}
