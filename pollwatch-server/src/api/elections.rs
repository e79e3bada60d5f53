//! Reference data (elections, polling stations) and user endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use pollwatch_common::models::{
    Actor, Election, ElectionType, Location, PollingStation, SubmissionView,
};
use serde::Deserialize;

use super::auth::{AdminActor, RequireActor};
use crate::db::elections;
use crate::error::{ApiError, ApiResult};
use crate::services::submissions::recent_station_updates;
use crate::services::users::{self, IssuedUser, NewUserRequest};
use crate::services::{non_blank, non_negative};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct NewElectionRequest {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub election_type: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ElectionQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewStationRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub constituency: Option<String>,
    pub county: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub registered_voters: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StationQuery {
    pub constituency: Option<String>,
}

/// POST /api/elections
pub async fn create_election(
    State(state): State<AppState>,
    AdminActor(_admin): AdminActor,
    Json(request): Json<NewElectionRequest>,
) -> ApiResult<(StatusCode, Json<Election>)> {
    let name = non_blank(request.name).ok_or_else(|| ApiError::validation("name", "required"))?;
    let date = request
        .date
        .ok_or_else(|| ApiError::validation("date", "required (YYYY-MM-DD)"))?;
    let election_type: ElectionType = request
        .election_type
        .as_deref()
        .unwrap_or("general")
        .parse()?;

    let election = elections::insert_election(
        &state.db,
        &name,
        date,
        election_type,
        &request.description.unwrap_or_default(),
        request.is_active.unwrap_or(true),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(election)))
}

/// GET /api/elections
pub async fn list_elections(
    State(state): State<AppState>,
    Query(query): Query<ElectionQuery>,
) -> ApiResult<Json<Vec<Election>>> {
    let list = elections::list_elections(&state.db, query.active.unwrap_or(false)).await?;
    Ok(Json(list))
}

/// GET /api/elections/:id
pub async fn get_election(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Election>> {
    elections::get_election(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Election {} not found", id)))
}

/// GET /api/elections/:id/live - station updates inside the live window
pub async fn live_station_updates(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<SubmissionView>>> {
    if elections::get_election(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Election {} not found", id)));
    }

    let updates = recent_station_updates(&state.db, id, state.config.live_window_minutes).await?;
    Ok(Json(updates))
}

/// POST /api/polling-stations
pub async fn create_station(
    State(state): State<AppState>,
    AdminActor(_admin): AdminActor,
    Json(request): Json<NewStationRequest>,
) -> ApiResult<(StatusCode, Json<PollingStation>)> {
    let name = non_blank(request.name).ok_or_else(|| ApiError::validation("name", "required"))?;
    let code = non_blank(request.code).ok_or_else(|| ApiError::validation("code", "required"))?;
    let location = Location::from_parts(request.latitude, request.longitude)?;
    let registered_voters = non_negative("registered_voters", request.registered_voters)?.unwrap_or(0);

    let station = elections::insert_station(
        &state.db,
        &name,
        &code,
        &request.constituency.unwrap_or_default(),
        &request.county.unwrap_or_default(),
        location,
        registered_voters,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(station)))
}

/// GET /api/polling-stations
pub async fn list_stations(
    State(state): State<AppState>,
    Query(query): Query<StationQuery>,
) -> ApiResult<Json<Vec<PollingStation>>> {
    let list = elections::list_stations(&state.db, query.constituency.as_deref()).await?;
    Ok(Json(list))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    AdminActor(admin): AdminActor,
    Json(request): Json<NewUserRequest>,
) -> ApiResult<(StatusCode, Json<IssuedUser>)> {
    let issued = users::create_user(&state.db, request, &admin).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// GET /api/me
pub async fn current_actor(RequireActor(actor): RequireActor) -> Json<Actor> {
    Json(actor)
}
