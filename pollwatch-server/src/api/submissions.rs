//! Submission and verification endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use pollwatch_common::models::{SubmissionKind, SubmissionView, Verification};
use serde::Deserialize;

use super::auth::{MaybeActor, RequireActor};
use crate::error::{ApiError, ApiResult};
use crate::pagination::Page;
use crate::services::submissions::{
    self, audience_for, SubmissionDetail, SubmissionPayload, SubmissionQuery,
    SubmissionStatistics,
};
use crate::services::verification::{self, VerificationOutcome, VerifyRequest};
use crate::services::parse_opt;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RespondRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub election: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationListQuery {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
}

/// POST /api/submissions/:kind
pub async fn create_submission(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    MaybeActor(actor): MaybeActor,
    Json(payload): Json<SubmissionPayload>,
) -> ApiResult<(StatusCode, Json<SubmissionView>)> {
    let kind: SubmissionKind = kind.parse()?;
    let submission = submissions::create_submission(
        &state.db,
        &state.broadcaster,
        kind,
        payload,
        actor.as_ref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(submission.view(audience_for(actor.as_ref()))),
    ))
}

/// GET /api/submissions/:kind
pub async fn list_submissions(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    MaybeActor(actor): MaybeActor,
    Query(query): Query<SubmissionQuery>,
) -> ApiResult<Json<Page<SubmissionView>>> {
    let kind: SubmissionKind = kind.parse()?;
    let page = submissions::list_submissions(
        &state.db,
        kind,
        &query,
        state.config.page_size,
        actor.as_ref(),
    )
    .await?;

    Ok(Json(page))
}

/// GET /api/submissions/:kind/:id
pub async fn get_submission(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    MaybeActor(actor): MaybeActor,
) -> ApiResult<Json<SubmissionDetail>> {
    let kind: SubmissionKind = kind.parse()?;
    let detail = submissions::get_submission(&state.db, kind, id, actor.as_ref()).await?;
    Ok(Json(detail))
}

/// POST /api/submissions/incident/:id/respond
pub async fn respond_to_incident(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    RequireActor(actor): RequireActor,
    Json(request): Json<RespondRequest>,
) -> ApiResult<Json<SubmissionView>> {
    if kind.parse::<SubmissionKind>()? != SubmissionKind::Incident {
        return Err(ApiError::validation("kind", "only incidents can be responded to"));
    }

    let incident = submissions::respond_to_incident(&state.db, id, &actor, request.notes).await?;
    Ok(Json(incident.view(audience_for(Some(&actor)))))
}

/// GET /api/statistics/:kind
pub async fn submission_statistics(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<Json<SubmissionStatistics>> {
    let kind: SubmissionKind = kind.parse()?;
    let stats = submissions::submission_statistics(&state.db, kind, query.election).await?;
    Ok(Json(stats))
}

/// POST /api/submissions/:kind/:id/verify
pub async fn verify_submission(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    RequireActor(actor): RequireActor,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<Json<VerificationOutcome>> {
    let kind: SubmissionKind = kind.parse()?;
    let outcome =
        verification::verify(&state.db, &state.broadcaster, kind, id, &actor, request).await?;
    Ok(Json(outcome))
}

/// GET /api/submissions/:kind/:id/verifications
pub async fn submission_verifications(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    MaybeActor(actor): MaybeActor,
) -> ApiResult<Json<Vec<Verification>>> {
    let kind: SubmissionKind = kind.parse()?;

    // Same visibility as the submission itself
    submissions::get_submission(&state.db, kind, id, actor.as_ref()).await?;
    let history = verification::history(&state.db, kind, id).await?;
    Ok(Json(history))
}

/// GET /api/verifications
pub async fn list_verifications(
    State(state): State<AppState>,
    RequireActor(actor): RequireActor,
    Query(query): Query<VerificationListQuery>,
) -> ApiResult<Json<Page<Verification>>> {
    let kind: Option<SubmissionKind> = parse_opt(query.kind.as_deref())?;
    let status = parse_opt(query.status.as_deref())?;

    let page = verification::list_verifications(
        &state.db,
        &actor,
        kind,
        status,
        query.page.unwrap_or(1),
        state.config.page_size,
    )
    .await?;
    Ok(Json(page))
}
