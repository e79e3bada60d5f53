//! Media registry: metadata for externally stored evidence files

use chrono::{DateTime, Utc};
use pollwatch_common::models::{
    Actor, Audience, Location, MediaAsset, MediaType, SubmissionKind, SubmissionRef,
};
use pollwatch_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use super::{non_blank, non_negative, parse_opt};
use super::submissions::audience_for;
use crate::db::media::{self as store, MediaFilter, NewMedia};
use crate::db::submissions;
use crate::pagination::{calculate_pagination, Page};

#[derive(Debug, Default, Deserialize)]
pub struct MediaPayload {
    pub file_ref: Option<String>,
    pub media_type: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub submission_kind: Option<String>,
    pub submission_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub captured_at: Option<DateTime<Utc>>,
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaQuery {
    pub media_type: Option<String>,
    pub submission_kind: Option<String>,
    pub submission_id: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModerationRequest {
    pub approved: Option<bool>,
    pub notes: Option<String>,
}

fn submission_ref(kind: Option<&str>, id: Option<i64>) -> Result<Option<SubmissionRef>> {
    match (kind, id) {
        (None, None) => Ok(None),
        (Some(kind), Some(id)) => Ok(Some(SubmissionRef {
            kind: kind.parse::<SubmissionKind>()?,
            id,
        })),
        (Some(_), None) => Err(Error::validation(
            "submission_id",
            "required when submission_kind is given",
        )),
        (None, Some(_)) => Err(Error::validation(
            "submission_kind",
            "required when submission_id is given",
        )),
    }
}

/// Register an externally stored media file
pub async fn register_media(
    pool: &SqlitePool,
    payload: MediaPayload,
    actor: Option<&Actor>,
) -> Result<MediaAsset> {
    let file_ref = non_blank(payload.file_ref)
        .ok_or_else(|| Error::validation("file_ref", "required"))?;
    let media_type: MediaType = payload
        .media_type
        .as_deref()
        .ok_or_else(|| Error::validation("media_type", "required"))?
        .parse()?;
    let file_size = non_negative("file_size", payload.file_size)?;
    let location = Location::from_parts(payload.latitude, payload.longitude)?;

    let submission = submission_ref(payload.submission_kind.as_deref(), payload.submission_id)?;
    if let Some(s) = submission {
        if !submissions::submission_exists(pool, s.kind, s.id).await? {
            return Err(Error::NotFound(format!("{} {} not found", s.kind, s.id)));
        }
    }

    let is_anonymous = match actor {
        None => true,
        Some(_) => payload.is_anonymous.unwrap_or(false),
    };

    let new = NewMedia {
        file_ref,
        media_type,
        file_name: payload.file_name.unwrap_or_default(),
        mime_type: payload.mime_type.unwrap_or_default(),
        file_size,
        submission,
        location,
        captured_at: payload.captured_at,
        uploaded_by: actor.map(|a| a.id),
        is_anonymous,
    };

    let id = store::insert_media(pool, &new).await?;
    info!("Registered {} media {} ({})", media_type.as_str(), id, new.file_ref);

    store::get_media(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("media {} vanished after insert", id)))
}

/// One media asset; unapproved assets are hidden from non-administrators
pub async fn get_media(pool: &SqlitePool, id: i64, viewer: Option<&Actor>) -> Result<MediaAsset> {
    let audience = audience_for(viewer);
    let not_found = || Error::NotFound(format!("media {} not found", id));

    let asset = store::get_media(pool, id).await?.ok_or_else(not_found)?;
    if audience == Audience::Public && !asset.is_approved {
        return Err(not_found());
    }

    Ok(asset.for_audience(audience))
}

pub async fn list_media(
    pool: &SqlitePool,
    query: &MediaQuery,
    page_size: i64,
    viewer: Option<&Actor>,
) -> Result<Page<MediaAsset>> {
    let audience = audience_for(viewer);
    let filter = MediaFilter {
        media_type: parse_opt(query.media_type.as_deref())?,
        submission: submission_ref(query.submission_kind.as_deref(), query.submission_id)?,
        approved_only: audience == Audience::Public,
    };

    let total = store::count_media(pool, &filter).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1), page_size);
    let assets = store::list_media(pool, &filter, pagination.limit, pagination.offset).await?;

    Ok(Page::new(
        total,
        pagination,
        assets.iter().map(|a| a.for_audience(audience)).collect(),
    ))
}

/// Approve or reject an asset (administrators only)
pub async fn moderate_media(
    pool: &SqlitePool,
    id: i64,
    actor: &Actor,
    request: ModerationRequest,
) -> Result<MediaAsset> {
    if !actor.is_admin() {
        return Err(Error::PermissionDenied(
            "only administrators can moderate media".to_string(),
        ));
    }
    let approved = request
        .approved
        .ok_or_else(|| Error::validation("approved", "required"))?;

    let notes = request.notes.unwrap_or_default();
    if !store::moderate(pool, id, approved, &notes).await? {
        return Err(Error::NotFound(format!("media {} not found", id)));
    }
    info!("Media {} moderated by {} (approved: {})", id, actor.username, approved);

    store::get_media(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("media {} not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_ref_both_or_neither() {
        assert_eq!(submission_ref(None, None).unwrap(), None);
        assert_eq!(
            submission_ref(Some("incidents"), Some(4)).unwrap(),
            Some(SubmissionRef {
                kind: SubmissionKind::Incident,
                id: 4
            })
        );
        assert!(submission_ref(Some("incident"), None).is_err());
        assert!(submission_ref(None, Some(4)).is_err());
        assert!(submission_ref(Some("ballots"), Some(4)).is_err());
    }
}
