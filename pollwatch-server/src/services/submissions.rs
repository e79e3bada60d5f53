//! Submission API: create, read, list and summarize station updates and
//! incident reports

use std::collections::BTreeMap;

use chrono::Duration;
use pollwatch_common::models::{
    Actor, Audience, IncidentDetails, Location, StationUpdateDetails, Submission,
    SubmissionDetails, SubmissionKind, SubmissionView, Verification, VerificationStatus,
};
use pollwatch_common::{time, Error, RealtimeEvent, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use super::{non_blank, non_negative, parse_opt};
use crate::broadcaster::Broadcaster;
use crate::db::submissions::{self as store, NewSubmission, SubmissionFilter};
use crate::db::{elections, verifications};
use crate::pagination::{calculate_pagination, Page};

/// Maximum number of station updates sent to a new election subscriber
pub const RECENT_UPDATES_LIMIT: i64 = 50;

/// Request body for creating either kind of submission
///
/// Fields belonging to the other kind are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SubmissionPayload {
    pub election: Option<i64>,
    pub polling_station: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_anonymous: Option<bool>,
    pub photo_url: Option<String>,
    pub video_url: Option<String>,

    // Station update
    pub update_type: Option<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub estimated_turnout: Option<i64>,
    pub queue_wait_time: Option<i64>,
    pub queue_length: Option<i64>,
    pub status_notes: Option<String>,

    // Incident
    pub incident_type: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub location_description: Option<String>,
}

/// Query-string filters for listing
#[derive(Debug, Default, Deserialize)]
pub struct SubmissionQuery {
    pub verification_status: Option<String>,
    pub election: Option<i64>,
    pub polling_station: Option<i64>,
    pub update_type: Option<String>,
    pub incident_type: Option<String>,
    pub severity: Option<String>,
    pub page: Option<i64>,
}

/// A submission with its verification history
#[derive(Debug, Serialize)]
pub struct SubmissionDetail {
    #[serde(flatten)]
    pub submission: SubmissionView,
    pub verifications: Vec<Verification>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionStatistics {
    pub kind: SubmissionKind,
    pub election: Option<i64>,
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_severity: Option<BTreeMap<String, i64>>,
}

pub fn audience_for(viewer: Option<&Actor>) -> Audience {
    match viewer {
        Some(actor) if actor.is_admin() => Audience::Admin,
        _ => Audience::Public,
    }
}

fn time_of_day(field: &str, value: Option<String>) -> Result<Option<String>> {
    match non_blank(value) {
        Some(v) => match time::parse_time_of_day(&v) {
            Some(t) => Ok(Some(t.format("%H:%M").to_string())),
            None => Err(Error::validation(field, format!("'{}' is not a time (HH:MM)", v))),
        },
        None => Ok(None),
    }
}

fn station_update_details(payload: &mut SubmissionPayload) -> Result<SubmissionDetails> {
    let update_type = payload
        .update_type
        .as_deref()
        .ok_or_else(|| Error::validation("update_type", "required"))?
        .parse()?;

    Ok(SubmissionDetails::StationUpdate(StationUpdateDetails {
        update_type,
        opening_time: time_of_day("opening_time", payload.opening_time.take())?,
        closing_time: time_of_day("closing_time", payload.closing_time.take())?,
        estimated_turnout: non_negative("estimated_turnout", payload.estimated_turnout)?,
        queue_wait_time: non_negative("queue_wait_time", payload.queue_wait_time)?,
        queue_length: non_negative("queue_length", payload.queue_length)?,
        status_notes: payload.status_notes.take().unwrap_or_default(),
        photo_url: payload.photo_url.take().unwrap_or_default(),
        video_url: payload.video_url.take().unwrap_or_default(),
    }))
}

fn incident_details(payload: &mut SubmissionPayload) -> Result<SubmissionDetails> {
    let incident_type = payload
        .incident_type
        .as_deref()
        .ok_or_else(|| Error::validation("incident_type", "required"))?
        .parse()?;
    let severity = payload
        .severity
        .as_deref()
        .ok_or_else(|| Error::validation("severity", "required"))?
        .parse()?;
    let description = non_blank(payload.description.take())
        .ok_or_else(|| Error::validation("description", "required"))?;

    Ok(SubmissionDetails::Incident(IncidentDetails {
        incident_type,
        severity,
        description,
        location_description: payload.location_description.take().unwrap_or_default(),
        photo_url: payload.photo_url.take().unwrap_or_default(),
        video_url: payload.video_url.take().unwrap_or_default(),
        responded_to: false,
        response_notes: String::new(),
    }))
}

/// Validate and persist a new submission, then publish a `created` event
pub async fn create_submission(
    pool: &SqlitePool,
    broadcaster: &Broadcaster,
    kind: SubmissionKind,
    mut payload: SubmissionPayload,
    actor: Option<&Actor>,
) -> Result<Submission> {
    let election_id = payload
        .election
        .ok_or_else(|| Error::validation("election", "required"))?;
    let election = elections::get_election(pool, election_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Election {} not found", election_id)))?;
    if !election.is_active {
        return Err(Error::validation(
            "election",
            format!("election {} is not active", election_id),
        ));
    }

    if let Some(station_id) = payload.polling_station {
        if elections::get_station(pool, station_id).await?.is_none() {
            return Err(Error::NotFound(format!("Polling station {} not found", station_id)));
        }
    } else if kind == SubmissionKind::StationUpdate {
        return Err(Error::validation(
            "polling_station",
            "required for station updates",
        ));
    }

    let location = Location::from_parts(payload.latitude, payload.longitude)?;

    let details = match kind {
        SubmissionKind::StationUpdate => station_update_details(&mut payload)?,
        SubmissionKind::Incident => incident_details(&mut payload)?,
    };

    // Callers without credentials cannot be attributed
    let is_anonymous = match actor {
        None => true,
        Some(_) => payload
            .is_anonymous
            .unwrap_or(kind == SubmissionKind::Incident),
    };

    let new = NewSubmission {
        election_id,
        polling_station_id: payload.polling_station,
        location,
        is_anonymous,
        submitted_by: actor.map(|a| a.id),
        details,
    };

    let id = store::insert_submission(pool, &new).await?;
    let submission = store::get_submission(pool, kind, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("{} {} vanished after insert", kind, id)))?;

    info!(
        "Created {} {} for election {} (anonymous: {})",
        kind, id, election_id, is_anonymous
    );

    broadcaster.publish_event(RealtimeEvent::created(&submission));

    Ok(submission)
}

/// Load a submission as `viewer` may see it
///
/// Callers without credentials only see verified submissions.
async fn visible_submission(
    pool: &SqlitePool,
    kind: SubmissionKind,
    id: i64,
    viewer: Option<&Actor>,
) -> Result<Submission> {
    let not_found = || Error::NotFound(format!("{} {} not found", kind, id));

    let submission = store::get_submission(pool, kind, id)
        .await?
        .ok_or_else(not_found)?;

    if viewer.is_none() && submission.verification_status != VerificationStatus::Verified {
        return Err(not_found());
    }

    Ok(submission)
}

/// A submission and its verification history, oldest verification first
pub async fn get_submission(
    pool: &SqlitePool,
    kind: SubmissionKind,
    id: i64,
    viewer: Option<&Actor>,
) -> Result<SubmissionDetail> {
    let submission = visible_submission(pool, kind, id, viewer).await?;
    let verifications = verifications::history(pool, kind, id).await?;

    Ok(SubmissionDetail {
        submission: submission.view(audience_for(viewer)),
        verifications,
    })
}

pub async fn list_submissions(
    pool: &SqlitePool,
    kind: SubmissionKind,
    query: &SubmissionQuery,
    page_size: i64,
    viewer: Option<&Actor>,
) -> Result<Page<SubmissionView>> {
    let filter = SubmissionFilter {
        verification_status: parse_opt(query.verification_status.as_deref())?,
        election_id: query.election,
        polling_station_id: query.polling_station,
        update_type: parse_opt(query.update_type.as_deref())?,
        incident_type: parse_opt(query.incident_type.as_deref())?,
        severity: parse_opt(query.severity.as_deref())?,
        verified_only: viewer.is_none(),
    };

    let total = store::count_submissions(pool, kind, &filter).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1), page_size);
    let rows = store::list_submissions(pool, kind, &filter, pagination.limit, pagination.offset).await?;

    let audience = audience_for(viewer);
    Ok(Page::new(
        total,
        pagination,
        rows.iter().map(|s| s.view(audience)).collect(),
    ))
}

pub async fn submission_statistics(
    pool: &SqlitePool,
    kind: SubmissionKind,
    election: Option<i64>,
) -> Result<SubmissionStatistics> {
    let by_status: BTreeMap<String, i64> = store::group_counts(pool, kind, "verification_status", election)
        .await?
        .into_iter()
        .collect();

    let type_column = match kind {
        SubmissionKind::StationUpdate => "update_type",
        SubmissionKind::Incident => "incident_type",
    };
    let by_type = store::group_counts(pool, kind, type_column, election)
        .await?
        .into_iter()
        .collect();

    let by_severity = match kind {
        SubmissionKind::Incident => Some(
            store::group_counts(pool, kind, "severity", election)
                .await?
                .into_iter()
                .collect(),
        ),
        SubmissionKind::StationUpdate => None,
    };

    Ok(SubmissionStatistics {
        kind,
        election,
        total: by_status.values().sum(),
        by_status,
        by_type,
        by_severity,
    })
}

/// Mark an incident as responded to (administrators only)
pub async fn respond_to_incident(
    pool: &SqlitePool,
    id: i64,
    actor: &Actor,
    notes: Option<String>,
) -> Result<Submission> {
    if !actor.is_admin() {
        return Err(Error::PermissionDenied(
            "only administrators can respond to incidents".to_string(),
        ));
    }

    let notes = notes.unwrap_or_default();
    if !store::mark_responded(pool, id, &notes).await? {
        return Err(Error::NotFound(format!("incident {} not found", id)));
    }
    info!("Incident {} marked responded by {}", id, actor.username);

    store::get_submission(pool, SubmissionKind::Incident, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("incident {} not found", id)))
}

/// Station updates for an election from the last `window_minutes`, newest
/// first, as the public sees them
pub async fn recent_station_updates(
    pool: &SqlitePool,
    election_id: i64,
    window_minutes: i64,
) -> Result<Vec<SubmissionView>> {
    let since = time::now() - Duration::minutes(window_minutes);
    let updates =
        store::recent_station_updates(pool, election_id, since, RECENT_UPDATES_LIMIT).await?;

    Ok(updates.iter().map(|s| s.view(Audience::Public)).collect())
}
