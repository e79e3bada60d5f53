//! Verification engine
//!
//! Records an authorized actor's judgment on a submission. Each call appends
//! one immutable verification row and moves the submission's cached status
//! in the same transaction, then publishes `status_changed`. There is no
//! transition table: any status allowed for the kind may follow any other.

use pollwatch_common::models::{
    can_verify, Actor, SubmissionKind, SubmissionView, Verification, VerificationStatus,
};
use pollwatch_common::{Error, RealtimeEvent, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use super::non_blank;
use super::submissions::audience_for;
use crate::broadcaster::Broadcaster;
use crate::db::{submissions, verifications};
use crate::pagination::{calculate_pagination, Page};

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerificationOutcome {
    pub verification: Verification,
    pub verification_status: VerificationStatus,
    pub submission: SubmissionView,
}

fn require_verifier(actor: &Actor) -> Result<()> {
    if can_verify(actor) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "role '{}' cannot verify submissions",
            actor.role
        )))
    }
}

/// Parse and check a requested status against what `kind` allows
pub fn resolve_status(kind: SubmissionKind, status: Option<&str>) -> Result<VerificationStatus> {
    let status: VerificationStatus = status
        .ok_or_else(|| Error::validation("status", "required"))?
        .parse()?;

    if !kind.allows(status) {
        let allowed: Vec<&str> = kind.allowed_statuses().iter().map(|s| s.as_str()).collect();
        return Err(Error::validation(
            "status",
            format!(
                "'{}' is not allowed for {} (expected one of: {})",
                status,
                kind,
                allowed.join(", ")
            ),
        ));
    }

    Ok(status)
}

/// Verify a submission
pub async fn verify(
    pool: &SqlitePool,
    broadcaster: &Broadcaster,
    kind: SubmissionKind,
    submission_id: i64,
    actor: &Actor,
    request: VerifyRequest,
) -> Result<VerificationOutcome> {
    require_verifier(actor)?;
    let status = resolve_status(kind, request.status.as_deref())?;
    let notes = non_blank(request.notes);

    let (verification, submission) = verifications::record_verification(
        pool,
        kind,
        submission_id,
        &actor.user_ref(),
        status,
        notes.as_deref(),
    )
    .await?
    .ok_or_else(|| Error::NotFound(format!("{} {} not found", kind, submission_id)))?;

    info!(
        "{} {} marked {} by {} (verification {})",
        kind, submission_id, status, actor.username, verification.id
    );

    broadcaster.publish_event(RealtimeEvent::status_changed(&submission));

    Ok(VerificationOutcome {
        verification,
        verification_status: submission.verification_status,
        submission: submission.view(audience_for(Some(actor))),
    })
}

/// Verification history of one submission, oldest first
pub async fn history(
    pool: &SqlitePool,
    kind: SubmissionKind,
    submission_id: i64,
) -> Result<Vec<Verification>> {
    if !submissions::submission_exists(pool, kind, submission_id).await? {
        return Err(Error::NotFound(format!("{} {} not found", kind, submission_id)));
    }
    verifications::history(pool, kind, submission_id).await
}

/// Audit log across submissions, newest first (verifiers only)
pub async fn list_verifications(
    pool: &SqlitePool,
    actor: &Actor,
    kind: Option<SubmissionKind>,
    status: Option<VerificationStatus>,
    requested_page: i64,
    page_size: i64,
) -> Result<Page<Verification>> {
    require_verifier(actor)?;

    let total = verifications::count_verifications(pool, kind, status).await?;
    let pagination = calculate_pagination(total, requested_page, page_size);
    let rows = verifications::list_verifications(
        pool,
        kind,
        status,
        pagination.limit,
        pagination.offset,
    )
    .await?;

    Ok(Page::new(total, pagination, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_required() {
        match resolve_status(SubmissionKind::Incident, None) {
            Err(Error::Validation { field, .. }) => assert_eq!(field, "status"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_resolved_rejected_for_station_updates() {
        assert!(resolve_status(SubmissionKind::StationUpdate, Some("resolved")).is_err());
        assert_eq!(
            resolve_status(SubmissionKind::Incident, Some("resolved")).unwrap(),
            VerificationStatus::Resolved
        );
    }

    #[test]
    fn test_pending_cannot_be_set() {
        assert!(resolve_status(SubmissionKind::Incident, Some("pending")).is_err());
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(resolve_status(SubmissionKind::Incident, Some("approved")).is_err());
    }
}
