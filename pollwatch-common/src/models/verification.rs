//! Verification audit entries
//!
//! A verification is written once and never changed. The submission it
//! references caches the resulting status of its most recent entry.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{SubmissionKind, UserRef, VerificationStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub id: i64,
    pub submission_kind: SubmissionKind,
    pub submission_id: i64,
    /// Resulting status, never `pending`
    pub status: VerificationStatus,
    pub verified_by: UserRef,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
