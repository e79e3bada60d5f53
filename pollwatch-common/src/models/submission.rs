//! Citizen submissions: polling-station updates and incident reports
//!
//! Both kinds share the verification lifecycle; only the payload differs.
//! `verification_status` is a cache of the latest verification's resulting
//! status and is `pending` until the first verification is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{unknown_value, UserRef};
use crate::{Error, Result};

// ========================================
// Kind and status
// ========================================

/// Which kind of submission a record is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    StationUpdate,
    Incident,
}

impl SubmissionKind {
    pub const ALL: [&'static str; 2] = ["station_update", "incident"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::StationUpdate => "station_update",
            SubmissionKind::Incident => "incident",
        }
    }

    /// Table holding records of this kind
    pub fn table(&self) -> &'static str {
        match self {
            SubmissionKind::StationUpdate => "station_updates",
            SubmissionKind::Incident => "incident_reports",
        }
    }

    /// Statuses a verification may set on this kind
    pub fn allowed_statuses(&self) -> &'static [VerificationStatus] {
        const UPDATE: [VerificationStatus; 3] = [
            VerificationStatus::Verified,
            VerificationStatus::Unverified,
            VerificationStatus::Disputed,
        ];
        const INCIDENT: [VerificationStatus; 4] = [
            VerificationStatus::Verified,
            VerificationStatus::Unverified,
            VerificationStatus::Disputed,
            VerificationStatus::Resolved,
        ];
        match self {
            SubmissionKind::StationUpdate => &UPDATE,
            SubmissionKind::Incident => &INCIDENT,
        }
    }

    pub fn allows(&self, status: VerificationStatus) -> bool {
        self.allowed_statuses().contains(&status)
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = Error;

    /// Accepts the canonical names and the plural path forms
    /// (`station-updates`, `incidents`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "station_update" | "station_updates" | "station-updates" => {
                Ok(SubmissionKind::StationUpdate)
            }
            "incident" | "incidents" => Ok(SubmissionKind::Incident),
            other => Err(unknown_value("kind", other, &SubmissionKind::ALL)),
        }
    }
}

/// Verification state of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Disputed,
    Unverified,
    /// Incidents only
    Resolved,
}

impl VerificationStatus {
    pub const ALL: [&'static str; 5] = ["pending", "verified", "disputed", "unverified", "resolved"];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Disputed => "disputed",
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VerificationStatus::Pending),
            "verified" => Ok(VerificationStatus::Verified),
            "disputed" => Ok(VerificationStatus::Disputed),
            "unverified" => Ok(VerificationStatus::Unverified),
            "resolved" => Ok(VerificationStatus::Resolved),
            other => Err(unknown_value("status", other, &VerificationStatus::ALL)),
        }
    }
}

// ========================================
// Payload enums
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Opening,
    Closing,
    Turnout,
    Queue,
    General,
}

impl UpdateType {
    pub const ALL: [&'static str; 5] = ["opening", "closing", "turnout", "queue", "general"];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Opening => "opening",
            UpdateType::Closing => "closing",
            UpdateType::Turnout => "turnout",
            UpdateType::Queue => "queue",
            UpdateType::General => "general",
        }
    }
}

impl FromStr for UpdateType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "opening" => Ok(UpdateType::Opening),
            "closing" => Ok(UpdateType::Closing),
            "turnout" => Ok(UpdateType::Turnout),
            "queue" => Ok(UpdateType::Queue),
            "general" => Ok(UpdateType::General),
            other => Err(unknown_value("update_type", other, &UpdateType::ALL)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Violence,
    Irregularity,
    Disruption,
    Technical,
    Other,
}

impl IncidentType {
    pub const ALL: [&'static str; 5] = ["violence", "irregularity", "disruption", "technical", "other"];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::Violence => "violence",
            IncidentType::Irregularity => "irregularity",
            IncidentType::Disruption => "disruption",
            IncidentType::Technical => "technical",
            IncidentType::Other => "other",
        }
    }
}

impl FromStr for IncidentType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "violence" => Ok(IncidentType::Violence),
            "irregularity" => Ok(IncidentType::Irregularity),
            "disruption" => Ok(IncidentType::Disruption),
            "technical" => Ok(IncidentType::Technical),
            "other" => Ok(IncidentType::Other),
            other => Err(unknown_value("incident_type", other, &IncidentType::ALL)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [&'static str; 4] = ["low", "medium", "high", "critical"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(unknown_value("severity", other, &Severity::ALL)),
        }
    }
}

// ========================================
// Location
// ========================================

/// Client-captured coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Validate an optional coordinate pair
    ///
    /// Both values must be given together and lie within the valid
    /// latitude / longitude ranges.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<Location>> {
        match (latitude, longitude) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(Error::validation(
                "longitude",
                "longitude is required when latitude is given",
            )),
            (None, Some(_)) => Err(Error::validation(
                "latitude",
                "latitude is required when longitude is given",
            )),
            (Some(lat), Some(lon)) => {
                if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                    return Err(Error::validation(
                        "latitude",
                        format!("{} is outside [-90, 90]", lat),
                    ));
                }
                if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                    return Err(Error::validation(
                        "longitude",
                        format!("{} is outside [-180, 180]", lon),
                    ));
                }
                Ok(Some(Location {
                    latitude: lat,
                    longitude: lon,
                }))
            }
        }
    }
}

// ========================================
// Submission record
// ========================================

/// Station-update specific fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationUpdateDetails {
    pub update_type: UpdateType,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub estimated_turnout: Option<i64>,
    /// Minutes
    pub queue_wait_time: Option<i64>,
    pub queue_length: Option<i64>,
    pub status_notes: String,
    pub photo_url: String,
    pub video_url: String,
}

/// Incident-report specific fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentDetails {
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub description: String,
    pub location_description: String,
    pub photo_url: String,
    pub video_url: String,
    pub responded_to: bool,
    pub response_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubmissionDetails {
    StationUpdate(StationUpdateDetails),
    Incident(IncidentDetails),
}

impl SubmissionDetails {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            SubmissionDetails::StationUpdate(_) => SubmissionKind::StationUpdate,
            SubmissionDetails::Incident(_) => SubmissionKind::Incident,
        }
    }
}

/// A persisted station update or incident report
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: i64,
    pub election_id: i64,
    pub polling_station_id: Option<i64>,
    pub location: Option<Location>,
    pub is_anonymous: bool,
    pub submitted_by: Option<UserRef>,
    pub verification_status: VerificationStatus,
    pub latest_verification_id: Option<i64>,
    pub verified_by: Option<UserRef>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub details: SubmissionDetails,
}

/// Who a serialized record is intended for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Citizens, observers, unauthenticated callers and realtime feeds
    Public,
    /// Administrators
    Admin,
}

/// Client-facing form of a submission
///
/// `submitted_by` is omitted entirely (not null) whenever the submission is
/// anonymous and the audience is not an administrator.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub id: i64,
    pub kind: SubmissionKind,
    pub election_id: i64,
    pub polling_station_id: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_anonymous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<UserRef>,
    pub verification_status: VerificationStatus,
    pub latest_verification_id: Option<i64>,
    pub verified_by: Option<UserRef>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: SubmissionDetails,
}

impl Submission {
    pub fn kind(&self) -> SubmissionKind {
        self.details.kind()
    }

    pub fn view(&self, audience: Audience) -> SubmissionView {
        let submitted_by = match (self.is_anonymous, audience) {
            (true, Audience::Public) => None,
            _ => self.submitted_by.clone(),
        };

        SubmissionView {
            id: self.id,
            kind: self.kind(),
            election_id: self.election_id,
            polling_station_id: self.polling_station_id,
            latitude: self.location.map(|l| l.latitude),
            longitude: self.location.map(|l| l.longitude),
            is_anonymous: self.is_anonymous,
            submitted_by,
            verification_status: self.verification_status,
            latest_verification_id: self.latest_verification_id,
            verified_by: self.verified_by.clone(),
            verified_at: self.verified_at,
            verification_notes: self.verification_notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            details: self.details.clone(),
        }
    }
}
