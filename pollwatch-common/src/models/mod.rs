//! Domain models shared by the API layer and the database layer
//!
//! Enumerations are stored as lowercase text columns; each one has an
//! `as_str` / `FromStr` pair that matches its serde representation.

mod actor;
mod election;
mod media;
mod stream;
mod submission;
mod verification;

pub use actor::{can_verify, Actor, Role, UserRef};
pub use election::{Election, ElectionType, PollingStation};
pub use media::{MediaAsset, MediaType, SubmissionRef};
pub use stream::{LiveStreamSession, StreamState, StreamType};
pub use submission::{
    Audience, IncidentDetails, IncidentType, Location, Severity, StationUpdateDetails, Submission,
    SubmissionDetails, SubmissionKind, SubmissionView, UpdateType, VerificationStatus,
};
pub use verification::Verification;

use crate::Error;

/// Build the error returned when a stored or submitted enum value is unknown
pub(crate) fn unknown_value(field: &str, value: &str, allowed: &[&str]) -> Error {
    Error::validation(
        field,
        format!("unknown value '{}' (expected one of: {})", value, allowed.join(", ")),
    )
}
