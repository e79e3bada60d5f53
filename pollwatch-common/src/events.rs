//! Realtime event types
//!
//! Events are published after a submission is created or its verification
//! status changes. They always carry the public view of the record, so an
//! anonymous submitter never leaks through a realtime feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Audience, Submission, SubmissionKind, SubmissionView};
use crate::Error;

/// Named broadcast scope
///
/// Wire form: `global`, `election:{id}`, `incidents`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Topic {
    /// Receives every event
    Global,
    /// Events about submissions for one election
    Election(i64),
    /// Incident reports across all elections
    Incidents,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Global => f.write_str("global"),
            Topic::Election(id) => write!(f, "election:{}", id),
            Topic::Incidents => f.write_str("incidents"),
        }
    }
}

impl FromStr for Topic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Topic::Global),
            "incidents" => Ok(Topic::Incidents),
            other => other
                .strip_prefix("election:")
                .and_then(|id| id.parse::<i64>().ok())
                .map(Topic::Election)
                .ok_or_else(|| {
                    Error::validation(
                        "topic",
                        format!("unknown topic '{}' (expected global, incidents or election:<id>)", other),
                    )
                }),
        }
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

impl TryFrom<String> for Topic {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    StatusChanged,
}

/// Message fanned out to realtime subscribers
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub kind: SubmissionKind,
    pub record: SubmissionView,
    pub timestamp: DateTime<Utc>,
}

impl RealtimeEvent {
    pub fn created(submission: &Submission) -> Self {
        Self::new(EventType::Created, submission)
    }

    pub fn status_changed(submission: &Submission) -> Self {
        Self::new(EventType::StatusChanged, submission)
    }

    fn new(event_type: EventType, submission: &Submission) -> Self {
        Self {
            event_type,
            kind: submission.kind(),
            record: submission.view(Audience::Public),
            timestamp: Utc::now(),
        }
    }

    /// Topics this event is published to (subscribers of `global` receive
    /// it as well)
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics = vec![Topic::Election(self.record.election_id)];
        if self.kind == SubmissionKind::Incident {
            topics.push(Topic::Incidents);
        }
        topics
    }
}
