//! Live stream sessions
//!
//! State machine: `created -> live <-> paused`, any state `-> ended`.
//! Ending is idempotent. Sessions are never expired by the registry; a live
//! session without recent heartbeats is only *reported* stale.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{unknown_value, Location, UserRef};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Created,
    Live,
    Paused,
    Ended,
}

impl StreamState {
    pub const ALL: [&'static str; 4] = ["created", "live", "paused", "ended"];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Created => "created",
            StreamState::Live => "live",
            StreamState::Paused => "paused",
            StreamState::Ended => "ended",
        }
    }

    /// State after a start request
    pub fn start(self) -> Result<StreamState> {
        match self {
            StreamState::Created | StreamState::Paused => Ok(StreamState::Live),
            StreamState::Live => Err(Error::validation("state", "stream is already live")),
            StreamState::Ended => Err(Error::InvalidState(
                "an ended stream cannot be restarted".to_string(),
            )),
        }
    }

    /// State after a pause request
    pub fn pause(self) -> Result<StreamState> {
        match self {
            StreamState::Live => Ok(StreamState::Paused),
            StreamState::Created | StreamState::Paused => {
                Err(Error::validation("state", "stream is not live"))
            }
            StreamState::Ended => Err(Error::InvalidState(
                "an ended stream cannot be paused".to_string(),
            )),
        }
    }

    /// Heartbeats are accepted until the stream ends
    pub fn accepts_heartbeat(self) -> bool {
        self != StreamState::Ended
    }
}

impl FromStr for StreamState {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(StreamState::Created),
            "live" => Ok(StreamState::Live),
            "paused" => Ok(StreamState::Paused),
            "ended" => Ok(StreamState::Ended),
            other => Err(unknown_value("state", other, &StreamState::ALL)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    Video,
    Audio,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Video => "video",
            StreamType::Audio => "audio",
        }
    }
}

impl FromStr for StreamType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "video" => Ok(StreamType::Video),
            "audio" => Ok(StreamType::Audio),
            other => Err(unknown_value("stream_type", other, &["video", "audio"])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveStreamSession {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Ingest credential; only handed out once, in the creation response
    #[serde(skip_serializing)]
    pub stream_key: String,
    pub stream_type: StreamType,
    pub state: StreamState,
    pub viewer_count: i64,
    pub peak_viewers: i64,
    pub total_views: i64,
    pub election_id: Option<i64>,
    pub polling_station_id: Option<i64>,
    #[serde(flatten)]
    pub location: Option<Location>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserRef>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl LiveStreamSession {
    /// Whether viewers should presume the stream dead: live, but no
    /// heartbeat (or start) within `stale_after`.
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        if self.state != StreamState::Live {
            return false;
        }
        match self.last_heartbeat_at.or(self.started_at) {
            Some(last) => now - last > stale_after,
            None => true,
        }
    }

    /// Whether `actor_id` may start, pause or end this stream
    pub fn is_controlled_by(&self, actor_id: i64) -> bool {
        self.created_by.as_ref().map(|u| u.id) == Some(actor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(state: StreamState) -> LiveStreamSession {
        let now = Utc::now();
        LiveStreamSession {
            id: 1,
            title: "Kibra Primary count".to_string(),
            description: String::new(),
            stream_key: "live_abc".to_string(),
            stream_type: StreamType::Video,
            state,
            viewer_count: 0,
            peak_viewers: 0,
            total_views: 0,
            election_id: Some(1),
            polling_station_id: None,
            location: None,
            started_at: Some(now),
            ended_at: None,
            last_heartbeat_at: None,
            created_by: Some(UserRef {
                id: 4,
                username: "otieno".to_string(),
            }),
            is_anonymous: false,
            created_at: now,
        }
    }

    #[test]
    fn test_start_transitions() {
        assert_eq!(StreamState::Created.start().unwrap(), StreamState::Live);
        assert_eq!(StreamState::Paused.start().unwrap(), StreamState::Live);
        assert!(matches!(StreamState::Live.start(), Err(Error::Validation { .. })));
        assert!(matches!(StreamState::Ended.start(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_pause_transitions() {
        assert_eq!(StreamState::Live.pause().unwrap(), StreamState::Paused);
        assert!(StreamState::Created.pause().is_err());
        assert!(matches!(StreamState::Ended.pause(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_heartbeat_acceptance() {
        assert!(StreamState::Live.accepts_heartbeat());
        assert!(StreamState::Paused.accepts_heartbeat());
        assert!(!StreamState::Ended.accepts_heartbeat());
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        let mut s = session(StreamState::Live);
        s.started_at = Some(now - Duration::seconds(120));
        assert!(s.is_stale(now, Duration::seconds(60)));

        s.last_heartbeat_at = Some(now - Duration::seconds(5));
        assert!(!s.is_stale(now, Duration::seconds(60)));

        let ended = session(StreamState::Ended);
        assert!(!ended.is_stale(now + Duration::hours(2), Duration::seconds(60)));
    }

    #[test]
    fn test_stream_key_not_serialized() {
        let json = serde_json::to_value(session(StreamState::Created)).unwrap();
        assert!(json.get("stream_key").is_none());
        assert_eq!(json["state"], "created");
    }

    #[test]
    fn test_controlled_by_creator() {
        let s = session(StreamState::Live);
        assert!(s.is_controlled_by(4));
        assert!(!s.is_controlled_by(5));
    }
}
