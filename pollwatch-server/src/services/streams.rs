//! Live stream registry
//!
//! Sessions move `created -> live <-> paused -> ended`. Only the creator or
//! an administrator controls a session; anyone may send heartbeats until it
//! ends. Sessions are never expired here: a live session that stops sending
//! heartbeats is merely reported `stale`.

use chrono::{DateTime, Duration, Utc};
use pollwatch_common::models::{
    Actor, Audience, LiveStreamSession, Location, StreamState, StreamType,
};
use pollwatch_common::{time, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use super::submissions::audience_for;
use super::{non_blank, non_negative, random_token};
use crate::db::elections;
use crate::db::streams::{self as store, NewStream};

#[derive(Debug, Default, Deserialize)]
pub struct StreamPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub stream_type: Option<String>,
    pub election: Option<i64>,
    pub polling_station: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub state: Option<String>,
    pub election: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HeartbeatRequest {
    pub viewer_count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StreamStatistics {
    pub total_streams: i64,
    pub active_streams: i64,
    pub total_viewers: i64,
}

/// Client-facing session
#[derive(Debug, Serialize)]
pub struct StreamView {
    #[serde(flatten)]
    pub session: LiveStreamSession,
    pub stale: bool,
}

impl StreamView {
    pub fn new(
        session: LiveStreamSession,
        audience: Audience,
        now: DateTime<Utc>,
        stale_after: Duration,
    ) -> Self {
        let stale = session.is_stale(now, stale_after);
        let mut session = session;
        if session.is_anonymous && audience == Audience::Public {
            session.created_by = None;
        }
        Self { session, stale }
    }
}

/// Creation response: the only place the stream key is handed out
#[derive(Debug, Serialize)]
pub struct CreatedStream {
    #[serde(flatten)]
    pub view: StreamView,
    pub stream_key: String,
}

/// Stream key handed to the broadcaster's encoder
pub fn generate_stream_key() -> String {
    format!("live_{}", random_token(32))
}

async fn load(pool: &SqlitePool, id: i64) -> Result<LiveStreamSession> {
    store::get_stream(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("live stream {} not found", id)))
}

fn require_control(session: &LiveStreamSession, actor: &Actor) -> Result<()> {
    if actor.is_admin() || session.is_controlled_by(actor.id) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "only the creator or an administrator can control stream {}",
            session.id
        )))
    }
}

pub async fn create_stream(
    pool: &SqlitePool,
    payload: StreamPayload,
    actor: &Actor,
) -> Result<LiveStreamSession> {
    let title = non_blank(payload.title).ok_or_else(|| Error::validation("title", "required"))?;
    let stream_type = match payload.stream_type.as_deref() {
        Some(t) => t.parse()?,
        None => StreamType::Video,
    };
    let location = Location::from_parts(payload.latitude, payload.longitude)?;

    if let Some(election_id) = payload.election {
        if elections::get_election(pool, election_id).await?.is_none() {
            return Err(Error::NotFound(format!("Election {} not found", election_id)));
        }
    }
    if let Some(station_id) = payload.polling_station {
        if elections::get_station(pool, station_id).await?.is_none() {
            return Err(Error::NotFound(format!("Polling station {} not found", station_id)));
        }
    }

    let new = NewStream {
        title,
        description: payload.description.unwrap_or_default(),
        stream_key: generate_stream_key(),
        stream_type,
        election_id: payload.election,
        polling_station_id: payload.polling_station,
        location,
        created_by: actor.id,
        is_anonymous: payload.is_anonymous.unwrap_or(false),
    };

    let id = store::insert_stream(pool, &new).await?;
    info!("Live stream {} created by {}", id, actor.username);

    load(pool, id).await
}

pub async fn get_stream(pool: &SqlitePool, id: i64) -> Result<LiveStreamSession> {
    load(pool, id).await
}

pub async fn list_streams(
    pool: &SqlitePool,
    query: &StreamQuery,
    limit: i64,
) -> Result<Vec<LiveStreamSession>> {
    let state = query
        .state
        .as_deref()
        .map(str::parse::<StreamState>)
        .transpose()?;
    store::list_streams(pool, state, query.election, limit).await
}

/// Sessions currently live
pub async fn active_streams(pool: &SqlitePool, limit: i64) -> Result<Vec<LiveStreamSession>> {
    store::list_streams(pool, Some(StreamState::Live), None, limit).await
}

pub async fn stream_statistics(pool: &SqlitePool) -> Result<StreamStatistics> {
    let (total_streams, active_streams, total_viewers) = store::stream_totals(pool).await?;
    Ok(StreamStatistics {
        total_streams,
        active_streams,
        total_viewers,
    })
}

/// created | paused -> live
pub async fn start_stream(pool: &SqlitePool, id: i64, actor: &Actor) -> Result<LiveStreamSession> {
    let session = load(pool, id).await?;
    require_control(&session, actor)?;

    let next = session.state.start()?;
    let started_at = session.started_at.is_none().then(time::now);
    store::set_state(pool, id, next, started_at, None).await?;
    info!("Live stream {} started", id);

    load(pool, id).await
}

/// live -> paused
pub async fn pause_stream(pool: &SqlitePool, id: i64, actor: &Actor) -> Result<LiveStreamSession> {
    let session = load(pool, id).await?;
    require_control(&session, actor)?;

    let next = session.state.pause()?;
    store::set_state(pool, id, next, None, None).await?;
    info!("Live stream {} paused", id);

    load(pool, id).await
}

/// any -> ended; ending an ended session changes nothing and succeeds
pub async fn end_stream(pool: &SqlitePool, id: i64, actor: &Actor) -> Result<LiveStreamSession> {
    let session = load(pool, id).await?;
    require_control(&session, actor)?;

    if session.state == StreamState::Ended {
        return Ok(session);
    }

    store::set_state(pool, id, StreamState::Ended, None, Some(time::now())).await?;
    info!("Live stream {} ended", id);

    load(pool, id).await
}

pub async fn heartbeat(
    pool: &SqlitePool,
    id: i64,
    request: HeartbeatRequest,
) -> Result<LiveStreamSession> {
    let viewer_count = non_negative("viewer_count", request.viewer_count)?;
    let session = load(pool, id).await?;

    if !session.state.accepts_heartbeat() {
        return Err(Error::InvalidState(format!(
            "live stream {} has ended",
            id
        )));
    }

    store::record_heartbeat(pool, id, viewer_count).await?;
    load(pool, id).await
}

/// Build the client view of `session` for `viewer`
pub fn view_for(
    session: LiveStreamSession,
    viewer: Option<&Actor>,
    stale_after_secs: i64,
) -> StreamView {
    StreamView::new(
        session,
        audience_for(viewer),
        time::now(),
        Duration::seconds(stale_after_secs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_key_format() {
        let key = generate_stream_key();
        assert!(key.starts_with("live_"));
        assert_eq!(key.len(), "live_".len() + 32);
    }
}
