//! Live stream sessions

use chrono::{DateTime, Utc};
use pollwatch_common::models::{LiveStreamSession, Location, StreamState, StreamType};
use pollwatch_common::{time, Result};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use super::{location_from_row, user_ref_from_row};

const SELECT_SQL: &str = "SELECT l.*, u.username AS created_by_name \
     FROM live_streams l LEFT JOIN users u ON u.id = l.created_by";

#[derive(Debug, Clone)]
pub struct NewStream {
    pub title: String,
    pub description: String,
    pub stream_key: String,
    pub stream_type: StreamType,
    pub election_id: Option<i64>,
    pub polling_station_id: Option<i64>,
    pub location: Option<Location>,
    pub created_by: i64,
    pub is_anonymous: bool,
}

fn stream_from_row(row: &SqliteRow) -> Result<LiveStreamSession> {
    let stream_type: String = row.get("stream_type");
    let state: String = row.get("state");
    let created_at: String = row.get("created_at");

    Ok(LiveStreamSession {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        stream_key: row.get("stream_key"),
        stream_type: stream_type.parse()?,
        state: state.parse()?,
        viewer_count: row.get("viewer_count"),
        peak_viewers: row.get("peak_viewers"),
        total_views: row.get("total_views"),
        election_id: row.get("election_id"),
        polling_station_id: row.get("polling_station_id"),
        location: location_from_row(row),
        started_at: time::from_db_opt(row.get("started_at"))?,
        ended_at: time::from_db_opt(row.get("ended_at"))?,
        last_heartbeat_at: time::from_db_opt(row.get("last_heartbeat_at"))?,
        created_by: user_ref_from_row(row, "created_by", "created_by_name"),
        is_anonymous: row.get("is_anonymous"),
        created_at: time::from_db(&created_at)?,
    })
}

pub async fn insert_stream(pool: &SqlitePool, new: &NewStream) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO live_streams (
            title, description, stream_key, stream_type, state,
            election_id, polling_station_id, latitude, longitude,
            created_by, is_anonymous, created_at
        ) VALUES (?, ?, ?, ?, 'created', ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.stream_key)
    .bind(new.stream_type.as_str())
    .bind(new.election_id)
    .bind(new.polling_station_id)
    .bind(new.location.map(|l| l.latitude))
    .bind(new.location.map(|l| l.longitude))
    .bind(new.created_by)
    .bind(new.is_anonymous)
    .bind(time::to_db(&time::now()))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn get_stream(pool: &SqlitePool, id: i64) -> Result<Option<LiveStreamSession>> {
    let sql = format!("{} WHERE l.id = ?", SELECT_SQL);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.as_ref().map(stream_from_row).transpose()
}

/// List sessions, newest first, optionally in one state and/or election
pub async fn list_streams(
    pool: &SqlitePool,
    state: Option<StreamState>,
    election_id: Option<i64>,
    limit: i64,
) -> Result<Vec<LiveStreamSession>> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_SQL);
    qb.push(" WHERE 1 = 1");
    if let Some(state) = state {
        qb.push(" AND l.state = ").push_bind(state.as_str());
    }
    if let Some(election_id) = election_id {
        qb.push(" AND l.election_id = ").push_bind(election_id);
    }
    qb.push(" ORDER BY l.id DESC LIMIT ").push_bind(limit);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(stream_from_row).collect()
}

/// Totals across all sessions: (sessions, live sessions, viewers of live
/// sessions)
pub async fn stream_totals(pool: &SqlitePool) -> Result<(i64, i64, i64)> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COALESCE(SUM(CASE WHEN state = 'live' THEN 1 ELSE 0 END), 0) AS live,
               COALESCE(SUM(CASE WHEN state = 'live' THEN viewer_count ELSE 0 END), 0) AS viewers
        FROM live_streams
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok((row.get("total"), row.get("live"), row.get("viewers")))
}

/// Persist a state transition; `started_at` / `ended_at` are only written
/// when given and never cleared.
pub async fn set_state(
    pool: &SqlitePool,
    id: i64,
    state: StreamState,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE live_streams
        SET state = ?,
            started_at = COALESCE(?, started_at),
            ended_at = COALESCE(?, ended_at)
        WHERE id = ?
        "#,
    )
    .bind(state.as_str())
    .bind(started_at.as_ref().map(time::to_db))
    .bind(ended_at.as_ref().map(time::to_db))
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a heartbeat. A given viewer count replaces the current one; a
/// positive count also raises the peak and counts as a view.
pub async fn record_heartbeat(pool: &SqlitePool, id: i64, viewer_count: Option<i64>) -> Result<()> {
    let counted = viewer_count.filter(|c| *c > 0);

    sqlx::query(
        r#"
        UPDATE live_streams
        SET viewer_count = COALESCE(?, viewer_count),
            peak_viewers = MAX(peak_viewers, COALESCE(?, 0)),
            total_views = total_views + ?,
            last_heartbeat_at = ?
        WHERE id = ?
        "#,
    )
    .bind(viewer_count)
    .bind(counted)
    .bind(i64::from(counted.is_some()))
    .bind(time::to_db(&time::now()))
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}
