//! Station updates and incident reports
//!
//! Both kinds live in their own table but share the submission columns
//! (election, station, location, anonymity, cached verification state).

use chrono::{DateTime, Utc};
use pollwatch_common::models::{
    IncidentDetails, IncidentType, Location, Severity, StationUpdateDetails, Submission,
    SubmissionDetails, SubmissionKind, UpdateType, VerificationStatus,
};
use pollwatch_common::{time, Result};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use super::{location_from_row, user_ref_from_row};

/// Fields needed to insert a submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub election_id: i64,
    pub polling_station_id: Option<i64>,
    pub location: Option<Location>,
    pub is_anonymous: bool,
    pub submitted_by: Option<i64>,
    pub details: SubmissionDetails,
}

/// List filters; options that don't apply to the listed kind are ignored
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub verification_status: Option<VerificationStatus>,
    pub election_id: Option<i64>,
    pub polling_station_id: Option<i64>,
    pub update_type: Option<UpdateType>,
    pub incident_type: Option<IncidentType>,
    pub severity: Option<Severity>,
    /// Restrict to `verified` records regardless of `verification_status`
    pub verified_only: bool,
}

fn select_sql(kind: SubmissionKind) -> String {
    format!(
        "SELECT s.*, su.username AS submitted_by_name, vu.username AS verified_by_name \
         FROM {} s \
         LEFT JOIN users su ON su.id = s.submitted_by \
         LEFT JOIN users vu ON vu.id = s.verified_by",
        kind.table()
    )
}

fn submission_from_row(kind: SubmissionKind, row: &SqliteRow) -> Result<Submission> {
    let status: String = row.get("verification_status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    let details = match kind {
        SubmissionKind::StationUpdate => {
            let update_type: String = row.get("update_type");
            SubmissionDetails::StationUpdate(StationUpdateDetails {
                update_type: update_type.parse()?,
                opening_time: row.get("opening_time"),
                closing_time: row.get("closing_time"),
                estimated_turnout: row.get("estimated_turnout"),
                queue_wait_time: row.get("queue_wait_time"),
                queue_length: row.get("queue_length"),
                status_notes: row.get("status_notes"),
                photo_url: row.get("photo_url"),
                video_url: row.get("video_url"),
            })
        }
        SubmissionKind::Incident => {
            let incident_type: String = row.get("incident_type");
            let severity: String = row.get("severity");
            SubmissionDetails::Incident(IncidentDetails {
                incident_type: incident_type.parse()?,
                severity: severity.parse()?,
                description: row.get("description"),
                location_description: row.get("location_description"),
                photo_url: row.get("photo_url"),
                video_url: row.get("video_url"),
                responded_to: row.get("responded_to"),
                response_notes: row.get("response_notes"),
            })
        }
    };

    Ok(Submission {
        id: row.get("id"),
        election_id: row.get("election_id"),
        polling_station_id: row.get("polling_station_id"),
        location: location_from_row(row),
        is_anonymous: row.get("is_anonymous"),
        submitted_by: user_ref_from_row(row, "submitted_by", "submitted_by_name"),
        verification_status: status.parse()?,
        latest_verification_id: row.get("latest_verification_id"),
        verified_by: user_ref_from_row(row, "verified_by", "verified_by_name"),
        verified_at: time::from_db_opt(row.get("verified_at"))?,
        verification_notes: row.get("verification_notes"),
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
        details,
    })
}

/// Insert a new submission with status `pending`, returning its id
pub async fn insert_submission(pool: &SqlitePool, new: &NewSubmission) -> Result<i64> {
    let now = time::to_db(&time::now());
    let latitude = new.location.map(|l| l.latitude);
    let longitude = new.location.map(|l| l.longitude);

    let done = match &new.details {
        SubmissionDetails::StationUpdate(d) => {
            sqlx::query(
                r#"
                INSERT INTO station_updates (
                    election_id, polling_station_id, update_type,
                    opening_time, closing_time, estimated_turnout,
                    queue_wait_time, queue_length, status_notes,
                    photo_url, video_url, latitude, longitude,
                    is_anonymous, submitted_by, verification_status,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
                "#,
            )
            .bind(new.election_id)
            .bind(new.polling_station_id)
            .bind(d.update_type.as_str())
            .bind(&d.opening_time)
            .bind(&d.closing_time)
            .bind(d.estimated_turnout)
            .bind(d.queue_wait_time)
            .bind(d.queue_length)
            .bind(&d.status_notes)
            .bind(&d.photo_url)
            .bind(&d.video_url)
            .bind(latitude)
            .bind(longitude)
            .bind(new.is_anonymous)
            .bind(new.submitted_by)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?
        }
        SubmissionDetails::Incident(d) => {
            sqlx::query(
                r#"
                INSERT INTO incident_reports (
                    election_id, polling_station_id, incident_type,
                    severity, description, location_description,
                    photo_url, video_url, latitude, longitude,
                    is_anonymous, submitted_by, verification_status,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
                "#,
            )
            .bind(new.election_id)
            .bind(new.polling_station_id)
            .bind(d.incident_type.as_str())
            .bind(d.severity.as_str())
            .bind(&d.description)
            .bind(&d.location_description)
            .bind(&d.photo_url)
            .bind(&d.video_url)
            .bind(latitude)
            .bind(longitude)
            .bind(new.is_anonymous)
            .bind(new.submitted_by)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?
        }
    };

    Ok(done.last_insert_rowid())
}

/// Load one submission
///
/// Generic over the executor so the verification transaction can read back
/// the row it just updated.
pub async fn get_submission<'e, E>(
    executor: E,
    kind: SubmissionKind,
    id: i64,
) -> Result<Option<Submission>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE s.id = ?", select_sql(kind));
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;

    row.as_ref()
        .map(|row| submission_from_row(kind, row))
        .transpose()
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, kind: SubmissionKind, filter: &SubmissionFilter) {
    qb.push(" WHERE 1 = 1");

    if filter.verified_only {
        qb.push(" AND s.verification_status = 'verified'");
    }
    if let Some(status) = filter.verification_status {
        qb.push(" AND s.verification_status = ").push_bind(status.as_str());
    }
    if let Some(election_id) = filter.election_id {
        qb.push(" AND s.election_id = ").push_bind(election_id);
    }
    if let Some(station_id) = filter.polling_station_id {
        qb.push(" AND s.polling_station_id = ").push_bind(station_id);
    }

    match kind {
        SubmissionKind::StationUpdate => {
            if let Some(update_type) = filter.update_type {
                qb.push(" AND s.update_type = ").push_bind(update_type.as_str());
            }
        }
        SubmissionKind::Incident => {
            if let Some(incident_type) = filter.incident_type {
                qb.push(" AND s.incident_type = ").push_bind(incident_type.as_str());
            }
            if let Some(severity) = filter.severity {
                qb.push(" AND s.severity = ").push_bind(severity.as_str());
            }
        }
    }
}

/// Count submissions matching `filter`
pub async fn count_submissions(
    pool: &SqlitePool,
    kind: SubmissionKind,
    filter: &SubmissionFilter,
) -> Result<i64> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} s", kind.table()));
    push_filters(&mut qb, kind, filter);

    let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// List one page of submissions matching `filter`, newest first
pub async fn list_submissions(
    pool: &SqlitePool,
    kind: SubmissionKind,
    filter: &SubmissionFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Submission>> {
    let mut qb = QueryBuilder::new(select_sql(kind));
    push_filters(&mut qb, kind, filter);
    qb.push(" ORDER BY s.created_at DESC, s.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(|row| submission_from_row(kind, row)).collect()
}

/// Station updates for `election_id` created at or after `since`, newest first
pub async fn recent_station_updates(
    pool: &SqlitePool,
    election_id: i64,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Submission>> {
    let sql = format!(
        "{} WHERE s.election_id = ? AND s.created_at >= ? ORDER BY s.created_at DESC, s.id DESC LIMIT ?",
        select_sql(SubmissionKind::StationUpdate)
    );

    let rows = sqlx::query(&sql)
        .bind(election_id)
        .bind(time::to_db(&since))
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| submission_from_row(SubmissionKind::StationUpdate, row))
        .collect()
}

/// Record an administrator response on an incident. Returns false when the
/// incident does not exist.
pub async fn mark_responded(pool: &SqlitePool, id: i64, notes: &str) -> Result<bool> {
    let done = sqlx::query(
        "UPDATE incident_reports SET responded_to = 1, response_notes = ?, updated_at = ? WHERE id = ?",
    )
    .bind(notes)
    .bind(time::to_db(&time::now()))
    .bind(id)
    .execute(pool)
    .await?;

    Ok(done.rows_affected() > 0)
}

/// Whether a submission of `kind` with `id` exists
pub async fn submission_exists(pool: &SqlitePool, kind: SubmissionKind, id: i64) -> Result<bool> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", kind.table());
    let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(pool).await?;
    Ok(count > 0)
}

/// Row counts grouped by `column`, optionally for one election
///
/// `column` must be a column name of the kind's table, never user input.
pub async fn group_counts(
    pool: &SqlitePool,
    kind: SubmissionKind,
    column: &'static str,
    election_id: Option<i64>,
) -> Result<Vec<(String, i64)>> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {col}, COUNT(*) FROM {table} WHERE 1 = 1",
        col = column,
        table = kind.table()
    ));
    if let Some(election_id) = election_id {
        qb.push(" AND election_id = ").push_bind(election_id);
    }
    qb.push(format!(" GROUP BY {col} ORDER BY {col}", col = column));

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| (row.get::<String, _>(0), row.get::<i64, _>(1)))
        .collect())
}
