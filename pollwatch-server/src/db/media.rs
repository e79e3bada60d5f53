//! Media asset metadata

use chrono::{DateTime, Utc};
use pollwatch_common::models::{Location, MediaAsset, MediaType, SubmissionRef};
use pollwatch_common::{time, Result};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use super::{location_from_row, user_ref_from_row};

const SELECT_SQL: &str = "SELECT m.*, u.username AS uploaded_by_name \
     FROM media_assets m LEFT JOIN users u ON u.id = m.uploaded_by";

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub file_ref: String,
    pub media_type: MediaType,
    pub file_name: String,
    pub mime_type: String,
    pub file_size: Option<i64>,
    pub submission: Option<SubmissionRef>,
    pub location: Option<Location>,
    pub captured_at: Option<DateTime<Utc>>,
    pub uploaded_by: Option<i64>,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    pub media_type: Option<MediaType>,
    pub submission: Option<SubmissionRef>,
    /// Only assets not rejected by moderation
    pub approved_only: bool,
}

fn media_from_row(row: &SqliteRow) -> Result<MediaAsset> {
    let media_type: String = row.get("media_type");
    let submission_kind: Option<String> = row.get("submission_kind");
    let submission_id: Option<i64> = row.get("submission_id");
    let created_at: String = row.get("created_at");

    let submission = match (submission_kind, submission_id) {
        (Some(kind), Some(id)) => Some(SubmissionRef {
            kind: kind.parse()?,
            id,
        }),
        _ => None,
    };

    Ok(MediaAsset {
        id: row.get("id"),
        file_ref: row.get("file_ref"),
        media_type: media_type.parse()?,
        file_name: row.get("file_name"),
        mime_type: row.get("mime_type"),
        file_size: row.get("file_size"),
        submission,
        location: location_from_row(row),
        captured_at: time::from_db_opt(row.get("captured_at"))?,
        uploaded_by: user_ref_from_row(row, "uploaded_by", "uploaded_by_name"),
        is_anonymous: row.get("is_anonymous"),
        is_moderated: row.get("is_moderated"),
        is_approved: row.get("is_approved"),
        moderation_notes: row.get("moderation_notes"),
        created_at: time::from_db(&created_at)?,
    })
}

pub async fn insert_media(pool: &SqlitePool, new: &NewMedia) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO media_assets (
            file_ref, media_type, file_name, mime_type, file_size,
            submission_kind, submission_id, latitude, longitude,
            captured_at, uploaded_by, is_anonymous, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.file_ref)
    .bind(new.media_type.as_str())
    .bind(&new.file_name)
    .bind(&new.mime_type)
    .bind(new.file_size)
    .bind(new.submission.map(|s| s.kind.as_str()))
    .bind(new.submission.map(|s| s.id))
    .bind(new.location.map(|l| l.latitude))
    .bind(new.location.map(|l| l.longitude))
    .bind(new.captured_at.as_ref().map(time::to_db))
    .bind(new.uploaded_by)
    .bind(new.is_anonymous)
    .bind(time::to_db(&time::now()))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn get_media(pool: &SqlitePool, id: i64) -> Result<Option<MediaAsset>> {
    let sql = format!("{} WHERE m.id = ?", SELECT_SQL);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.as_ref().map(media_from_row).transpose()
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &'a MediaFilter) {
    qb.push(" WHERE 1 = 1");
    if filter.approved_only {
        qb.push(" AND m.is_approved = 1");
    }
    if let Some(media_type) = filter.media_type {
        qb.push(" AND m.media_type = ").push_bind(media_type.as_str());
    }
    if let Some(submission) = filter.submission {
        qb.push(" AND m.submission_kind = ")
            .push_bind(submission.kind.as_str())
            .push(" AND m.submission_id = ")
            .push_bind(submission.id);
    }
}

/// Count media matching `filter`
pub async fn count_media(pool: &SqlitePool, filter: &MediaFilter) -> Result<i64> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM media_assets m");
    push_filters(&mut qb, filter);

    let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// List one page of media matching `filter`, newest first
pub async fn list_media(
    pool: &SqlitePool,
    filter: &MediaFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<MediaAsset>> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_SQL);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY m.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(media_from_row).collect()
}

/// Record a moderation decision. Returns false when the asset does not exist.
pub async fn moderate(pool: &SqlitePool, id: i64, approved: bool, notes: &str) -> Result<bool> {
    let done = sqlx::query(
        "UPDATE media_assets SET is_moderated = 1, is_approved = ?, moderation_notes = ? WHERE id = ?",
    )
    .bind(approved)
    .bind(notes)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(done.rows_affected() > 0)
}
