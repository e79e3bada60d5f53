//! Verification audit log
//!
//! The table only ever sees INSERTs; storage-level triggers reject UPDATE
//! and DELETE.

use pollwatch_common::models::{
    Submission, SubmissionKind, UserRef, Verification, VerificationStatus,
};
use pollwatch_common::{time, Result};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

use super::submissions;

const SELECT_SQL: &str = "SELECT v.*, u.username AS verified_by_name \
     FROM verifications v JOIN users u ON u.id = v.verified_by";

fn verification_from_row(row: &SqliteRow) -> Result<Verification> {
    let kind: String = row.get("submission_kind");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(Verification {
        id: row.get("id"),
        submission_kind: kind.parse()?,
        submission_id: row.get("submission_id"),
        status: status.parse()?,
        verified_by: UserRef {
            id: row.get("verified_by"),
            username: row.get("verified_by_name"),
        },
        notes: row.get("notes"),
        created_at: time::from_db(&created_at)?,
    })
}

/// Append a verification and move the submission's cached status to match,
/// atomically.
///
/// The INSERT runs first so the transaction takes SQLite's write lock before
/// reading anything; concurrent verifications serialize on that lock and the
/// one committing last is both the newest row and the cached status.
/// Returns `None` (and writes nothing) when the submission does not exist.
pub async fn record_verification(
    pool: &SqlitePool,
    kind: SubmissionKind,
    submission_id: i64,
    verifier: &UserRef,
    status: VerificationStatus,
    notes: Option<&str>,
) -> Result<Option<(Verification, Submission)>> {
    let created_at = time::now();
    let created_at_db = time::to_db(&created_at);

    let mut tx = pool.begin().await?;

    let verification_id = sqlx::query(
        r#"
        INSERT INTO verifications (submission_kind, submission_id, status, verified_by, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(kind.as_str())
    .bind(submission_id)
    .bind(status.as_str())
    .bind(verifier.id)
    .bind(notes)
    .bind(&created_at_db)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let update_sql = format!(
        "UPDATE {} SET verification_status = ?, latest_verification_id = ?, verified_by = ?, \
         verified_at = ?, verification_notes = ?, updated_at = ? WHERE id = ?",
        kind.table()
    );
    let updated = sqlx::query(&update_sql)
        .bind(status.as_str())
        .bind(verification_id)
        .bind(verifier.id)
        .bind(&created_at_db)
        .bind(notes.unwrap_or(""))
        .bind(&created_at_db)
        .bind(submission_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    let submission = submissions::get_submission(&mut *tx, kind, submission_id).await?;
    tx.commit().await?;

    let verification = Verification {
        id: verification_id,
        submission_kind: kind,
        submission_id,
        status,
        verified_by: verifier.clone(),
        notes: notes.map(str::to_string),
        created_at,
    };

    Ok(submission.map(|s| (verification, s)))
}

/// Verifications of one submission in creation order
pub async fn history(
    pool: &SqlitePool,
    kind: SubmissionKind,
    submission_id: i64,
) -> Result<Vec<Verification>> {
    let sql = format!(
        "{} WHERE v.submission_kind = ? AND v.submission_id = ? ORDER BY v.id",
        SELECT_SQL
    );

    let rows = sqlx::query(&sql)
        .bind(kind.as_str())
        .bind(submission_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(verification_from_row).collect()
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    kind: Option<SubmissionKind>,
    status: Option<VerificationStatus>,
) {
    qb.push(" WHERE 1 = 1");
    if let Some(kind) = kind {
        qb.push(" AND v.submission_kind = ").push_bind(kind.as_str());
    }
    if let Some(status) = status {
        qb.push(" AND v.status = ").push_bind(status.as_str());
    }
}

/// Count verifications of `kind` / `status`
pub async fn count_verifications(
    pool: &SqlitePool,
    kind: Option<SubmissionKind>,
    status: Option<VerificationStatus>,
) -> Result<i64> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM verifications v");
    push_filters(&mut qb, kind, status);

    let count: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// Most recent verifications across all submissions, newest first
pub async fn list_verifications(
    pool: &SqlitePool,
    kind: Option<SubmissionKind>,
    status: Option<VerificationStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Verification>> {
    let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_SQL);
    push_filters(&mut qb, kind, status);
    qb.push(" ORDER BY v.id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(verification_from_row).collect()
}
