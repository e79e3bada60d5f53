//! Tests for database initialization and the append-only audit log

use pollwatch_common::db::init::{init_database, SCHEMA_VERSION};
use sqlx::SqlitePool;

async fn fresh_db() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("pollwatch.db")).await.unwrap();
    (dir, pool)
}

async fn seed_observer(pool: &SqlitePool) -> i64 {
    sqlx::query(
        "INSERT INTO users (username, role, api_token, created_at) VALUES ('obs', 'observer', 'tok', '2027-08-09T06:00:00Z')",
    )
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("pollwatch.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pollwatch.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let (_dir, pool) = fresh_db().await;

    for table in [
        "users",
        "elections",
        "polling_stations",
        "station_updates",
        "incident_reports",
        "verifications",
        "media_assets",
        "live_streams",
    ] {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1, "table {} missing", table);
    }

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_verifications_cannot_be_updated() {
    let (_dir, pool) = fresh_db().await;
    let observer = seed_observer(&pool).await;

    let id = sqlx::query(
        "INSERT INTO verifications (submission_kind, submission_id, status, verified_by, created_at) VALUES ('incident', 1, 'verified', ?, '2027-08-09T07:00:00Z')",
    )
    .bind(observer)
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    let update = sqlx::query("UPDATE verifications SET status = 'disputed' WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await;
    assert!(update.is_err(), "UPDATE on verifications must abort");

    let status: String = sqlx::query_scalar("SELECT status FROM verifications WHERE id = ?")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "verified");
}

#[tokio::test]
async fn test_verifications_cannot_be_deleted() {
    let (_dir, pool) = fresh_db().await;
    let observer = seed_observer(&pool).await;

    sqlx::query(
        "INSERT INTO verifications (submission_kind, submission_id, status, verified_by, created_at) VALUES ('station_update', 1, 'disputed', ?, '2027-08-09T07:00:00Z')",
    )
    .bind(observer)
    .execute(&pool)
    .await
    .unwrap();

    let delete = sqlx::query("DELETE FROM verifications").execute(&pool).await;
    assert!(delete.is_err(), "DELETE on verifications must abort");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM verifications")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_pending_is_not_a_verification_result() {
    let (_dir, pool) = fresh_db().await;
    let observer = seed_observer(&pool).await;

    let insert = sqlx::query(
        "INSERT INTO verifications (submission_kind, submission_id, status, verified_by, created_at) VALUES ('incident', 1, 'pending', ?, '2027-08-09T07:00:00Z')",
    )
    .bind(observer)
    .execute(&pool)
    .await;
    assert!(insert.is_err());
}
