//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and creates every table
//! idempotently. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets dashboards read while a verification commits
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables, indexes and triggers (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;

    // Reference data
    create_elections_table(pool).await?;
    create_polling_stations_table(pool).await?;

    // Submissions and their audit log
    create_station_updates_table(pool).await?;
    create_incident_reports_table(pool).await?;
    create_verifications_table(pool).await?;

    // Media and streaming
    create_media_assets_table(pool).await?;
    create_live_streams_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL CHECK (role IN ('admin', 'observer', 'citizen')),
            api_token TEXT NOT NULL UNIQUE,
            organization TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_elections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS elections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            date TEXT NOT NULL,
            election_type TEXT NOT NULL CHECK (election_type IN ('general', 'by_election', 'referendum')),
            description TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_elections_active ON elections(is_active)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_polling_stations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS polling_stations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            code TEXT NOT NULL UNIQUE,
            constituency TEXT NOT NULL DEFAULT '',
            county TEXT NOT NULL DEFAULT '',
            latitude REAL,
            longitude REAL,
            registered_voters INTEGER NOT NULL DEFAULT 0 CHECK (registered_voters >= 0),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_station_updates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_updates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            election_id INTEGER NOT NULL REFERENCES elections(id),
            polling_station_id INTEGER NOT NULL REFERENCES polling_stations(id),
            update_type TEXT NOT NULL,
            opening_time TEXT,
            closing_time TEXT,
            estimated_turnout INTEGER CHECK (estimated_turnout IS NULL OR estimated_turnout >= 0),
            queue_wait_time INTEGER CHECK (queue_wait_time IS NULL OR queue_wait_time >= 0),
            queue_length INTEGER CHECK (queue_length IS NULL OR queue_length >= 0),
            status_notes TEXT NOT NULL DEFAULT '',
            photo_url TEXT NOT NULL DEFAULT '',
            video_url TEXT NOT NULL DEFAULT '',
            latitude REAL,
            longitude REAL,
            is_anonymous INTEGER NOT NULL DEFAULT 0,
            submitted_by INTEGER REFERENCES users(id),
            verification_status TEXT NOT NULL DEFAULT 'pending',
            latest_verification_id INTEGER,
            verified_by INTEGER REFERENCES users(id),
            verified_at TEXT,
            verification_notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_station_updates_election ON station_updates(election_id, polling_station_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_station_updates_status ON station_updates(verification_status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_incident_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS incident_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            election_id INTEGER NOT NULL REFERENCES elections(id),
            polling_station_id INTEGER REFERENCES polling_stations(id),
            incident_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            description TEXT NOT NULL,
            location_description TEXT NOT NULL DEFAULT '',
            photo_url TEXT NOT NULL DEFAULT '',
            video_url TEXT NOT NULL DEFAULT '',
            responded_to INTEGER NOT NULL DEFAULT 0,
            response_notes TEXT NOT NULL DEFAULT '',
            latitude REAL,
            longitude REAL,
            is_anonymous INTEGER NOT NULL DEFAULT 1,
            submitted_by INTEGER REFERENCES users(id),
            verification_status TEXT NOT NULL DEFAULT 'pending',
            latest_verification_id INTEGER,
            verified_by INTEGER REFERENCES users(id),
            verified_at TEXT,
            verification_notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_incident_reports_election ON incident_reports(election_id, incident_type)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_incident_reports_status ON incident_reports(verification_status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Verification audit log
///
/// Rows can only be inserted; the triggers abort any UPDATE or DELETE.
async fn create_verifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            submission_kind TEXT NOT NULL CHECK (submission_kind IN ('station_update', 'incident')),
            submission_id INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('verified', 'disputed', 'unverified', 'resolved')),
            verified_by INTEGER NOT NULL REFERENCES users(id),
            notes TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_verifications_submission ON verifications(submission_kind, submission_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS verifications_no_update
        BEFORE UPDATE ON verifications
        BEGIN
            SELECT RAISE(ABORT, 'verifications are append-only');
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS verifications_no_delete
        BEFORE DELETE ON verifications
        BEGIN
            SELECT RAISE(ABORT, 'verifications are append-only');
        END
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_media_assets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS media_assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_ref TEXT NOT NULL,
            media_type TEXT NOT NULL CHECK (media_type IN ('photo', 'video', 'audio')),
            file_name TEXT NOT NULL DEFAULT '',
            mime_type TEXT NOT NULL DEFAULT '',
            file_size INTEGER CHECK (file_size IS NULL OR file_size >= 0),
            submission_kind TEXT,
            submission_id INTEGER,
            latitude REAL,
            longitude REAL,
            captured_at TEXT,
            uploaded_by INTEGER REFERENCES users(id),
            is_anonymous INTEGER NOT NULL DEFAULT 0,
            is_moderated INTEGER NOT NULL DEFAULT 0,
            is_approved INTEGER NOT NULL DEFAULT 1,
            moderation_notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_media_assets_submission ON media_assets(submission_kind, submission_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_live_streams_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS live_streams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            stream_key TEXT NOT NULL UNIQUE,
            stream_type TEXT NOT NULL DEFAULT 'video',
            state TEXT NOT NULL DEFAULT 'created' CHECK (state IN ('created', 'live', 'paused', 'ended')),
            viewer_count INTEGER NOT NULL DEFAULT 0,
            peak_viewers INTEGER NOT NULL DEFAULT 0,
            total_views INTEGER NOT NULL DEFAULT 0,
            election_id INTEGER REFERENCES elections(id),
            polling_station_id INTEGER REFERENCES polling_stations(id),
            latitude REAL,
            longitude REAL,
            started_at TEXT,
            ended_at TEXT,
            last_heartbeat_at TEXT,
            created_by INTEGER REFERENCES users(id),
            is_anonymous INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_live_streams_state ON live_streams(state)")
        .execute(pool)
        .await?;

    Ok(())
}
