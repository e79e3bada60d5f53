//! Users and API tokens

use pollwatch_common::models::{Actor, Role};
use pollwatch_common::{time, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

fn actor_from_row(row: &SqliteRow) -> Result<Actor> {
    let role: String = row.get("role");
    Ok(Actor {
        id: row.get("id"),
        username: row.get("username"),
        role: role.parse()?,
        organization: row.get("organization"),
    })
}

/// Insert a user holding `api_token`
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    role: Role,
    organization: &str,
    api_token: &str,
) -> Result<Actor> {
    let created_at = time::to_db(&time::now());

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, role, api_token, organization, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(username)
    .bind(role.as_str())
    .bind(api_token)
    .bind(organization)
    .bind(&created_at)
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(Actor {
            id: done.last_insert_rowid(),
            username: username.to_string(),
            role,
            organization: organization.to_string(),
        }),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            Error::validation("username", format!("'{}' is already taken", username)),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Resolve the actor holding `token`
pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Actor>> {
    let row = sqlx::query(
        "SELECT id, username, role, organization FROM users WHERE api_token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(actor_from_row).transpose()
}

/// Whether some user already holds `token`
pub async fn token_exists(pool: &SqlitePool, token: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE api_token = ?")
        .bind(token)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Whether `username` is taken
pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}
