//! Elections and polling stations

use chrono::NaiveDate;
use pollwatch_common::models::{Election, ElectionType, Location, PollingStation};
use pollwatch_common::{time, Error, Result};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use super::location_from_row;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn election_from_row(row: &SqliteRow) -> Result<Election> {
    let date: String = row.get("date");
    let election_type: String = row.get("election_type");
    let created_at: String = row.get("created_at");

    Ok(Election {
        id: row.get("id"),
        name: row.get("name"),
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .map_err(|e| Error::Internal(format!("Failed to parse election date '{}': {}", date, e)))?,
        election_type: election_type.parse()?,
        description: row.get("description"),
        is_active: row.get("is_active"),
        created_at: time::from_db(&created_at)?,
    })
}

fn station_from_row(row: &SqliteRow) -> Result<PollingStation> {
    let created_at: String = row.get("created_at");

    Ok(PollingStation {
        id: row.get("id"),
        name: row.get("name"),
        code: row.get("code"),
        constituency: row.get("constituency"),
        county: row.get("county"),
        location: location_from_row(row),
        registered_voters: row.get("registered_voters"),
        created_at: time::from_db(&created_at)?,
    })
}

pub async fn insert_election(
    pool: &SqlitePool,
    name: &str,
    date: NaiveDate,
    election_type: ElectionType,
    description: &str,
    is_active: bool,
) -> Result<Election> {
    let created_at = time::now();

    let id = sqlx::query(
        r#"
        INSERT INTO elections (name, date, election_type, description, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(date.format(DATE_FORMAT).to_string())
    .bind(election_type.as_str())
    .bind(description)
    .bind(is_active)
    .bind(time::to_db(&created_at))
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(Election {
        id,
        name: name.to_string(),
        date,
        election_type,
        description: description.to_string(),
        is_active,
        created_at,
    })
}

pub async fn get_election(pool: &SqlitePool, id: i64) -> Result<Option<Election>> {
    let row = sqlx::query("SELECT * FROM elections WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(election_from_row).transpose()
}

/// List elections, newest date first
pub async fn list_elections(pool: &SqlitePool, active_only: bool) -> Result<Vec<Election>> {
    let rows = if active_only {
        sqlx::query("SELECT * FROM elections WHERE is_active = 1 ORDER BY date DESC, id DESC")
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query("SELECT * FROM elections ORDER BY date DESC, id DESC")
            .fetch_all(pool)
            .await?
    };

    rows.iter().map(election_from_row).collect()
}

pub async fn insert_station(
    pool: &SqlitePool,
    name: &str,
    code: &str,
    constituency: &str,
    county: &str,
    location: Option<Location>,
    registered_voters: i64,
) -> Result<PollingStation> {
    let created_at = time::now();

    let result = sqlx::query(
        r#"
        INSERT INTO polling_stations
            (name, code, constituency, county, latitude, longitude, registered_voters, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(code)
    .bind(constituency)
    .bind(county)
    .bind(location.map(|l| l.latitude))
    .bind(location.map(|l| l.longitude))
    .bind(registered_voters)
    .bind(time::to_db(&created_at))
    .execute(pool)
    .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(Error::validation(
                "code",
                format!("polling station code '{}' already exists", code),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(PollingStation {
        id,
        name: name.to_string(),
        code: code.to_string(),
        constituency: constituency.to_string(),
        county: county.to_string(),
        location,
        registered_voters,
        created_at,
    })
}

pub async fn get_station(pool: &SqlitePool, id: i64) -> Result<Option<PollingStation>> {
    let row = sqlx::query("SELECT * FROM polling_stations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(station_from_row).transpose()
}

/// List polling stations, optionally narrowed to one constituency
pub async fn list_stations(
    pool: &SqlitePool,
    constituency: Option<&str>,
) -> Result<Vec<PollingStation>> {
    let rows = match constituency {
        Some(constituency) => {
            sqlx::query("SELECT * FROM polling_stations WHERE constituency = ? ORDER BY name")
                .bind(constituency)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query("SELECT * FROM polling_stations ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(station_from_row).collect()
}
