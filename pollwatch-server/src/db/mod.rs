//! Database access layer
//!
//! One module per table family. Functions take the pool (or a generic
//! executor where they must also run inside the verification transaction)
//! and return domain models from `pollwatch_common::models`.

pub mod elections;
pub mod media;
pub mod streams;
pub mod submissions;
pub mod users;
pub mod verifications;

use pollwatch_common::models::{Location, UserRef};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Read an optional `latitude` / `longitude` column pair
pub(crate) fn location_from_row(row: &SqliteRow) -> Option<Location> {
    let latitude: Option<f64> = row.get("latitude");
    let longitude: Option<f64> = row.get("longitude");
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Location { latitude, longitude }),
        _ => None,
    }
}

/// Read a user reference from an id column and a joined username column
pub(crate) fn user_ref_from_row(row: &SqliteRow, id_col: &str, name_col: &str) -> Option<UserRef> {
    let id: Option<i64> = row.get(id_col);
    let username: Option<String> = row.get(name_col);
    match (id, username) {
        (Some(id), Some(username)) => Some(UserRef { id, username }),
        _ => None,
    }
}
