//! User provisioning
//!
//! Login and passwords are out of scope; administrators create users and
//! hand them the generated API token.

use pollwatch_common::models::{Actor, Role};
use pollwatch_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::{non_blank, random_token};
use crate::db::users;

const TOKEN_LENGTH: usize = 40;

#[derive(Debug, Default, Deserialize)]
pub struct NewUserRequest {
    pub username: Option<String>,
    pub role: Option<String>,
    pub organization: Option<String>,
}

/// Created user with their token (returned once)
#[derive(Debug, Serialize)]
pub struct IssuedUser {
    pub user: Actor,
    pub api_token: String,
}

pub async fn create_user(
    pool: &SqlitePool,
    request: NewUserRequest,
    actor: &Actor,
) -> Result<IssuedUser> {
    if !actor.is_admin() {
        return Err(Error::PermissionDenied(
            "only administrators can create users".to_string(),
        ));
    }

    let username =
        non_blank(request.username).ok_or_else(|| Error::validation("username", "required"))?;
    let role: Role = request
        .role
        .as_deref()
        .unwrap_or("citizen")
        .parse()?;
    let organization = request.organization.unwrap_or_default();

    let api_token = random_token(TOKEN_LENGTH);
    let user = users::insert_user(pool, &username, role, &organization, &api_token).await?;
    info!("User '{}' created with role {} by {}", user.username, role, actor.username);

    Ok(IssuedUser { user, api_token })
}

/// Ensure an administrator holding `token` exists. Returns true when one was
/// created.
pub async fn bootstrap_admin(pool: &SqlitePool, token: &str) -> Result<bool> {
    if users::token_exists(pool, token).await? {
        return Ok(false);
    }

    let mut username = "admin".to_string();
    let mut suffix = 1;
    while users::username_exists(pool, &username).await? {
        suffix += 1;
        username = format!("admin{}", suffix);
    }

    users::insert_user(pool, &username, Role::Admin, "", token).await?;
    warn!("Created bootstrap administrator '{}'", username);
    Ok(true)
}
