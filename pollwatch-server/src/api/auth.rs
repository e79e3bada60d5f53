//! Caller resolution
//!
//! `Authorization: Bearer <token>` resolves to an [`Actor`]. No header means
//! an anonymous caller; a header with an unknown token is rejected with 401.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use pollwatch_common::models::Actor;

use crate::db::users;
use crate::error::ApiError;
use crate::AppState;

/// The caller, if credentials were supplied
pub struct MaybeActor(pub Option<Actor>);

/// A caller that must be authenticated
pub struct RequireActor(pub Actor);

/// A caller that must be an administrator
pub struct AdminActor(pub Actor);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Some)
        .ok_or_else(|| ApiError::Unauthorized("malformed Authorization header".to_string()))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            return Ok(MaybeActor(None));
        };

        match users::find_by_token(&state.db, token).await? {
            Some(actor) => Ok(MaybeActor(Some(actor))),
            None => Err(ApiError::Unauthorized("unknown API token".to_string())),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeActor(actor) = MaybeActor::from_request_parts(parts, state).await?;
        actor
            .map(RequireActor)
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireActor(actor) = RequireActor::from_request_parts(parts, state).await?;
        if actor.is_admin() {
            Ok(AdminActor(actor))
        } else {
            Err(ApiError::PermissionDenied(
                "administrator role required".to_string(),
            ))
        }
    }
}
