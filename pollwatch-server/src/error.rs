//! API error type
//!
//! Every handler returns `ApiResult<T>`; errors render as
//! `{"error": {"code": ..., "message": ..., "field": ...}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid input (400)
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Missing or unknown credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Operation not legal in the resource's current state (409)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::PermissionDenied(_) => "PERMISSION_DENIED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<pollwatch_common::Error> for ApiError {
    fn from(err: pollwatch_common::Error) -> Self {
        use pollwatch_common::Error;

        match err {
            Error::Validation { field, message } => ApiError::Validation { field, message },
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::PermissionDenied(msg) => ApiError::PermissionDenied(msg),
            Error::InvalidState(msg) => ApiError::InvalidState(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::from(pollwatch_common::Error::Database(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            ApiError::Validation { field, message } => json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": field,
                }
            }),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                json!({
                    "error": {
                        "code": code,
                        "message": msg,
                    }
                })
            }
            ApiError::Unauthorized(msg)
            | ApiError::PermissionDenied(msg)
            | ApiError::NotFound(msg)
            | ApiError::InvalidState(msg) => json!({
                "error": {
                    "code": code,
                    "message": msg,
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_status_codes() {
        use pollwatch_common::Error;

        let cases = [
            (Error::validation("status", "bad"), StatusCode::BAD_REQUEST),
            (Error::NotFound("incident 9".into()), StatusCode::NOT_FOUND),
            (Error::PermissionDenied("no".into()), StatusCode::FORBIDDEN),
            (Error::InvalidState("ended".into()), StatusCode::CONFLICT),
            (Error::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_validation_keeps_field() {
        match ApiError::from(pollwatch_common::Error::validation("severity", "required")) {
            ApiError::Validation { field, .. } => assert_eq!(field, "severity"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
