//! Common error types for PollWatch

use thiserror::Error;

/// Common result type for PollWatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the PollWatch crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or missing input, tagged with the offending field
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Actor lacks the capability required for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation not allowed in the record's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a validation error for `field`
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_names_field() {
        let err = Error::validation("severity", "is required");
        assert_eq!(err.to_string(), "Invalid severity: is required");
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::NotFound("election 7".to_string());
        assert_eq!(err.to_string(), "Not found: election 7");
    }
}
