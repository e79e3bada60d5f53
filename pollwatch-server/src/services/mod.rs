//! Domain operations behind the HTTP handlers
//!
//! Services validate input, write through `crate::db`, and publish realtime
//! events explicitly once a write has committed.

pub mod media;
pub mod streams;
pub mod submissions;
pub mod users;
pub mod verification;

use pollwatch_common::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random URL-safe token of `len` characters
pub(crate) fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Reject negative counts
pub(crate) fn non_negative(field: &str, value: Option<i64>) -> Result<Option<i64>> {
    match value {
        Some(v) if v < 0 => Err(Error::validation(field, "must not be negative")),
        other => Ok(other),
    }
}

/// Trimmed text, `None` when blank
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional enum value given as text
pub(crate) fn parse_opt<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = Error>,
{
    value.map(str::parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollwatch_common::models::Severity;

    #[test]
    fn test_random_token_length_and_charset() {
        let token = random_token(24);
        assert_eq!(token.len(), 24);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, random_token(24));
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative("queue_length", Some(0)).unwrap(), Some(0));
        assert_eq!(non_negative("queue_length", None).unwrap(), None);
        assert!(non_negative("queue_length", Some(-1)).is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" gate ".into())), Some("gate".to_string()));
    }

    #[test]
    fn test_parse_opt() {
        let parsed: Option<Severity> = parse_opt(Some("high")).unwrap();
        assert_eq!(parsed, Some(Severity::High));
        assert!(parse_opt::<Severity>(Some("extreme")).is_err());
        assert_eq!(parse_opt::<Severity>(None).unwrap(), None);
    }
}
