//! Error types for autopost.

use std::fmt;

use thiserror::Error;

/// Result alias used across the library.
pub type AutopostResult<T> = Result<T, AutopostError>;

/// Errors that can occur while researching, generating or publishing posts.
#[derive(Debug, Error)]
pub enum AutopostError {
    /// An external API call failed (X or the language model).
    #[error("{service} API call failed{}: {message}", status_suffix(.status))]
    Api {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// A post text violated a content constraint.
    #[error("Validation failed: {0}")]
    Validation(Violation),

    /// Generation gave up after the retry bound was reached.
    #[error("Generation failed after {attempts} attempts (last issue: {last})")]
    RetriesExhausted { attempts: u32, last: Violation },

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A prompt template failed to compile or render.
    #[error("Prompt template error: {0}")]
    Prompt(String),

    /// Slot table has no free slot inside the lookahead horizon.
    #[error("No free slot within {days} days")]
    NoFreeSlot { days: u32 },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AutopostError {
    /// Build an API error for the given service.
    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            status: None,
            message: message.into(),
        }
    }

    /// Build an API error carrying an HTTP status.
    pub fn api_status(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            status: Some(status),
            message: message.into(),
        }
    }

    /// HTTP status of an API error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this error came from content validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::RetriesExhausted { .. })
    }
}

/// A content constraint a post text broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Longer than the character ceiling.
    TooLong { chars: usize, max: usize },
    /// Shorter than the character floor.
    TooShort { chars: usize, min: usize },
    /// Contains `#` or its full-width form.
    Hashtag,
    /// Contains a banned phrase.
    BannedPhrase(String),
    /// Contains a URL.
    Url,
    /// Contains an `@` mention.
    Mention,
    /// Empty after cleaning.
    Empty,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TooLong { chars, max } => {
                write!(f, "too long ({chars} chars, max {max})")
            }
            Violation::TooShort { chars, min } => {
                write!(f, "too short ({chars} chars, min {min})")
            }
            Violation::Hashtag => write!(f, "contains a hashtag"),
            Violation::BannedPhrase(phrase) => write!(f, "contains banned phrase \"{phrase}\""),
            Violation::Url => write!(f, "contains a URL"),
            Violation::Mention => write!(f, "contains a mention"),
            Violation::Empty => write!(f, "empty text"),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl From<reqwest::Error> for AutopostError {
    fn from(err: reqwest::Error) -> Self {
        Self::Api {
            service: "http",
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_includes_status() {
        let err = AutopostError::api_status("x", 403, "forbidden");
        assert_eq!(err.to_string(), "x API call failed (403): forbidden");
        assert_eq!(err.status(), Some(403));

        let err = AutopostError::api("anthropic", "timeout");
        assert_eq!(err.to_string(), "anthropic API call failed: timeout");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_validation_classification() {
        assert!(AutopostError::Validation(Violation::Hashtag).is_validation());
        assert!(AutopostError::RetriesExhausted {
            attempts: 3,
            last: Violation::Url
        }
        .is_validation());
        assert!(!AutopostError::api("x", "boom").is_validation());
    }
}
