//! Error types for the newsgate collector
//!
//! This module defines the domain-specific error types used throughout the crate.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code
    #[error("Server responded with status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded (last status: {last_status:?})")]
    MaxRetriesExceeded { last_status: Option<u16> },

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Whether a later attempt at the same URL could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::MaxRetriesExceeded { .. } => true,
            Self::Status(code) => matches!(code, 429 | 500..=599),
            Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that can occur while parsing page content
#[derive(Error, Debug)]
pub enum ParseError {
    /// A CSS selector could not be compiled
    #[error("Invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A URL could not be parsed or resolved
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A date string did not match any known representation
    #[error("Unrecognized date: {0}")]
    InvalidDate(String),

    /// A timezone name is not in the IANA database
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Syntax { path: String, reason: String },

    /// A site entry is missing a required field
    #[error("Site #{index} ({name}): missing required field `{field}`")]
    MissingField {
        index: usize,
        name: String,
        field: &'static str,
    },

    /// A site entry carries an invalid pattern
    #[error("Site `{site}`: invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        site: String,
        pattern: String,
        reason: String,
    },

    /// A site entry carries an invalid selector
    #[error("Site `{site}`: {source}")]
    InvalidSelector {
        site: String,
        #[source]
        source: ParseError,
    },

    /// A value is outside its permitted range
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// General collection errors
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// The run hit its wall-clock deadline
    #[error("Run deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_recoverability() {
        assert!(FetchError::Timeout.is_recoverable());
        assert!(FetchError::Status(503).is_recoverable());
        assert!(FetchError::Status(429).is_recoverable());
        assert!(!FetchError::Status(404).is_recoverable());
        assert!(!FetchError::Decode("bad".into()).is_recoverable());
    }

    #[test]
    fn test_missing_field_message_names_site() {
        let err = ConfigError::MissingField {
            index: 2,
            name: "Міністерство".to_string(),
            field: "allow_patterns",
        };
        let msg = err.to_string();
        assert!(msg.contains("#2"));
        assert!(msg.contains("allow_patterns"));
    }
}
