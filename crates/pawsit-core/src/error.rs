//! Core error types for pawsit-core.
//!
//! Errors are split by concern using thiserror: one enum for everything
//! that can go wrong while talking to the availability backend, one for
//! configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the availability backend and the sync engine.
#[derive(Error, Debug)]
pub enum AvailabilityError {
    /// Transport-level failure (connection refused, timeout, TLS, ...)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with an unexpected non-2xx status
    #[error("Availability API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The acting user lacks the sitter role required to own availability
    #[error("User is not eligible to publish availability")]
    NotEligible,

    /// Missing or rejected bearer credential
    #[error("Authentication required")]
    Unauthorized,

    /// A date that is not a canonical `YYYY-MM-DD` civil date
    #[error("Invalid civil date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The backend body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
}

impl AvailabilityError {
    /// Maps a non-success HTTP status to the matching error.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status {
            reqwest::StatusCode::UNAUTHORIZED => Self::Unauthorized,
            reqwest::StatusCode::FORBIDDEN => Self::NotEligible,
            _ => Self::Api {
                status: status.as_u16(),
                body,
            },
        }
    }

    /// Whether the failure is the role check rather than a generic fault.
    pub fn is_not_eligible(&self) -> bool {
        matches!(self, Self::NotEligible)
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
