// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for a single extraction or interaction step.
pub type StepResult<T> = std::result::Result<T, StepError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The rendered document source failed
    #[error("Browser error: {0}")]
    Browser(String),

    /// Authentication could not be established
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Publishing failed (only surfaced in strict mode)
    #[error("Publish error: {0}")]
    Publish(String),

    /// A single step (lookup, wait, parse) failed
    #[error(transparent)]
    Step(#[from] StepError),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a browser error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }
}

/// Failure of one step; the caller decides whether it is fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The target element or value is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// A bounded wait expired
    #[error("timed out after {}s waiting for {what}", .after.as_secs_f64())]
    Timeout { what: String, after: Duration },

    /// The target exists but could not be interpreted
    #[error("malformed {0}")]
    Malformed(String),
}

impl StepError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    pub fn malformed(what: impl Into<String>) -> Self {
        Self::Malformed(what.into())
    }
}
