//! # Monitor Error Taxonomy
//!
//! Errors are split into fail-closed categories (identity, nonce, XSRF and
//! task-hub validation) that always surface to the caller, and storage
//! failures that only surface when no degraded path exists.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// Bad or missing credentials, nonce or XSRF mismatch, disallowed user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Task hub name failed the syntactic check.
    #[error("Invalid task hub name: {0}")]
    InvalidTaskHubName(String),

    /// Task hub name is well-formed but not in the allow-list.
    #[error("Task hub is not allowed: {0}")]
    TaskHubNotAllowed(String),

    /// Write attempted in read-only mode.
    #[error("Access violation: {0}")]
    AccessViolation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl MonitorError {
    /// True for every category that must be reported as 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            MonitorError::Unauthorized(_)
                | MonitorError::InvalidTaskHubName(_)
                | MonitorError::TaskHubNotAllowed(_)
        )
    }

    pub fn storage(message: impl Into<String>) -> Self {
        MonitorError::Storage(message.into())
    }
}

impl From<sqlx::Error> for MonitorError {
    fn from(err: sqlx::Error) -> Self {
        MonitorError::Storage(err.to_string())
    }
}

impl From<crate::config::ConfigurationError> for MonitorError {
    fn from(err: crate::config::ConfigurationError) -> Self {
        MonitorError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
