//! Error handling for the sync engine
//!
//! Local persistence and remote failures never undo a local mutation; they
//! are logged, counted and surfaced through the sync status. Only rejected
//! input reaches the caller as an error.

use std::time::Duration;

use fitlog_shared::PlanBuilderError;
use thiserror::Error;
use validator::ValidationErrors;

/// Durable local storage failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Remote store failures
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode remote row: {0}")]
    Decode(String),

    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Not signed in")]
    NotAuthenticated,
}

impl RemoteError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Http(_) | RemoteError::Timeout(_) => true,
            RemoteError::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            RemoteError::Decode(_) | RemoteError::MissingField(_) | RemoteError::NotAuthenticated => {
                false
            }
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

/// Errors returned by the [`crate::Tracker`] facade
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid plan: {0}")]
    PlanBuilder(#[from] PlanBuilderError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(RemoteError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(RemoteError::Status { status: 503, message: String::new() }.is_transient());
        assert!(RemoteError::Status { status: 429, message: String::new() }.is_transient());
        assert!(!RemoteError::Status { status: 401, message: String::new() }.is_transient());
        assert!(!RemoteError::MissingField("session_date").is_transient());
    }

    #[test]
    fn test_decode_error_from_serde() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let remote: RemoteError = err.into();
        assert!(matches!(remote, RemoteError::Decode(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = TrackerError::NotFound("plan plan-1".to_string());
        assert_eq!(err.to_string(), "Resource not found: plan plan-1");

        let err = RemoteError::Status { status: 404, message: "missing".to_string() };
        assert_eq!(err.to_string(), "Remote returned 404: missing");
    }
}
