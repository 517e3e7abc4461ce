use crate::command::SessionCommand;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("Offline")]
    Offline,

    #[error("Network error: {0}")]
    Network(String),

    #[error("No response after {0}ms")]
    Timeout(u64),

    #[error("Remote failure: {0}")]
    Remote(String),

    #[error("Transcript error: {0}")]
    Transcript(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Serialization(e.to_string())
    }
}

impl SessionError {
    /// Bucket this error for the participant-facing error surface.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::Offline | SessionError::Network(_) | SessionError::Timeout(_) => {
                ErrorCategory::Connectivity
            }
            SessionError::Remote(_) => ErrorCategory::RemoteFailure,
            _ => ErrorCategory::Unknown,
        }
    }
}

/// Which kind of thing went wrong, from the participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    /// Offline, dropped stream, or deadline exceeded; retry once back online
    Connectivity,
    /// The collaborator reported an error; retrying the same request may work
    RemoteFailure,
    /// The request could not even be initiated
    Unknown,
}

/// The single active participant-facing error, if any.
///
/// A new failure replaces the previous one; `retry` is bound whenever the
/// failure is tied to a specific prior operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorState {
    pub message: String,
    pub category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retry: Option<SessionCommand>,
}

impl ErrorState {
    pub fn from_error(err: &SessionError, retry: Option<SessionCommand>) -> Self {
        Self {
            message: err.to_string(),
            category: err.category(),
            retry,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry.is_some()
    }
}
