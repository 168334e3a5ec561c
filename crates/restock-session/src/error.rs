//! Session error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Session is not authenticated")]
    NotAuthenticated,

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Notification failed: {0}")]
    Notify(String),
}

impl SessionError {
    /// Whether the failure looks transient (transport or server side).
    ///
    /// Used for log classification only; stock checks are retried regardless.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::HttpClient(_) => true,
            SessionError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
