//! Error types for the sync layer.

use rep_model::{MissingParent, ValidationError};
use rep_persistence::PersistenceError;
use thiserror::Error;

/// Errors surfaced to views by mutations and queries.
///
/// `Clone` so that one failed fetch can be delivered to every subscriber
/// sharing it.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Input failed a domain constraint; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced workout or exercise does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The storage medium could not be read or written.
    #[error("storage error: {detail}")]
    Io {
        detail: String,
        message: String,
        suggestion: Option<String>,
    },

    /// Concurrent writers kept moving the snapshot revision.
    #[error("snapshot kept changing; gave up after {attempts} attempts")]
    Conflict { attempts: u32 },

    /// The remote service could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The remote service answered with an unexpected status.
    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The task running the operation ended without a result.
    #[error("operation cancelled")]
    Cancelled,
}

impl SyncError {
    /// Returns a user-friendly error message suitable for display in a view.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.message.clone(),
            Self::NotFound(what) => format!("{what}. It may have been deleted."),
            Self::Io { message, .. } => message.clone(),
            Self::Conflict { .. } => {
                "Your workouts changed elsewhere while saving. Please try again.".to_string()
            }
            Self::Network(_) => {
                "Could not reach the server. Please check your connection.".to_string()
            }
            Self::Api { .. } => "The server could not complete the request.".to_string(),
            Self::Cancelled => "The operation was interrupted.".to_string(),
        }
    }

    /// Form field the error belongs to, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(e) => Some(e.field),
            _ => None,
        }
    }

    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Conflict { .. } | Self::Network(_)
        ) || matches!(self, Self::Api { status, .. } if *status >= 500)
    }

    /// What the user can do about it, if anything.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { suggestion, .. } => suggestion.clone(),
            Self::Network(_) => Some("Check the server address and that it is running.".into()),
            _ if self.is_retryable() => Some("Run the command again.".into()),
            _ => None,
        }
    }
}

impl From<MissingParent> for SyncError {
    fn from(err: MissingParent) -> Self {
        Self::NotFound(err.to_string())
    }
}

impl From<PersistenceError> for SyncError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Conflict { .. } => Self::Conflict { attempts: 1 },
            other => Self::Io {
                detail: other.to_string(),
                message: other.user_message(),
                suggestion: other.suggestion(),
            },
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
