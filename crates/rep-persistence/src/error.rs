//! Persistence error types.
//!
//! All persistence operations return structured errors that provide
//! user-friendly messages and optional remediation hints.

use std::path::PathBuf;

use rep_model::Revision;
use thiserror::Error;

/// Persistence operation error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Medium I/O error.
    #[error("Failed to {operation} {target}")]
    Io {
        operation: &'static str,
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored data is not a readable snapshot.
    #[error("Stored snapshot in {target} is corrupt: {reason}")]
    Corrupt { target: String, reason: String },

    /// Stored data was written by a newer schema.
    #[error("Snapshot schema version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion { found: u32, max_supported: u32 },

    /// Snapshot could not be encoded; nothing was written.
    #[error("Failed to serialize snapshot")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete write to {}", target_path.display())]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored revision moved since the writer read it.
    #[error("Snapshot revision conflict: expected {expected}, found {found}")]
    Conflict { expected: Revision, found: Revision },

    /// A blocking I/O task panicked or was cancelled.
    #[error("Storage task failed")]
    TaskFailed {
        #[source]
        source: tokio::task::JoinError,
    },
}

impl PersistenceError {
    /// Whether the medium holds data that cannot be decoded, as opposed to
    /// data that could not be reached.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, target, ..
            } => format!("Could not {operation} your workout data at {target}."),
            Self::Corrupt { target, .. } => {
                format!("The workout data at {target} could not be read. It is kept aside as a .corrupt copy once new data is saved.")
            }
            Self::UnsupportedVersion {
                found,
                max_supported,
            } => format!(
                "Your workout data was saved by a newer version of Rep \
                (format {found}, this version supports up to {max_supported})."
            ),
            Self::Serialization { .. } => {
                "An error occurred while saving your workouts. Nothing was changed.".to_string()
            }
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not save to {}. Please check disk space and permissions.",
                target_path.display()
            ),
            Self::Conflict { .. } => {
                "Your workouts were changed somewhere else at the same time. Please try again."
                    .to_string()
            }
            Self::TaskFailed { .. } => "A storage task stopped unexpectedly.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that the data directory exists and is readable.".into())
                } else {
                    Some("Check that you have permission to write to the data directory.".into())
                }
            }
            Self::Corrupt { .. } => {
                Some("Repair the .corrupt copy by hand, or keep logging to start fresh.".into())
            }
            Self::UnsupportedVersion { .. } => Some("Update Rep to the latest version.".into()),
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or choose a different data directory.".into())
            }
            Self::Conflict { .. } => Some("Retry the change.".into()),
            Self::Serialization { .. } | Self::TaskFailed { .. } => None,
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
