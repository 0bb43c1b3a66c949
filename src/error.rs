//! Error types for tasklens
//!
//! Failure classes:
//! - Validation: detected before any remote write, optimistic state untouched
//! - Remote: the store rejected or timed out an operation; when an optimistic
//!   mutation was already applied, the issuing cache rolls it back first
//! - Ambient: config loading and (de)serialization

use thiserror::Error;

/// Main error type for tasklens operations
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (no write issued)
    #[error("A category named {0:?} already exists")]
    DuplicateName(String),

    #[error("Invalid due date: {0:?}")]
    InvalidDueDate(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    // Remote store failures (opaque transport cause preserved)
    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(anyhow::Error),

    #[error("Remote read failed: {0}")]
    RemoteReadFailed(anyhow::Error),

    #[error("Malformed document {id}: {source}")]
    MalformedDocument {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    // Ambient failures
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Validation errors are returned before any remote write is issued and
    /// leave the optimistic cache untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::DuplicateName(_) | Error::InvalidDueDate(_) | Error::NotFound { .. }
        )
    }

    /// Wrap a transport-level write failure, preserving the cause.
    pub fn remote_write(cause: impl Into<anyhow::Error>) -> Self {
        Error::RemoteWriteFailed(cause.into())
    }

    /// Wrap a transport-level read failure, preserving the cause.
    pub fn remote_read(cause: impl Into<anyhow::Error>) -> Self {
        Error::RemoteReadFailed(cause.into())
    }

    /// Shorthand for a missing task id.
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "Task",
            id: id.into(),
        }
    }

    /// Shorthand for a missing category id.
    pub fn category_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "Category",
            id: id.into(),
        }
    }
}

/// Result type alias for tasklens operations
pub type Result<T> = std::result::Result<T, Error>;
