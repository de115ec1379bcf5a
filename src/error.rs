//! Error types for hon-rs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad input, rejected before any mutation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request collides with current state (book completed, goal
    /// resolved, progress not improving).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether retrying the same operation later may succeed.
    ///
    /// Queue workers leave a message for redelivery on transient errors and
    /// drop it otherwise.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Database(e) => !matches!(
                e,
                sqlx::Error::RowNotFound
                    | sqlx::Error::ColumnDecode { .. }
                    | sqlx::Error::ColumnNotFound(_)
                    | sqlx::Error::TypeNotFound { .. }
                    | sqlx::Error::Decode(_)
            ),
            _ => false,
        }
    }

    /// Map a unique-constraint violation to [`Error::Conflict`].
    pub(crate) fn unique_violation(err: sqlx::Error, what: impl Into<String>) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::Conflict(what.into())
            }
            other => Error::Database(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
