use civic_shared::{ParseError, TransitionError};
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A query expected exactly one row but found none, or the row exists
    /// but is not owned by the caller.
    #[error("Record not found")]
    NotFound,

    /// Input that references something that cannot be used (unknown
    /// category, reply parent on another issue, ...).
    #[error("Invalid input: {0}")]
    Invalid(&'static str),

    /// The caller may not perform this action on an existing record.
    #[error("Not permitted: {0}")]
    Forbidden(&'static str),

    /// The resolution state machine refused the event.
    #[error("Resolution conflict: {0}")]
    Conflict(#[from] TransitionError),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A persisted enum column holds an unknown value.
    #[error("Corrupt column: {0}")]
    Parse(#[from] ParseError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Map `QueryReturnedNoRows` to [`StoreError::NotFound`].
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}
