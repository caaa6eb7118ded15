//! Error types for symdb

use thiserror::Error;

/// Result type alias for symdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the index writer and its storage
#[derive(Debug, Error)]
pub enum Error {
    /// The database file could not be opened, created or validated.
    #[error("Unable to open database: {0}")]
    Open(String),

    /// An operation needed an open database but none was open.
    #[error("Unable to {0}, because no database is currently open.")]
    NotOpen(&'static str),

    /// `begin`/`commit`/`rollback` was used out of order, or a tainted
    /// transaction was committed.
    #[error("Transaction error: {0}")]
    TransactionState(String),

    #[error("Malformed name hierarchy: {0}")]
    MalformedName(String),

    /// A kind code or kind string outside the closed set.
    #[error("Invalid {kind} value: {value}")]
    InvalidEnum { kind: &'static str, value: String },

    #[error("Unknown symbol id: {0}")]
    UnknownSymbol(i64),

    #[error("Unknown file id: {0}")]
    UnknownFile(i64),

    #[error("Unknown reference id: {0}")]
    UnknownReference(i64),

    #[error("Unknown local symbol id: {0}")]
    UnknownLocalSymbol(i64),

    #[error("Invalid source range: {0}")]
    InvalidRange(String),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_enum(kind: &'static str, value: impl ToString) -> Self {
        Error::InvalidEnum {
            kind,
            value: value.to_string(),
        }
    }
}
