//! Error types for growthlog-core

use thiserror::Error;

/// Main error type for the growthlog-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Malformed or missing field on a record
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unrecognized action, status or format
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Error::NotFound { entity, id }
    }
}

/// Result type alias for growthlog-core
pub type Result<T> = std::result::Result<T, Error>;
