//! Error types for powder-core

use thiserror::Error;

use crate::models::EntityKind;

/// Result type alias using powder-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in powder-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Payload rejected by the validation gate; holds every violation found
    #[error("Validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    /// Update, delete or trip reference named an id absent from the local
    /// cache
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Local cache database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Media/object storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Validation messages, when this is a validation failure.
    pub fn validation_messages(&self) -> &[String] {
        match self {
            Self::Validation(messages) => messages,
            _ => &[],
        }
    }
}
