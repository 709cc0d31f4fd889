//! Error types for the persistence gateway.

use thiserror::Error;

/// Result type alias for persistence operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while talking to the document store.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("document is not a JSON object: {0}")]
    NotAnObject(String),
}
