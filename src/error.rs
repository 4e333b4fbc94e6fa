//! Crate-level error type.
//!
//! Domain validation failures live in [`crate::schema::SchemaError`]; this
//! wrapper exists for callers that also hit the storage and serialization
//! layers directly.

use crate::schema::SchemaError;

#[derive(Debug, thiserror::Error)]
pub enum StencilError {
    /// Schema/composition validation failure (caller-recoverable).
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// IO error from the storage directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Underlying sled database error.
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
}

pub type StencilResult<T> = Result<T, StencilError>;
