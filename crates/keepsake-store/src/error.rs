//! Error types for document store operations.

use thiserror::Error;

/// Errors raised by a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or statement failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Document could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The update cannot be applied to the target document.
    #[error("Cannot apply update at '{path}': {reason}")]
    InvalidUpdate { path: String, reason: String },

    /// A stored document is malformed.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The store rejected the operation or could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
