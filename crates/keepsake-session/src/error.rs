//! Error types for session persistence.

use keepsake_store::StoreError;

/// Error type for session operations.
///
/// Only the `try_*` backend operations return these. The others report them
/// through the [`FailureSink`](crate::FailureSink) and degrade to an empty or
/// unsaved session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The document store failed or rejected the operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Direct session keys live outside namespaces and must start with `_`.
    #[error("Invalid direct key '{0}': direct session keys must start with '_'")]
    InvalidDirectKey(String),

    /// The bot signature pattern does not compile.
    #[error("Invalid bot pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The store completed the call without acknowledging it.
    #[error("Store did not acknowledge {0}")]
    Unacknowledged(&'static str),

    /// A background collection pass panicked or was cancelled.
    #[error("Collector task failed: {0}")]
    Task(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
