//! Where store failures are reported.

use tracing::error;

use crate::error::Error;

/// Receives every store-level failure absorbed by the backend.
///
/// Never called for expected empty results, such as a read that finds no
/// document and creates one.
pub trait FailureSink: Send + Sync {
    fn log_failure(&self, operation: &'static str, error: &Error);
}

/// Reports failures as `tracing` error events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn log_failure(&self, operation: &'static str, error: &Error) {
        error!(operation, error = %error, "Session store operation failed");
    }
}
