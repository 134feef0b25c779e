//! Error types for cache operations.

use thiserror::Error;

/// Errors returned by [`Cache`](crate::Cache) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// No live entry exists for the key
    ///
    /// Returned alike for keys that were never set, were deleted, or have expired.
    #[error("key not found")]
    NotFound,

    /// Background cleanup was requested outside of a Tokio runtime
    #[error("background cleanup requires a Tokio runtime")]
    RuntimeUnavailable,
}

impl CacheError {
    /// Returns `true` if this error indicates a missing or expired key.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }
}
