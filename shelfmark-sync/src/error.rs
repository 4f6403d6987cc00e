//! Sync error types.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync account not configured")]
    NotConfigured,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] shelfmark_store::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Authentication problems are reported separately from sync failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::NotConfigured | SyncError::AuthFailed(_))
    }

    /// Retryable errors leave local data untouched for the next run.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_) | SyncError::Server { .. } | SyncError::NetworkUnavailable(_)
        )
    }
}
