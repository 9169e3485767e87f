//! Sync error types.

use s3mirror_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while mirroring.
///
/// `Init`, `Config`, `Listing` and `Snapshot` abort a run. `Fetch` and
/// `Flush` are absorbed by the pipeline and only logged.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("initialization failed: {0}")]
    Init(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("remote listing failed: {0}")]
    Listing(String),

    #[error("cannot read record store snapshot: {0}")]
    Snapshot(#[source] StorageError),

    #[error("fetch failed for {key}: {reason}")]
    Fetch { key: String, reason: String },

    #[error("record store flush failed: {0}")]
    Flush(#[source] StorageError),

    #[error("operation canceled")]
    Canceled,
}

impl SyncError {
    pub(crate) fn fetch(key: &str, reason: impl Into<String>) -> Self {
        SyncError::Fetch {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors that abort a whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Init(_) | SyncError::Config(_) | SyncError::Listing(_) | SyncError::Snapshot(_)
        )
    }
}
