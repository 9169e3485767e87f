//! Error types for the record store.

use thiserror::Error;

/// Errors raised by [`crate::RecordStore`], one variant per phase.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to initialize record store: {0}")]
    Init(String),

    #[error("failed to read record store: {0}")]
    Read(String),

    #[error("failed to write record store: {0}")]
    Write(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
