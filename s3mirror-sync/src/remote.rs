//! Remote object namespace abstractions.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One object as reported by a remote listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub key: String,
    /// Opaque content identity (the S3 ETag). Empty when the listing did not
    /// supply one.
    pub fingerprint: String,
    /// Last modification time, Unix epoch seconds.
    pub modified_at: i64,
    pub size: Option<i64>,
}

impl RemoteObject {
    pub fn new(key: impl Into<String>, fingerprint: impl Into<String>, modified_at: i64) -> Self {
        Self {
            key: key.into(),
            fingerprint: fingerprint.into(),
            modified_at,
            size: None,
        }
    }
}

/// Produces the full listing of a namespace under a prefix.
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// Lists every object under `prefix`, following pagination to the end.
    /// Fails with [`crate::SyncError::Listing`].
    async fn list(&self, prefix: &str) -> SyncResult<Vec<RemoteObject>>;
}

/// Materializes one remote object on the local filesystem.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Streams `key` into `dest`, replacing any existing file, and returns the
    /// number of bytes written. Fails with [`crate::SyncError::Fetch`].
    async fn fetch(&self, key: &str, dest: &Path) -> SyncResult<u64>;
}
