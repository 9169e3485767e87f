//! Single-writer batching of record updates into the record store.
//!
//! Workers push outcomes here instead of writing the store. One async mutex
//! covers append, threshold check and flush, so at most one
//! read-merge-rewrite cycle runs against the store at any time and no update
//! is appended while a flush is in progress.

use crate::error::{SyncError, SyncResult};
use s3mirror_storage::{RecordStore, StorageError, SyncRecord};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Buffers [`SyncRecord`] updates and flushes them in batches.
pub struct RecordBatcher {
    store: RecordStore,
    batch_size: usize,
    buffer: Mutex<Vec<SyncRecord>>,
}

impl RecordBatcher {
    pub fn new(store: RecordStore, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            batch_size,
            buffer: Mutex::new(Vec::with_capacity(batch_size)),
        }
    }

    /// Appends an update, flushing when the buffer reaches the batch size.
    ///
    /// A failed flush is logged and the buffer kept; since it is still at the
    /// threshold, the next push retries.
    pub async fn push(&self, record: SyncRecord) {
        let mut buffer = self.buffer.lock().await;
        buffer.push(record);
        if buffer.len() >= self.batch_size {
            if let Err(e) = self.flush_locked(&mut buffer).await {
                error!("batch flush failed, keeping {} updates for retry: {e}", buffer.len());
            }
        }
    }

    /// Persists everything still buffered. Returns how many updates were
    /// written; on error the buffer is left intact.
    pub async fn flush(&self) -> SyncResult<usize> {
        let mut buffer = self.buffer.lock().await;
        self.flush_locked(&mut buffer).await
    }

    /// Number of updates waiting to be flushed.
    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.len()
    }

    async fn flush_locked(&self, buffer: &mut Vec<SyncRecord>) -> SyncResult<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }

        let store = self.store.clone();
        let batch = buffer.clone();
        tokio::task::spawn_blocking(move || store.apply_batch(&batch))
            .await
            .map_err(|e| {
                SyncError::Flush(StorageError::Write(format!("flush task aborted: {e}")))
            })?
            .map_err(SyncError::Flush)?;

        let flushed = buffer.len();
        buffer.clear();
        if flushed >= self.batch_size {
            info!("flushed batch of {flushed} records to {}", self.store.path().display());
        } else {
            debug!("flushed {flushed} records to {}", self.store.path().display());
        }
        Ok(flushed)
    }
}
