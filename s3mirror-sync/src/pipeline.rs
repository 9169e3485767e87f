//! Bounded worker pool that executes a transfer plan.
//!
//! Every item goes `Pending -> Fetching -> Succeeded | Failed`. There are no
//! retries within a run: a failed fetch is recorded with status `failed` and
//! the worker moves on. Outcomes go through [`RecordBatcher`], never straight
//! to the store.

use crate::batcher::RecordBatcher;
use crate::error::{SyncError, SyncResult};
use crate::planner::TransferItem;
use crate::progress::ProgressTracker;
use crate::rate_limiter::{CancelSignal, RateLimiter};
use crate::remote::{ObjectFetcher, RemoteObject};
use s3mirror_storage::{SyncRecord, SyncStatus};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Lifecycle of a single plan item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    Fetching,
    Succeeded,
    Failed,
}

/// Counts from one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items never started because the run was canceled.
    pub skipped: usize,
    pub canceled: bool,
}

/// Prefilled queue drained by the workers. Nothing is added after creation.
struct WorkQueue {
    items: Mutex<std::vec::IntoIter<TransferItem>>,
}

impl WorkQueue {
    fn new(items: Vec<TransferItem>) -> Self {
        Self {
            items: Mutex::new(items.into_iter()),
        }
    }

    fn next(&self) -> Option<TransferItem> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .next()
    }

    fn remaining(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[derive(Default)]
struct WorkerStats {
    succeeded: usize,
    failed: usize,
    canceled: bool,
}

/// Fixed-size pool of transfer workers.
#[derive(Clone)]
pub struct TransferPipeline {
    fetcher: Arc<dyn ObjectFetcher>,
    limiter: Arc<RateLimiter>,
    batcher: Arc<RecordBatcher>,
    progress: Arc<ProgressTracker>,
    workers: usize,
}

impl TransferPipeline {
    pub fn new(
        fetcher: Arc<dyn ObjectFetcher>,
        limiter: Arc<RateLimiter>,
        batcher: Arc<RecordBatcher>,
        progress: Arc<ProgressTracker>,
        workers: usize,
    ) -> Self {
        Self {
            fetcher,
            limiter,
            batcher,
            progress,
            workers: workers.max(1),
        }
    }

    /// Runs `items` to completion or until `cancel` is raised.
    ///
    /// Workers observe cancellation only while waiting for a rate-limit token;
    /// a fetch already in progress finishes and is recorded. The caller is
    /// responsible for the final [`RecordBatcher::flush`].
    pub async fn run(&self, items: Vec<TransferItem>, cancel: CancelSignal) -> PipelineReport {
        let planned = items.len();
        let queue = Arc::new(WorkQueue::new(items));
        let worker_count = self.workers.min(planned);

        debug!("starting {worker_count} transfer workers for {planned} items");
        let mut set = JoinSet::new();
        for id in 0..worker_count {
            let pipeline = self.clone();
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            set.spawn(async move { pipeline.worker(id, queue, cancel).await });
        }

        let mut report = PipelineReport {
            planned,
            ..PipelineReport::default()
        };
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(stats) => {
                    report.succeeded += stats.succeeded;
                    report.failed += stats.failed;
                    report.canceled |= stats.canceled;
                }
                Err(e) => error!("transfer worker terminated abnormally: {e}"),
            }
        }
        report.skipped = queue.remaining();

        if report.canceled {
            info!(
                "transfer canceled with {} of {planned} items not started",
                report.skipped
            );
        }
        report
    }

    async fn worker(
        &self,
        id: usize,
        queue: Arc<WorkQueue>,
        mut cancel: CancelSignal,
    ) -> WorkerStats {
        let mut stats = WorkerStats::default();
        loop {
            if queue.remaining() == 0 {
                break;
            }
            if self.limiter.acquire(&mut cancel).await.is_err() {
                debug!("worker {id} canceled while waiting for a token");
                stats.canceled = true;
                break;
            }
            // Taken only after admission, so a canceled worker leaves its
            // next item in the queue. Another worker may have drained the
            // queue while this one waited; its token then goes back.
            let Some(item) = queue.next() else {
                self.limiter.refund().await;
                break;
            };

            match self.transfer(item).await {
                TransferState::Succeeded => {
                    stats.succeeded += 1;
                    self.progress.record_success();
                }
                _ => {
                    stats.failed += 1;
                    self.progress.record_failure();
                }
            }
        }
        debug!(
            "worker {id} exiting: {} succeeded, {} failed",
            stats.succeeded, stats.failed
        );
        stats
    }

    /// Fetches one item and queues its outcome record.
    async fn transfer(&self, item: TransferItem) -> TransferState {
        let TransferItem { object, local_path } = item;
        debug!(key = %object.key, state = ?TransferState::Fetching, "transfer started");

        let (local_path, outcome) = match local_path {
            Ok(path) => {
                let outcome = self.fetch_to(&object.key, &path).await;
                (path.to_string_lossy().into_owned(), outcome)
            }
            Err(e) => (String::new(), Err(e)),
        };

        let (state, status) = match outcome {
            Ok(bytes) => {
                debug!("downloaded {} ({bytes} bytes) to {local_path}", object.key);
                (TransferState::Succeeded, SyncStatus::Downloaded)
            }
            Err(e) => {
                warn!("failed to download {}: {e}", object.key);
                (TransferState::Failed, SyncStatus::Failed)
            }
        };

        self.batcher
            .push(outcome_record(&object, local_path, status))
            .await;
        state
    }

    async fn fetch_to(&self, key: &str, path: &Path) -> SyncResult<u64> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                SyncError::fetch(key, format!("create directory {}: {e}", parent.display()))
            })?;
        }
        self.fetcher.fetch(key, path).await
    }
}

fn outcome_record(object: &RemoteObject, local_path: String, status: SyncStatus) -> SyncRecord {
    SyncRecord {
        key: object.key.clone(),
        fingerprint: object.fingerprint.clone(),
        local_path,
        status,
        modified_at: object.modified_at,
        synced_at: chrono::Utc::now().timestamp(),
    }
}
