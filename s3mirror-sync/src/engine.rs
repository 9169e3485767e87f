//! Mirror run orchestrator.
//!
//! One run is: list remote → snapshot records → plan → transfer → final
//! flush. Only listing and snapshot failures abort a run; per-object failures
//! end up as `failed` records.

use crate::batcher::RecordBatcher;
use crate::config::MirrorConfig;
use crate::error::{SyncError, SyncResult};
use crate::layout::LocalLayout;
use crate::pipeline::TransferPipeline;
use crate::planner::plan;
use crate::progress::ProgressTracker;
use crate::rate_limiter::{CancelSignal, RateLimiter};
use crate::remote::{ObjectFetcher, ObjectLister};
use crate::s3_transport::S3Transport;
use s3mirror_storage::{RecordSnapshot, RecordStore, StorageError};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub listed: usize,
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Planned items not started because the run was canceled.
    pub skipped: usize,
    /// Outcomes still buffered because the final flush failed.
    pub unflushed: usize,
    pub canceled: bool,
}

/// Mirrors a remote namespace into a local tree.
pub struct SyncEngine {
    lister: Arc<dyn ObjectLister>,
    fetcher: Arc<dyn ObjectFetcher>,
    store: RecordStore,
    layout: LocalLayout,
    prefix: String,
    max_workers: usize,
    batch_size: usize,
    rate_limit_per_sec: u32,
    progress_every: usize,
}

impl SyncEngine {
    pub fn new(
        config: &MirrorConfig,
        lister: Arc<dyn ObjectLister>,
        fetcher: Arc<dyn ObjectFetcher>,
        store: RecordStore,
    ) -> Self {
        Self {
            lister,
            fetcher,
            store,
            layout: LocalLayout::new(config.local_dir.clone(), config.prefix.clone()),
            prefix: config.prefix.clone(),
            max_workers: config.max_workers,
            batch_size: config.batch_size,
            rate_limit_per_sec: config.rate_limit_per_sec,
            progress_every: config.progress_every,
        }
    }

    /// Validates `config`, builds the S3 client and opens the record store.
    /// Any failure is [`SyncError::Init`] or [`SyncError::Config`].
    pub async fn from_config(config: &MirrorConfig) -> SyncResult<Self> {
        config.validate()?;

        let transport = S3Transport::from_config(config)
            .await
            .map_err(|e| SyncError::Init(format!("S3 client: {e}")))?;
        let transport = Arc::new(transport);

        let db_path = config.db_path.clone();
        let store = tokio::task::spawn_blocking(move || RecordStore::open(db_path))
            .await
            .map_err(|e| SyncError::Init(format!("record store: {e}")))?
            .map_err(|e| SyncError::Init(e.to_string()))?;

        info!(
            "sync engine initialized for s3://{}/{} -> {}",
            config.bucket,
            config.prefix,
            config.local_dir.display()
        );
        Ok(Self::new(config, transport.clone(), transport, store))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Runs one full mirror pass.
    pub async fn run(&self, cancel: CancelSignal) -> SyncResult<RunSummary> {
        info!("starting sync of prefix '{}'", self.prefix);

        let remote = self.lister.list(&self.prefix).await.map_err(|e| match e {
            SyncError::Listing(_) => e,
            other => SyncError::Listing(other.to_string()),
        })?;
        info!("found {} objects in remote listing", remote.len());

        let local = self.snapshot().await?;
        info!("found {} records in the local store", local.len());

        let mut summary = RunSummary {
            listed: remote.len(),
            ..RunSummary::default()
        };

        let items = plan(remote, &local, &self.layout);
        drop(local);
        summary.planned = items.len();
        if items.is_empty() {
            info!("all objects are up to date, nothing to download");
            return Ok(summary);
        }
        info!("{} objects to download", items.len());

        let progress = Arc::new(ProgressTracker::new(self.progress_every));
        let batcher = Arc::new(RecordBatcher::new(self.store.clone(), self.batch_size));
        let pipeline = TransferPipeline::new(
            Arc::clone(&self.fetcher),
            Arc::new(RateLimiter::new(self.rate_limit_per_sec)),
            Arc::clone(&batcher),
            Arc::clone(&progress),
            self.max_workers,
        );

        progress.start(items.len());
        let report = pipeline.run(items, cancel).await;
        summary.succeeded = report.succeeded;
        summary.failed = report.failed;
        summary.skipped = report.skipped;
        summary.canceled = report.canceled;

        if let Err(e) = batcher.flush().await {
            summary.unflushed = batcher.pending().await;
            error!("final flush failed, {} outcomes not persisted: {e}", summary.unflushed);
        }
        progress.finish();

        if summary.canceled {
            warn!("sync canceled before completion");
        } else {
            info!("sync completed");
        }
        Ok(summary)
    }

    async fn snapshot(&self) -> SyncResult<RecordSnapshot> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.snapshot())
            .await
            .map_err(|e| {
                SyncError::Snapshot(StorageError::Read(format!("snapshot task aborted: {e}")))
            })?
            .map_err(SyncError::Snapshot)
    }
}
