//! Shared test helpers: an in-memory remote namespace and config builders.
#![allow(dead_code)]

use async_trait::async_trait;
use s3mirror_storage::{RecordStore, SyncRecord, SyncStatus};
use s3mirror_sync::{MirrorConfig, ObjectFetcher, ObjectLister, RemoteObject, SyncError, SyncResult};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// In-memory bucket. Object bodies are derived from key and fingerprint.
#[derive(Default)]
pub struct FakeRemote {
    objects: Mutex<BTreeMap<String, RemoteObject>>,
    failing: Mutex<HashSet<String>>,
    fail_listing: Mutex<bool>,
    fetch_delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(objects: &[(&str, &str)]) -> Self {
        let remote = Self::new();
        for (key, fingerprint) in objects {
            remote.put(key, fingerprint);
        }
        remote
    }

    pub fn put(&self, key: &str, fingerprint: &str) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            RemoteObject::new(key, fingerprint, 1_700_000_000),
        );
    }

    pub fn fail_fetch(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_listing(&self) {
        *self.fail_listing.lock().unwrap() = true;
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn body_for(key: &str, fingerprint: &str) -> String {
        format!("{key}@{fingerprint}")
    }
}

#[async_trait]
impl ObjectLister for FakeRemote {
    async fn list(&self, prefix: &str) -> SyncResult<Vec<RemoteObject>> {
        if *self.fail_listing.lock().unwrap() {
            return Err(SyncError::Listing("simulated listing outage".into()));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ObjectFetcher for FakeRemote {
    async fn fetch(&self, key: &str, dest: &Path) -> SyncResult<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let failing = self.failing.lock().unwrap().contains(key);
            let object = self.objects.lock().unwrap().get(key).cloned();
            match (failing, object) {
                (true, _) => Err(SyncError::Fetch {
                    key: key.to_string(),
                    reason: "simulated fetch failure".into(),
                }),
                (false, None) => Err(SyncError::Fetch {
                    key: key.to_string(),
                    reason: "no such key".into(),
                }),
                (false, Some(object)) => {
                    let body = Self::body_for(key, &object.fingerprint);
                    std::fs::write(dest, &body)
                        .map(|()| body.len() as u64)
                        .map_err(|e| SyncError::Fetch {
                            key: key.to_string(),
                            reason: e.to_string(),
                        })
                }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Temp directory holding a mirror root and a record store.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn mirror_root(&self) -> std::path::PathBuf {
        self.dir.path().join("mirror")
    }

    pub fn db_path(&self) -> std::path::PathBuf {
        self.dir.path().join("state/status.parquet")
    }

    pub fn store(&self) -> RecordStore {
        RecordStore::open(self.db_path()).unwrap()
    }

    pub fn config(&self) -> MirrorConfig {
        MirrorConfig {
            bucket: "test-bucket".into(),
            local_dir: self.mirror_root(),
            db_path: self.db_path(),
            max_workers: 4,
            batch_size: 2,
            rate_limit_per_sec: 1_000,
            progress_every: 1,
            ..MirrorConfig::default()
        }
    }
}

pub fn record(key: &str, fingerprint: &str, status: SyncStatus) -> SyncRecord {
    SyncRecord {
        key: key.into(),
        fingerprint: fingerprint.into(),
        local_path: format!("/mirror/{key}"),
        status,
        modified_at: 1_700_000_000,
        synced_at: 1_700_000_000,
    }
}
