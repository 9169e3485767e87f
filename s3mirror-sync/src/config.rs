//! Mirror configuration, sourced from the environment.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Configuration for a mirror run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Static access key. When either key is absent the AWS default
    /// credential chain is used instead.
    pub access_key_id: Option<String>,

    pub secret_access_key: Option<String>,

    /// AWS region for S3.
    pub region: String,

    /// S3 bucket name.
    pub bucket: String,

    /// Only keys under this prefix are mirrored. The prefix is stripped from
    /// local paths.
    pub prefix: String,

    /// Optional S3 endpoint override (MinIO and other S3-compatible stores).
    pub endpoint_override: Option<String>,

    /// Root of the local mirror tree.
    pub local_dir: PathBuf,

    /// Parquet file holding sync records.
    pub db_path: PathBuf,

    /// Number of concurrent transfer workers.
    pub max_workers: usize,

    /// Buffered record updates before a store flush.
    pub batch_size: usize,

    /// Fetches admitted per second across all workers.
    pub rate_limit_per_sec: u32,

    /// Emit a progress line every this many completed transfers.
    pub progress_every: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            region: "us-east-1".to_string(),
            bucket: String::new(),
            prefix: String::new(),
            endpoint_override: None,
            local_dir: PathBuf::from("./data"),
            db_path: PathBuf::from("./s3_sync_status.parquet"),
            max_workers: 50,
            batch_size: 100,
            rate_limit_per_sec: 100,
            progress_every: 100,
        }
    }
}

impl MirrorConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// unset variables and for numbers that fail to parse.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            region: lookup("AWS_REGION").unwrap_or(defaults.region),
            bucket: lookup("S3_BUCKET").unwrap_or(defaults.bucket),
            prefix: lookup("S3_PREFIX").unwrap_or(defaults.prefix),
            endpoint_override: lookup("S3_ENDPOINT_URL"),
            local_dir: lookup("LOCAL_DIR").map(PathBuf::from).unwrap_or(defaults.local_dir),
            db_path: lookup("DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            max_workers: parse_or(&lookup, "MAX_WORKERS", defaults.max_workers),
            batch_size: parse_or(&lookup, "BATCH_SIZE", defaults.batch_size),
            rate_limit_per_sec: parse_or(&lookup, "RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            progress_every: parse_or(&lookup, "PROGRESS_EVERY", defaults.progress_every),
        }
    }

    /// Rejects settings a run cannot proceed with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(SyncError::Config("S3_BUCKET must be set".into()));
        }
        if self.max_workers == 0 {
            return Err(SyncError::Config("MAX_WORKERS must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(SyncError::Config("BATCH_SIZE must be at least 1".into()));
        }
        if self.rate_limit_per_sec == 0 {
            return Err(SyncError::Config("RATE_LIMIT_PER_SEC must be at least 1".into()));
        }
        if self.progress_every == 0 {
            return Err(SyncError::Config("PROGRESS_EVERY must be at least 1".into()));
        }
        Ok(())
    }

    /// Static credentials, when both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {name}='{raw}', using default");
            default
        }),
        None => default,
    }
}
