//! Incremental S3-to-filesystem mirroring.
//!
//! Provides:
//! - A fingerprint diff between the remote listing and local sync records
//! - A bounded, rate-limited worker pool that downloads the plan
//! - Batched, single-writer persistence of transfer outcomes
//! - An orchestrator tying these together for one run

pub mod batcher;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod rate_limiter;
pub mod remote;
pub mod s3_transport;

pub use config::MirrorConfig;
pub use engine::{RunSummary, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use rate_limiter::{CancelSignal, cancel_channel};
pub use remote::{ObjectFetcher, ObjectLister, RemoteObject};
