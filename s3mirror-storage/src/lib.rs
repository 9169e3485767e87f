//! Sync record storage for s3mirror.
//!
//! Keeps one [`SyncRecord`] per remote object key that has ever been
//! transferred, along with the fingerprint that was transferred and the
//! outcome.
//!
//! # Architecture
//!
//! - Records live in a single Parquet file (six fixed columns, ZSTD pages)
//! - DuckDB is used in-memory as the codec: `read_parquet` for snapshots,
//!   `COPY ... TO` for rewrites
//! - Every write replaces the whole file; there is no append path
//! - The store does no locking of its own. Callers serialize writers.

mod error;
mod record;
mod record_store;

pub use error::{StorageError, StorageResult};
pub use record::{RecordSnapshot, SyncRecord, SyncStatus};
pub use record_store::RecordStore;
