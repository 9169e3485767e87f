//! Parquet record store with whole-file rewrite semantics.

use crate::error::{StorageError, StorageResult};
use crate::record::{RecordSnapshot, SyncRecord, SyncStatus};
use duckdb::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const MEMORY_LIMIT: &str = "256MB";
const THREADS: u32 = 1;

const RECORDS_TABLE_DDL: &str = r#"
    CREATE TABLE records (
        key VARCHAR NOT NULL,
        fingerprint VARCHAR NOT NULL,
        modified_at BIGINT NOT NULL,
        status VARCHAR NOT NULL,
        local_path VARCHAR NOT NULL,
        synced_at BIGINT NOT NULL
    );
"#;

/// Durable `key -> SyncRecord` mapping stored as a single Parquet file.
///
/// The store performs no locking. At most one `rewrite`/`apply_batch` may be
/// in flight at a time; concurrent read-merge-rewrite cycles lose updates.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Creates a handle without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a handle and initializes the backing file if it is missing.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes an empty store with the record schema if no file exists yet.
    pub fn initialize(&self) -> StorageResult<()> {
        if self.path.exists() {
            debug!("record store already present at {}", self.path.display());
            return Ok(());
        }

        info!("no record store at {}, creating an empty one", self.path.display());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::Init(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        self.write_file(&[]).map_err(StorageError::Init)
    }

    /// Reads every record in the file.
    pub fn snapshot(&self) -> StorageResult<RecordSnapshot> {
        if !self.path.exists() {
            return Err(StorageError::Read(format!(
                "{} does not exist",
                self.path.display()
            )));
        }

        let conn = open_codec_connection().map_err(StorageError::Read)?;
        let sql = format!(
            "SELECT key, fingerprint, modified_at, status, local_path, synced_at \
             FROM read_parquet('{}')",
            sql_quote(&self.path)
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StorageError::Read(format!("{}: {e}", self.path.display())))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(|e| StorageError::Read(format!("{}: {e}", self.path.display())))?;

        let mut snapshot = RecordSnapshot::new();
        for row in rows {
            let (key, fingerprint, modified_at, status, local_path, synced_at) =
                row.map_err(|e| StorageError::Read(format!("{}: {e}", self.path.display())))?;
            let status: SyncStatus = status
                .parse()
                .map_err(|e| StorageError::Read(format!("record '{key}': {e}")))?;

            snapshot.merge([SyncRecord {
                key,
                fingerprint,
                local_path,
                status,
                modified_at,
                synced_at,
            }]);
        }

        debug!("read {} records from {}", snapshot.len(), self.path.display());
        Ok(snapshot)
    }

    /// Replaces the file contents with exactly `records`.
    ///
    /// The new file is written next to the target and renamed over it, so a
    /// crash mid-write leaves the previous checkpoint in place.
    pub fn rewrite(&self, records: &[SyncRecord]) -> StorageResult<()> {
        self.write_file(records).map_err(StorageError::Write)?;
        debug!("wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    /// Snapshot, overlay `updates` by key, rewrite.
    pub fn apply_batch(&self, updates: &[SyncRecord]) -> StorageResult<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut merged = self.snapshot()?;
        merged.merge(updates.iter().cloned());
        let records = merged.into_records();
        self.rewrite(&records)?;

        info!(
            "applied batch of {} updates ({} records total)",
            updates.len(),
            records.len()
        );
        Ok(())
    }

    fn write_file(&self, records: &[SyncRecord]) -> Result<(), String> {
        let tmp_path = self.temp_path();
        let result = write_parquet(&tmp_path, records).and_then(|()| {
            fs::rename(&tmp_path, &self.path).map_err(|e| {
                format!(
                    "cannot move {} to {}: {e}",
                    tmp_path.display(),
                    self.path.display()
                )
            })
        });

        if result.is_err() && tmp_path.exists() {
            if let Err(e) = fs::remove_file(&tmp_path) {
                warn!("failed to remove {}: {e}", tmp_path.display());
            }
        }
        result
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "records".to_string());
        self.path
            .with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()))
    }
}

fn write_parquet(path: &Path, records: &[SyncRecord]) -> Result<(), String> {
    let conn = open_codec_connection()?;
    conn.execute_batch(RECORDS_TABLE_DDL)
        .map_err(|e| format!("cannot create records table: {e}"))?;

    {
        let mut appender = conn
            .appender("records")
            .map_err(|e| format!("cannot open appender: {e}"))?;
        for r in records {
            appender
                .append_row(params![
                    r.key,
                    r.fingerprint,
                    r.modified_at,
                    r.status.as_str(),
                    r.local_path,
                    r.synced_at,
                ])
                .map_err(|e| format!("cannot stage record '{}': {e}", r.key))?;
        }
        appender
            .flush()
            .map_err(|e| format!("cannot flush staged records: {e}"))?;
    }

    conn.execute_batch(&format!(
        "COPY records TO '{}' (FORMAT PARQUET, COMPRESSION ZSTD);",
        sql_quote(path)
    ))
    .map_err(|e| format!("cannot write {}: {e}", path.display()))
}

/// In-memory DuckDB connection used purely as a Parquet codec.
fn open_codec_connection() -> Result<Connection, String> {
    let conn =
        Connection::open_in_memory().map_err(|e| format!("cannot open duckdb: {e}"))?;
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{MEMORY_LIMIT}'; PRAGMA threads={THREADS};"
    ))
    .map_err(|e| format!("cannot apply duckdb limits: {e}"))?;
    Ok(conn)
}

fn sql_quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "''")
}
