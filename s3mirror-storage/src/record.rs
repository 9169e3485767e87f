//! Sync record types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::str::FromStr;

/// Outcome of the most recent transfer of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Downloaded,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Downloaded => "downloaded",
            SyncStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "downloaded" => Ok(SyncStatus::Downloaded),
            "failed" => Ok(SyncStatus::Failed),
            other => Err(format!("unknown sync status '{other}'")),
        }
    }
}

/// Persisted state of one remote object.
///
/// Timestamps are Unix epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub key: String,
    pub fingerprint: String,
    pub local_path: String,
    pub status: SyncStatus,
    pub modified_at: i64,
    pub synced_at: i64,
}

/// Point-in-time view of every record in the store, keyed by object key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSnapshot {
    records: HashMap<String, SyncRecord>,
}

impl RecordSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&SyncRecord> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> hash_map::Values<'_, String, SyncRecord> {
        self.records.values()
    }

    /// Overlays `updates` on this snapshot. Updates replace existing records
    /// with the same key; among updates, later entries win.
    pub fn merge<I>(&mut self, updates: I)
    where
        I: IntoIterator<Item = SyncRecord>,
    {
        for record in updates {
            self.records.insert(record.key.clone(), record);
        }
    }

    /// Consumes the snapshot, returning its records in unspecified order.
    pub fn into_records(self) -> Vec<SyncRecord> {
        self.records.into_values().collect()
    }
}

impl FromIterator<SyncRecord> for RecordSnapshot {
    fn from_iter<I: IntoIterator<Item = SyncRecord>>(iter: I) -> Self {
        let mut snapshot = RecordSnapshot::new();
        snapshot.merge(iter);
        snapshot
    }
}
