//! Diff between the remote listing and local sync records.

use crate::error::{SyncError, SyncResult};
use crate::layout::LocalLayout;
use crate::remote::RemoteObject;
use s3mirror_storage::RecordSnapshot;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;

/// One object scheduled for transfer.
#[derive(Debug)]
pub struct TransferItem {
    pub object: RemoteObject,
    /// Destination in the mirror tree, or the reason the key cannot be placed
    /// there. Unplaceable keys are still planned so their failure is recorded.
    pub local_path: SyncResult<PathBuf>,
}

/// Returns true when `object` must be (re)transferred.
///
/// Only fingerprints are compared. An empty remote fingerprint never matches,
/// so objects with incomplete metadata are always transferred. A record whose
/// last transfer failed is not retried while the fingerprint is unchanged.
pub fn needs_transfer(object: &RemoteObject, local: &RecordSnapshot) -> bool {
    if object.fingerprint.is_empty() {
        return true;
    }
    match local.get(&object.key) {
        Some(record) => record.fingerprint != object.fingerprint,
        None => true,
    }
}

/// Builds the transfer plan, preserving listing order.
///
/// The prefix is stripped as raw text, so distinct keys can map to one local
/// path (`data/x` and `datax` under prefix `data`). The first key in listing
/// order keeps the path; later claimants are planned with an error and end up
/// recorded as `failed`.
pub fn plan(
    remote: Vec<RemoteObject>,
    local: &RecordSnapshot,
    layout: &LocalLayout,
) -> Vec<TransferItem> {
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    remote
        .into_iter()
        .filter(|object| needs_transfer(object, local))
        .map(|object| {
            let local_path = layout.resolve(&object.key).and_then(|path| {
                match claimed.entry(path.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(object.key.clone());
                        Ok(path)
                    }
                    Entry::Occupied(owner) => Err(SyncError::fetch(
                        &object.key,
                        format!("{} is already the destination of {}", path.display(), owner.get()),
                    )),
                }
            });
            TransferItem { object, local_path }
        })
        .collect()
}
