mod support;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use s3mirror_storage::{RecordSnapshot, SyncStatus};
use s3mirror_sync::RemoteObject;
use s3mirror_sync::layout::LocalLayout;
use s3mirror_sync::planner::{needs_transfer, plan};
use std::collections::HashSet;
use std::path::PathBuf;
use support::record;

fn layout() -> LocalLayout {
    LocalLayout::new("/mirror", "exports/")
}

fn planned_keys(remote: Vec<RemoteObject>, local: &RecordSnapshot) -> Vec<String> {
    plan(remote, local, &layout())
        .into_iter()
        .map(|item| item.object.key)
        .collect()
}

#[test]
fn empty_store_plans_everything() {
    let remote = vec![
        RemoteObject::new("exports/a", "fp1", 0),
        RemoteObject::new("exports/b", "fp2", 0),
    ];
    assert_eq!(
        planned_keys(remote, &RecordSnapshot::new()),
        vec!["exports/a", "exports/b"]
    );
}

#[test]
fn changed_fingerprint_is_planned_and_unchanged_is_not() {
    let local: RecordSnapshot = vec![
        record("exports/a", "fp1", SyncStatus::Downloaded),
        record("exports/b", "fp2", SyncStatus::Downloaded),
    ]
    .into_iter()
    .collect();
    let remote = vec![
        RemoteObject::new("exports/a", "fp3", 0),
        RemoteObject::new("exports/b", "fp2", 0),
    ];

    assert_eq!(planned_keys(remote, &local), vec!["exports/a"]);
}

#[test]
fn empty_remote_fingerprint_always_planned() {
    let local: RecordSnapshot = vec![record("exports/a", "", SyncStatus::Downloaded)]
        .into_iter()
        .collect();
    let remote = vec![RemoteObject::new("exports/a", "", 0)];

    assert_eq!(planned_keys(remote, &local), vec!["exports/a"]);
}

#[test]
fn failed_record_with_same_fingerprint_is_not_replanned() {
    let local: RecordSnapshot = vec![record("exports/c", "fp1", SyncStatus::Failed)]
        .into_iter()
        .collect();
    let object = RemoteObject::new("exports/c", "fp1", 0);
    assert!(!needs_transfer(&object, &local));
}

#[test]
fn plan_resolves_destination_under_root() {
    let items = plan(
        vec![RemoteObject::new("exports/2024/01/a.csv", "fp1", 0)],
        &RecordSnapshot::new(),
        &layout(),
    );
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0].local_path.as_ref().unwrap(),
        &PathBuf::from("/mirror/2024/01/a.csv")
    );
}

#[test]
fn unplaceable_key_is_still_planned_with_error() {
    let items = plan(
        vec![RemoteObject::new("exports/../../etc/passwd", "fp1", 0)],
        &RecordSnapshot::new(),
        &layout(),
    );
    assert_eq!(items.len(), 1);
    assert!(items[0].local_path.is_err());
}

#[test]
fn second_key_mapping_to_a_claimed_path_is_planned_with_error() {
    let layout = LocalLayout::new("/mirror", "data");
    let items = plan(
        vec![
            RemoteObject::new("data/x", "fp1", 0),
            RemoteObject::new("datax", "fp2", 0),
            RemoteObject::new("data/y", "fp3", 0),
        ],
        &RecordSnapshot::new(),
        &layout,
    );

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].local_path.as_ref().unwrap(), &PathBuf::from("/mirror/x"));
    let err = items[1].local_path.as_ref().unwrap_err();
    assert!(err.to_string().contains("data/x"), "got {err}");
    assert_eq!(items[2].local_path.as_ref().unwrap(), &PathBuf::from("/mirror/y"));
}

#[test]
fn empty_listing_plans_nothing() {
    let local: RecordSnapshot = vec![record("exports/a", "fp1", SyncStatus::Downloaded)]
        .into_iter()
        .collect();
    assert!(planned_keys(Vec::new(), &local).is_empty());
}

fn fingerprint() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-c]{1,2}"]
}

proptest! {
    #[test]
    fn plan_matches_fingerprint_rule(
        remote in prop::collection::hash_map("[a-e]{1,3}", fingerprint(), 0..20),
        local in prop::collection::hash_map("[a-e]{1,3}", "[a-c]{1,2}", 0..20),
    ) {
        let objects: Vec<RemoteObject> = remote
            .iter()
            .map(|(k, fp)| RemoteObject::new(format!("exports/{k}"), fp.clone(), 0))
            .collect();
        let snapshot: RecordSnapshot = local
            .iter()
            .map(|(k, fp)| record(&format!("exports/{k}"), fp, SyncStatus::Downloaded))
            .collect();
        let planned: HashSet<String> = plan(objects, &snapshot, &layout())
            .into_iter()
            .map(|item| item.object.key)
            .collect();

        for (k, fp) in &remote {
            let key = format!("exports/{k}");
            let expected = fp.is_empty() || local.get(k) != Some(fp);
            prop_assert_eq!(planned.contains(&key), expected, "key {}", key);
        }
        prop_assert!(planned.len() <= remote.len());
    }

    #[test]
    fn plan_is_deterministic(
        remote in prop::collection::vec(("[a-e]{1,3}", fingerprint()), 0..20),
    ) {
        let objects: Vec<RemoteObject> = remote
            .iter()
            .map(|(k, fp)| RemoteObject::new(format!("exports/{k}"), fp.clone(), 0))
            .collect();
        let first = planned_keys(objects.clone(), &RecordSnapshot::new());
        let second = planned_keys(objects, &RecordSnapshot::new());
        prop_assert_eq!(first, second);
    }
}
