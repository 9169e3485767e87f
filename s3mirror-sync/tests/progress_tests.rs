use s3mirror_sync::progress::{ProgressSnapshot, ProgressTracker};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn start_resets_counters() {
    let tracker = ProgressTracker::new(10);
    tracker.start(3);
    tracker.record_success();
    tracker.record_failure();

    tracker.start(5);
    let snap = tracker.snapshot();
    assert_eq!(snap.total, 5);
    assert_eq!(snap.completed(), 0);
}

#[test]
fn counts_successes_and_failures() {
    let tracker = ProgressTracker::new(1);
    tracker.start(4);
    tracker.record_success();
    tracker.record_success();
    tracker.record_failure();

    let snap = tracker.finish();
    assert_eq!(snap.succeeded, 2);
    assert_eq!(snap.failed, 1);
    assert_eq!(snap.completed(), 3);
    assert_eq!(snap.percent(), 75.0);
}

#[test]
fn concurrent_updates_are_not_lost() {
    let tracker = Arc::new(ProgressTracker::new(50));
    tracker.start(800);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let tracker = Arc::clone(&tracker);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    if i % 2 == 0 {
                        tracker.record_success();
                    } else {
                        tracker.record_failure();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snap = tracker.snapshot();
    assert_eq!(snap.succeeded, 400);
    assert_eq!(snap.failed, 400);
}

#[test]
fn rate_and_percent_handle_degenerate_inputs() {
    let empty = ProgressSnapshot {
        total: 0,
        succeeded: 0,
        failed: 0,
        elapsed: Duration::ZERO,
    };
    assert_eq!(empty.percent(), 100.0);
    assert_eq!(empty.rate(), 0.0);

    let two_per_sec = ProgressSnapshot {
        total: 10,
        succeeded: 6,
        failed: 4,
        elapsed: Duration::from_secs(5),
    };
    assert_eq!(two_per_sec.rate(), 2.0);
}
