//! Transfer progress counters and periodic throughput reporting.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::info;

/// Point-in-time copy of the progress counters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed() as f64 * 100.0 / self.total as f64
    }

    /// Completed items per second since `start`.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= f64::EPSILON {
            return 0.0;
        }
        self.completed() as f64 / secs
    }
}

struct Counters {
    total: usize,
    succeeded: usize,
    failed: usize,
    started_at: Instant,
}

/// Thread-safe transfer counters. Purely observational.
pub struct ProgressTracker {
    counters: Mutex<Counters>,
    report_every: usize,
}

impl ProgressTracker {
    pub fn new(report_every: usize) -> Self {
        Self {
            counters: Mutex::new(Counters {
                total: 0,
                succeeded: 0,
                failed: 0,
                started_at: Instant::now(),
            }),
            report_every: report_every.max(1),
        }
    }

    /// Resets the counters for a run of `total` items.
    pub fn start(&self, total: usize) {
        let mut c = self.lock();
        c.total = total;
        c.succeeded = 0;
        c.failed = 0;
        c.started_at = Instant::now();
        info!("starting download of {total} objects");
    }

    pub fn record_success(&self) {
        let mut c = self.lock();
        c.succeeded += 1;
        self.maybe_report(&c);
    }

    pub fn record_failure(&self) {
        let mut c = self.lock();
        c.failed += 1;
        self.maybe_report(&c);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        snapshot_of(&self.lock())
    }

    /// Logs the terminal summary and returns the final counters.
    pub fn finish(&self) -> ProgressSnapshot {
        let snap = self.snapshot();
        info!(
            "download finished in {:.1?}: {} succeeded, {} failed, {:.1} objects/sec",
            snap.elapsed,
            snap.succeeded,
            snap.failed,
            snap.rate()
        );
        snap
    }

    fn maybe_report(&self, c: &Counters) {
        let completed = c.succeeded + c.failed;
        if completed % self.report_every != 0 && completed != c.total {
            return;
        }
        let snap = snapshot_of(c);
        info!(
            "progress: {}/{} objects ({:.1}%), succeeded: {}, failed: {}, rate: {:.1} objects/sec",
            completed,
            snap.total,
            snap.percent(),
            snap.succeeded,
            snap.failed,
            snap.rate()
        );
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn snapshot_of(c: &Counters) -> ProgressSnapshot {
    ProgressSnapshot {
        total: c.total,
        succeeded: c.succeeded,
        failed: c.failed,
        elapsed: c.started_at.elapsed(),
    }
}
