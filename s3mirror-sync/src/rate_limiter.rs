//! Token-bucket admission control shared by all transfer workers.

use crate::error::{SyncError, SyncResult};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;

/// Cooperative cancellation signal. `true` means stop.
pub type CancelSignal = watch::Receiver<bool>;

/// Creates a cancellation sender and its signal.
pub fn cancel_channel() -> (watch::Sender<bool>, CancelSignal) {
    watch::channel(false)
}

/// Resolves once `signal` is raised. Never resolves if every sender is
/// dropped without raising it.
pub async fn cancelled(signal: &mut CancelSignal) {
    let closed = signal.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket whose capacity and refill rate are both `rate` per second.
/// Starts full.
pub struct RateLimiter {
    rate: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(rate_per_sec: u32) -> Self {
        let rate = f64::from(rate_per_sec.max(1));
        Self {
            rate,
            bucket: Mutex::new(Bucket {
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Waits for a token, or fails with [`SyncError::Canceled`] once `cancel`
    /// is raised. A canceled wait consumes no token.
    pub async fn acquire(&self, cancel: &mut CancelSignal) -> SyncResult<()> {
        loop {
            let stop = *cancel.borrow();
            if stop {
                return Err(SyncError::Canceled);
            }

            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.rate);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return Ok(());
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancelled(cancel) => return Err(SyncError::Canceled),
            }
        }
    }

    /// Returns a token taken by [`acquire`](Self::acquire) that went unused.
    pub async fn refund(&self) {
        let mut bucket = self.bucket.lock().await;
        bucket.tokens = (bucket.tokens + 1.0).min(self.rate);
    }

    /// Tokens currently available, after refill.
    pub async fn available(&self) -> f64 {
        let bucket = self.bucket.lock().await;
        let elapsed = Instant::now()
            .duration_since(bucket.last_refill)
            .as_secs_f64();
        (bucket.tokens + elapsed * self.rate).min(self.rate)
    }
}
