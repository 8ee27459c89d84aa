use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Single-slot throttle for football-data.org calls.
///
/// `schedule` runs one task at a time, in submission order, and spaces task
/// starts at least `min_interval` apart. One limiter is built at start-up and
/// shared by every import: the upstream quota is per API key.
///
/// Waiters queue on a fair mutex, so a task that never finishes holds up
/// everything behind it. There is no per-task timeout.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `task` once the slot is free and the spacing has elapsed.
    ///
    /// The task's output, including an `Err`, is handed straight back; a failed
    /// task releases the slot like any other.
    pub async fn schedule<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last_start = self.last_start.lock().await;

        if let Some(previous) = *last_start {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tracing::debug!("Throttling football-data call for {:?}", ready_at - Instant::now());
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_start = Some(Instant::now());
        task().await
    }
}
