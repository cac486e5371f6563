//! Per-source request spacing

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum delay between permitted fetches of one source.
///
/// Waiters are served in arrival order: the lock is a fair queue and is held
/// across the wait, so a later caller cannot overtake an earlier one.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    last_permit: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_permit: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until at least `delay` has passed since the previous permit.
    pub async fn acquire(&self) {
        let mut last = self.last_permit.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.delay;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
