//! Bounded retry with exponential backoff

use super::rate_limiter::RateLimiter;
use crate::error::{FetchError, IngestError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times a transient fetch failure is retried, and how long to wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_retries,
            base,
            cap,
        }
    }

    /// Wait after failed attempt number `attempt` (zero-based): `base * 2^attempt`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |wait| wait.min(self.cap))
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// Every attempt, retries included, first waits on `limiter`. `op` gets the
    /// zero-based attempt number.
    pub async fn execute<T, F, Fut>(&self, source: &str, limiter: &RateLimiter, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, FetchError>>,
    {
        let mut attempt = 0u32;
        loop {
            limiter.acquire().await;

            let cause = match op(attempt).await {
                Ok(value) => {
                    debug!(source, phase = "fetch", outcome = "ok", attempt = attempt + 1);
                    return Ok(value);
                },
                Err(cause) => cause,
            };

            if cause.is_transient() && attempt < self.max_retries {
                let wait = self.backoff(attempt);
                warn!(
                    source,
                    phase = "fetch",
                    outcome = "retry",
                    attempt = attempt + 1,
                    detail = %cause,
                    backoff_ms = wait.as_millis() as u64,
                    "Fetch attempt failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            warn!(
                source,
                phase = "fetch",
                outcome = "failed",
                attempt = attempt + 1,
                detail = %cause,
                "Fetch failed"
            );
            return Err(IngestError::FetchFailed {
                attempts: attempt + 1,
                cause,
            });
        }
    }
}
