//! Outbound fetching under rate limiting and retry
//!
//! Every adapter fetch goes through a [`FetchContext`], which pairs the
//! source's own [`RateLimiter`] with the run's [`RetryPolicy`] and the shared
//! [`HttpFetcher`].

mod http;
mod rate_limiter;
mod retry;

pub use http::HttpFetcher;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;

use crate::error::{FetchError, Result};
use std::future::Future;

/// Fetch capabilities handed to one source's adapter
#[derive(Debug)]
pub struct FetchContext {
    source: String,
    limiter: RateLimiter,
    policy: RetryPolicy,
    http: HttpFetcher,
}

impl FetchContext {
    pub fn new(
        source: impl Into<String>,
        limiter: RateLimiter,
        policy: RetryPolicy,
        http: HttpFetcher,
    ) -> Self {
        Self {
            source: source.into(),
            limiter,
            policy,
            http,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn http(&self) -> &HttpFetcher {
        &self.http
    }

    /// Run one fetch operation with rate limiting and retries.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<T, FetchError>>,
    {
        self.policy.execute(&self.source, &self.limiter, op).await
    }

    /// GET `url` as text with rate limiting and retries.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.execute(|_| self.http.get_text(url)).await
    }
}
