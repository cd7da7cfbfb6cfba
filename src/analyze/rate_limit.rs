// src/analyze/rate_limit.rs
//! Bounded retry on throttling for classifier calls.
//!
//! Only `ProviderError::Throttled` is retried, after a fixed cool-down. Other errors
//! return immediately. When retries run out the caller sees `Throttled` and is expected
//! to stop classifying for the rest of the run.

use std::future::Future;
use std::time::{Duration, Instant};

use metrics::counter;
use tracing::{error, warn};

use crate::analyze::ai_adapter::ProviderError;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_retries: u32,
    cooldown: Duration,
}

impl RateLimiter {
    pub fn new(max_retries: u32, cooldown: Duration) -> Self {
        Self {
            max_retries,
            cooldown,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Run `op`, retrying up to `max_retries` times while it reports `Throttled`.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let total_t0 = Instant::now();
        let mut retries = 0u32;

        loop {
            match op().await {
                Err(ProviderError::Throttled) => {
                    if retries >= self.max_retries {
                        error!(
                            retries,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            "classifier still throttled; giving up"
                        );
                        return Err(ProviderError::Throttled);
                    }
                    retries += 1;
                    counter!("classifier_retries_total").increment(1);
                    warn!(
                        attempt = retries,
                        max = self.max_retries,
                        cooldown_ms = self.cooldown.as_millis() as u64,
                        "classifier throttled; cooling down"
                    );
                    tokio::time::sleep(self.cooldown).await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_throttle_then_succeeds() {
        let calls = AtomicU32::new(0);
        let rl = RateLimiter::new(2, Duration::from_secs(30));
        let t0 = tokio::time::Instant::now();
        let out = rl
            .call(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ProviderError::Throttled)
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;
        assert_eq!(out, Ok("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(t0.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_yield_throttled() {
        let calls = AtomicU32::new(0);
        let rl = RateLimiter::new(2, Duration::from_secs(1));
        let out: Result<(), _> = rl
            .call(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Throttled) }
            })
            .await;
        assert_eq!(out, Err(ProviderError::Throttled));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let rl = RateLimiter::new(5, Duration::from_secs(3600));
        let out: Result<(), _> = rl
            .call(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Failed("boom".into())) }
            })
            .await;
        assert_eq!(out, Err(ProviderError::Failed("boom".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
