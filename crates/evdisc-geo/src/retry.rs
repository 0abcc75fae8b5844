//! Back-off policy for geocoding calls.
//!
//! Only the geocode paths run through [`RetryPolicy::run`]. Autocomplete and
//! place-details calls are interactive and session-billed, so they get exactly
//! one attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::GeoError;

/// Longest single back-off delay.
const MAX_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) max_retries: u32,
    pub(crate) backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): the base doubled per
    /// earlier retry, capped at [`MAX_DELAY`], then scaled by `jitter`
    /// (expected in `0.75..1.25`).
    fn delay(&self, retry: u32, jitter: f64) -> Duration {
        let doublings = retry.saturating_sub(1).min(10);
        let nominal = self
            .backoff_base
            .saturating_mul(1 << doublings)
            .min(MAX_DELAY);
        nominal.mul_f64(jitter)
    }

    /// Runs `attempt` until it succeeds, fails permanently, or the retries
    /// are spent. Only transient failures (see [`GeoError::is_transient`])
    /// are retried.
    pub(crate) async fn run<T, F, Fut>(&self, context: &str, mut attempt: F) -> Result<T, GeoError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GeoError>>,
    {
        let mut retries = 0;
        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && retries < self.max_retries => err,
                Err(err) => return Err(err),
            };
            retries += 1;
            let delay = self.delay(retries, 0.75 + rand::random::<f64>() * 0.5);
            tracing::warn!(
                context,
                retry = retries,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient geocoding failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            backoff_base: Duration::from_millis(base_ms),
        }
    }

    #[test]
    fn delay_doubles_per_retry() {
        let p = policy(200);
        assert_eq!(p.delay(1, 1.0), Duration::from_millis(200));
        assert_eq!(p.delay(2, 1.0), Duration::from_millis(400));
        assert_eq!(p.delay(3, 1.0), Duration::from_millis(800));
    }

    #[test]
    fn delay_is_capped_before_jitter() {
        let p = policy(2_000);
        assert_eq!(p.delay(4, 1.0), MAX_DELAY);
        assert_eq!(p.delay(30, 0.75), MAX_DELAY.mul_f64(0.75));
    }

    #[test]
    fn zero_base_never_sleeps() {
        assert_eq!(policy(0).delay(5, 1.2), Duration::ZERO);
    }

    #[tokio::test]
    async fn provider_refusal_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), GeoError> = policy(100)
            .run("test", || {
                calls += 1;
                async { Err(GeoError::Unavailable("UNKNOWN_ERROR: try again".to_owned())) }
            })
            .await;
        assert!(matches!(result, Err(GeoError::Unavailable(_))));
        assert_eq!(calls, 1);
    }
}
