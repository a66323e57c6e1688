//! Bounded exponential-backoff retry.
//!
//! The policy is an explicit value, not a decorator: it is applied only at
//! call sites verified safe to repeat (conditional store read-modify-writes,
//! provider status queries). It is never wrapped around the provider's
//! create-applicant call — retrying an ambiguous failure there risks a
//! duplicate external applicant, and the provider documents no idempotency
//! key.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::Retryable;

/// Backoff schedule: `base_delay` doubling per attempt, capped at
/// `max_delay`, for at most `max_attempts` attempts total.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Schedule used for document-store operations: 4s..10s over 5 attempts,
    /// matching the service's historical backoff for Firestore writes.
    pub fn store_default() -> Self {
        Self::new(Duration::from_secs(4), Duration::from_secs(10), 5)
    }

    /// Tight schedule for provider status queries, which are cheap and
    /// read-only.
    pub fn provider_default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(2), 3)
    }

    /// Delay before the attempt following `attempt` (0-based), with up to
    /// 25% additive jitter so concurrent retriers do not re-collide.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        let capped = exp.min(self.max_delay);
        let jitter = rand::thread_rng().gen_range(0.0..0.25);
        capped.mul_f64(1.0 + jitter)
    }

    /// Run `op`, retrying while the returned error is transient and the
    /// attempt budget lasts. The final error is propagated unchanged.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), Duration::from_millis(5), max_attempts)
    }

    #[tokio::test]
    async fn succeeds_first_try_without_sleeping() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, StoreError> = fast_policy(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, StoreError> = fast_policy(5)
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(StoreError::Transient("flaky".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = fast_policy(3)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Transient("down".into())) }
            })
            .await;
        assert!(matches!(result, Err(StoreError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), StoreError> = fast_policy(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(StoreError::InvalidDocument {
                        uid: "u1".into(),
                        reason: "bad shape".into(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(StoreError::InvalidDocument { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
