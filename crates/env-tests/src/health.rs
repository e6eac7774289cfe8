//! Bounded health convergence polling.
//!
//! The poller queries cluster health at a fixed interval until a query
//! succeeds or the attempt budget runs out. Attempts are strictly sequential
//! and the first one is made without waiting.

use harness_common::config::RetryPolicy;
use harness_common::contracts::HealthQuery;
use harness_common::types::HealthStatus;
use std::future::Future;
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::errors::HarnessError;

/// Run `operation` until it succeeds, at most `policy.attempts()` times.
///
/// `operation` receives the 1-based attempt number. Consecutive attempts are
/// `policy.interval()` apart, with no wait before the first and none after
/// the last. On exhaustion the error of the final attempt is returned.
pub async fn retry_fixed_interval<T, E, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.attempts() => return Err(e),
            Err(_) => {
                sleep(policy.interval()).await;
                attempt += 1;
            }
        }
    }
}

/// Polls a [`HealthQuery`] until the cluster reports healthy.
pub struct HealthPoller<H> {
    query: H,
    policy: RetryPolicy,
}

impl<H: HealthQuery> HealthPoller<H> {
    pub fn new(query: H, policy: RetryPolicy) -> Self {
        Self { query, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Poll until the cluster reports healthy.
    ///
    /// Makes at most `attempts` queries and sleeps `interval` between
    /// consecutive ones, never before the first or after the last. On
    /// exhaustion the last query error is returned inside
    /// [`HarnessError::ConvergenceTimeout`].
    #[instrument(skip_all, name = "env_tests.health.wait_for_healthy")]
    pub async fn wait_for_healthy(&self) -> Result<HealthStatus, HarnessError> {
        let attempts = self.policy.attempts();
        let query = &self.query;

        retry_fixed_interval(self.policy, |attempt| async move {
            match query.query_health().await {
                Ok(status) => {
                    info!(
                        target: "env_tests.health",
                        attempt,
                        status = ?status.as_json(),
                        "Cluster is healthy"
                    );
                    Ok(status)
                }
                Err(e) => {
                    info!(
                        target: "env_tests.health",
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "Waiting for cluster to become healthy"
                    );
                    Err(e)
                }
            }
        })
        .await
        .map_err(|last_error| HarnessError::ConvergenceTimeout {
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_at_first_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let policy = RetryPolicy::new(5, Duration::from_secs(2)).unwrap();
        let start = Instant::now();

        let result: Result<u32, ()> = retry_fixed_interval(policy, |attempt| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if attempt >= 2 {
                Ok(attempt)
            } else {
                Err(())
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_with_final_error() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1)).unwrap();
        let start = Instant::now();

        let result: Result<(), u32> =
            retry_fixed_interval(policy, |attempt| async move { Err(attempt) }).await;

        assert_eq!(result, Err(3));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_first_attempt_does_not_wait() {
        let policy = RetryPolicy::new(4, Duration::from_secs(30)).unwrap();
        let start = Instant::now();

        let result: Result<&str, ()> =
            retry_fixed_interval(policy, |_| async { Ok("up") }).await;

        assert_eq!(result, Ok("up"));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
