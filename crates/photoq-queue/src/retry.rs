//! Bounded retry for broker operations.
//!
//! Every broker operation in this crate (declare, publish, each consume
//! iteration, settlement) runs through [`run_with_retry`], so transport
//! recovery lives in exactly one place.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::QueueResult;

/// Retry policy applied to broker operations.
///
/// `max_attempts` counts the first try: the default of 3 means one initial
/// attempt plus two retries, with a fixed pause between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Create policy from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("QUEUE_RETRY_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts)
                .max(1),
            backoff: Duration::from_millis(
                std::env::var("QUEUE_RETRY_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.backoff.as_millis() as u64),
            ),
        }
    }
}

/// Run `op`, retrying transient failures up to the policy bound.
///
/// Between attempts the loop sleeps for the configured backoff and then
/// invokes `recover` (the connection manager wires this to `reconnect`).
/// The last transient error is surfaced once the bound is hit; permanent
/// errors and recovery failures propagate on the spot.
pub async fn run_with_retry<T, Op, OpFut, Rec, RecFut>(
    policy: &RetryPolicy,
    operation: &str,
    op: Op,
    recover: Rec,
) -> QueueResult<T>
where
    Op: Fn() -> OpFut,
    OpFut: Future<Output = QueueResult<T>>,
    Rec: Fn() -> RecFut,
    RecFut: Future<Output = QueueResult<()>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    "transient broker error, reconnecting: {}",
                    e
                );
                tokio::time::sleep(policy.backoff).await;
                recover().await?;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueError;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn connection_closed() -> QueueError {
        QueueError::Redis(io::Error::new(io::ErrorKind::ConnectionReset, "connection closed").into())
    }

    fn bad_credentials() -> QueueError {
        QueueError::Redis(redis::RedisError::from((
            redis::ErrorKind::AuthenticationFailed,
            "invalid password",
        )))
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_immediate_success_makes_one_attempt() {
        let attempts = AtomicU32::new(0);
        let recoveries = AtomicU32::new(0);

        let result = run_with_retry(
            &fast_policy(),
            "test",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            },
            || {
                recoveries.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(recoveries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_two_transient_failures_then_success() {
        let attempts = AtomicU32::new(0);
        let recoveries = AtomicU32::new(0);

        let result = run_with_retry(
            &fast_policy(),
            "publish",
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(connection_closed())
                    } else {
                        Ok("sent")
                    }
                }
            },
            || {
                recoveries.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert_eq!(result.unwrap(), "sent");
        // Three attempts total, reconnect invoked exactly twice
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(recoveries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bound_exhaustion_surfaces_last_error() {
        let attempts = AtomicU32::new(0);
        let recoveries = AtomicU32::new(0);

        let result: QueueResult<()> = run_with_retry(
            &fast_policy(),
            "publish",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(connection_closed()) }
            },
            || {
                recoveries.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.is_transient());
        // No attempts beyond the bound
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(recoveries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let recoveries = AtomicU32::new(0);

        let result: QueueResult<()> = run_with_retry(
            &fast_policy(),
            "declare",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(bad_credentials()) }
            },
            || {
                recoveries.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(recoveries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_recovery_propagates() {
        let attempts = AtomicU32::new(0);

        let result: QueueResult<()> = run_with_retry(
            &fast_policy(),
            "consume",
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(connection_closed()) }
            },
            || async { Err(QueueError::connection_failed("broker gone")) },
        )
        .await;

        assert!(matches!(result, Err(QueueError::ConnectionFailed(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_env_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(1));
    }
}
