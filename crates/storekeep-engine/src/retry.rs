//! # Retry Policy
//!
//! Bounded exponential backoff around store calls.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt 1 ──► Ok(v)                         ──► Ok(v)                 │
//! │      │                                                                  │
//! │      ├──► Err(permanent)  (NotFound, FK, ..) ──► Err (no retry)        │
//! │      │                                                                  │
//! │      └──► Err(transient)  (Busy, pool, conn)                           │
//! │              │  sleep(backoff)  100ms → 200ms → 400ms ... ≤ max         │
//! │              ▼                                                          │
//! │           attempt 2 ... attempt N ──► StoreUnavailable                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business outcomes (insufficient stock, already cancelled) come back from
//! the store as `Ok(outcome)`, so they never enter this loop.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::{error, warn};

use storekeep_db::DbResult;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(5, Duration::from_millis(100), Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    /// A single attempt, no waiting.
    pub fn no_retry() -> Self {
        RetryPolicy::new(1, Duration::ZERO, Duration::ZERO)
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            // attempts bound the loop, not elapsed time
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempt
    /// budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut backoff = self.create_backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_transient() => return Err(err.into()),
                Err(err) => err,
            };

            if attempt >= self.max_attempts {
                error!(operation, attempt, error = %err, "Retry budget exhausted");
                return Err(EngineError::StoreUnavailable(format!(
                    "{operation} failed after {attempt} attempts: {err}"
                )));
            }

            let wait = backoff.next_backoff().unwrap_or(self.max_backoff);
            warn!(operation, attempt, ?wait, error = %err, "Transient store failure, retrying");
            tokio::time::sleep(wait).await;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storekeep_db::DbError;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast(5)
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DbError::Busy("database is locked".into()))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_store_unavailable() {
        let calls = AtomicU32::new(0);
        let result: EngineResult<()> = fast(3)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DbError::PoolExhausted)
            })
            .await;

        assert!(matches!(result, Err(EngineError::StoreUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: EngineResult<()> = fast(5)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DbError::not_found("Sale", "s-1"))
            })
            .await;

        assert!(matches!(result, Err(EngineError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts, 1);
    }
}
