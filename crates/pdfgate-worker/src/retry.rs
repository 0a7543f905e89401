//! Call-level retry of store and queue operations inside the worker loop.

use pdfgate_storage::{StorageError, StorageResult};
use std::future::Future;
use std::time::Duration;

/// First retry delay; doubles on every attempt.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Upper bound on a single retry delay.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Attempts per operation, the first one included.
pub const MAX_STORE_ATTEMPTS: u32 = 5;

/// Computes the delay before retry number `retry` (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff(retry: u32) -> Duration {
    RETRY_BASE_DELAY
        .saturating_mul(2_u32.saturating_pow(retry))
        .min(MAX_RETRY_BACKOFF)
}

fn is_retryable(err: &StorageError) -> bool {
    matches!(
        err,
        StorageError::Unavailable(_) | StorageError::BackendError(_)
    )
}

/// Run `op` until it succeeds, fails with a non-retryable error, or exhausts
/// [`MAX_STORE_ATTEMPTS`].
pub async fn with_retry<T, F, Fut>(operation: &'static str, mut op: F) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let mut retry = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable(&e) && retry + 1 < MAX_STORE_ATTEMPTS => {
                let delay = compute_retry_backoff(retry);
                tracing::warn!(
                    operation,
                    error = %e,
                    retry = retry + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Store operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff(0), Duration::from_millis(100));
        assert_eq!(compute_retry_backoff(1), Duration::from_millis(200));
        assert_eq!(compute_retry_backoff(3), Duration::from_millis(800));
        assert_eq!(compute_retry_backoff(6), MAX_RETRY_BACKOFF);
        assert_eq!(compute_retry_backoff(40), MAX_RETRY_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let value = with_retry("get", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StorageError::Unavailable("reset".into()))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: StorageResult<()> = with_retry("put", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Unavailable("down".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_STORE_ATTEMPTS);
    }

    #[tokio::test]
    async fn config_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: StorageResult<()> = with_retry("put", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::ConfigError("bad url".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn corrupt_values_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: StorageResult<()> = with_retry("load_record", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Corrupt("expected value at line 1".into()))
        })
        .await;
        assert!(matches!(result, Err(StorageError::Corrupt(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
