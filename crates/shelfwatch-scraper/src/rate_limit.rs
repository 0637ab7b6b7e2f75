//! Retry with exponential backoff for page navigation.
//!
//! Rate limiting (HTTP 429), transport failures and navigation timeouts are
//! retried. Everything else (a browser that died, a bad selector) is
//! propagated immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Transient conditions worth another navigation attempt.
fn is_retriable(err: &ScraperError) -> bool {
    matches!(
        err,
        ScraperError::RateLimited { .. }
            | ScraperError::Http(_)
            | ScraperError::NavigationTimeout { .. }
            | ScraperError::Navigation { .. }
    )
}

/// Runs `attempt_fn` until it succeeds, fails permanently, or `max_retries`
/// retries have been spent; the last error is returned in the latter case.
///
/// Before retry `n` (zero-based) it sleeps `backoff_base_ms * 2^n`, so a base
/// of 500 ms waits 500 ms, then 1 s, then 2 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut attempt_fn: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut retry = 0u32;
    loop {
        let err = match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retriable(&err) && retry < max_retries => err,
            Err(err) => return Err(err),
        };

        let delay_ms = backoff_base_ms.saturating_mul(1u64 << retry.min(62));
        tracing::warn!(
            retry,
            max_retries,
            delay_ms,
            error = %err,
            "transient navigation error; backing off"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        retry += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    const URL: &str = "https://shop.example/p/1";

    /// Replays `outcomes` in order and records how many were consumed.
    struct Script {
        outcomes: Mutex<VecDeque<Result<u32, ScraperError>>>,
        calls: Mutex<u32>,
    }

    impl Script {
        fn new(outcomes: Vec<Result<u32, ScraperError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            }
        }

        async fn next(&self) -> Result<u32, ScraperError> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ScraperError::Browser("script exhausted".to_owned())))
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    fn throttled() -> Result<u32, ScraperError> {
        Err(ScraperError::RateLimited { url: URL.to_owned() })
    }

    fn timed_out() -> Result<u32, ScraperError> {
        Err(ScraperError::NavigationTimeout {
            url: URL.to_owned(),
            timeout_secs: 60,
        })
    }

    #[tokio::test]
    async fn first_success_is_returned_without_retrying() {
        let script = Script::new(vec![Ok(7)]);
        let result = retry_with_backoff(2, 0, || script.next()).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let script = Script::new(vec![throttled(), timed_out(), Ok(200)]);
        let result = retry_with_backoff(2, 0, || script.next()).await;
        assert_eq!(result.unwrap(), 200);
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn last_error_survives_exhaustion() {
        let script = Script::new(vec![throttled(), throttled(), timed_out(), Ok(1)]);
        let result = retry_with_backoff(2, 0, || script.next()).await;
        assert!(matches!(result, Err(ScraperError::NavigationTimeout { .. })));
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn browser_failure_is_permanent() {
        let script = Script::new(vec![
            Err(ScraperError::Browser("target crashed".to_owned())),
            Ok(1),
        ]);
        let result = retry_with_backoff(2, 0, || script.next()).await;
        assert!(matches!(result, Err(ScraperError::Browser(_))));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_from_base() {
        let script = Script::new(vec![throttled(), throttled(), throttled()]);
        let started = tokio::time::Instant::now();
        assert!(retry_with_backoff(2, 500, || script.next()).await.is_err());
        // 500 ms + 1000 ms of virtual time.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1600), "{elapsed:?}");
    }
}
