//! Retry logic with exponential backoff
//!
//! Every remote call of a conversion run is wrapped on its own: a failing
//! upload is retried, but a failure there never re-runs the download.
//!
//! # Example
//!
//! ```no_run
//! use sheet_relay::retry::{IsRetryable, with_retry};
//! use sheet_relay::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! with_retry(&config, "ping", || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the operation should be attempted again
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Transport faults (refused, DNS, timeout)
            Error::Transport { .. } => true,
            // Every non-2xx status is retried, 4xx included
            Error::Service { .. } => true,
            // A malformed body may be a transient service hiccup
            Error::Shape { .. } => true,
            Error::Config { .. }
            | Error::InvalidUrl { .. }
            | Error::Validation(_)
            | Error::SizeLimit { .. }
            | Error::Io(_)
            | Error::ApiServerError(_) => false,
        }
    }
}

/// Delay before attempt `attempt + 1`, given that `attempt` (1-based) just failed
///
/// `initial_delay * backoff_multiplier^(attempt - 1)`
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1) as i32;
    Duration::from_secs_f64(
        config.initial_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent),
    )
}

/// Execute an async operation up to `config.max_attempts` times
///
/// Attempt 1 is the initial call. After each retryable failure except the
/// last, waits [`backoff_delay`] before trying again. Non-retryable errors
/// are returned immediately. When all attempts fail, the error of the last
/// attempt is returned as-is.
///
/// # Arguments
///
/// * `config` - Retry configuration (max attempts, initial delay, multiplier, jitter)
/// * `label` - Name of the operation for log output
/// * `operation` - Async closure that returns `Result<T, E>`
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(operation = label, attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = backoff_delay(config, attempt);
                let delay = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    operation = label,
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        operation = label,
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        operation = label,
                        error = %e,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Stretch a delay by a uniformly random 0-100%
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient(u32),
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Transient(n) => write!(f, "transient error #{n}"),
                TestError::Permanent => write!(f, "permanent error"),
            }
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient(_))
        }
    }

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            backoff_multiplier: 1.5,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_success_no_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(3), "test", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds_on_third_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = std::time::Instant::now();

        let result = with_retry(&fast_config(3), "test", || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if count < 3 {
                    Err(TestError::Transient(count))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // 10ms + 15ms
        assert!(
            start.elapsed() >= Duration::from_millis(25),
            "should wait twice, waited {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error_unchanged() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(3), "test", || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<i32, _>(TestError::Transient(count))
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), TestError::Transient(3));
        assert_eq!(
            counter.load(Ordering::SeqCst),
            3,
            "max_attempts counts the initial call"
        );
    }

    #[tokio::test]
    async fn test_permanent_error_no_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(5), "test", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Permanent)
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), TestError::Permanent);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_calls_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&fast_config(0), "test", || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(TestError::Transient(1))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exponential_backoff_total_wait() {
        let config = RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(20),
            backoff_multiplier: 1.5,
            jitter: false,
        };
        let start = std::time::Instant::now();

        let _ = with_retry(&config, "test", || async {
            Err::<i32, _>(TestError::Transient(0))
        })
        .await;

        // 20ms + 30ms + 45ms, no sleep after the last attempt
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(95),
            "should wait at least 95ms, waited {:?}",
            elapsed
        );
        assert!(
            elapsed < Duration::from_secs(2),
            "should not wait too long, waited {:?}",
            elapsed
        );
    }

    #[test]
    fn backoff_delay_grows_by_multiplier() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 1.5,
            jitter: false,
        };

        assert_eq!(backoff_delay(&config, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&config, 2), Duration::from_millis(1500));
        assert_eq!(backoff_delay(&config, 3), Duration::from_millis(2250));
    }

    #[test]
    fn jitter_stays_within_double_delay() {
        let delay = Duration::from_millis(100);
        for _ in 0..20 {
            let jittered = add_jitter(delay);
            assert!(jittered >= delay);
            assert!(jittered <= delay * 2);
        }
    }

    #[test]
    fn remote_faults_are_retryable() {
        let transport = Error::Transport {
            stage: Stage::Uploading,
            endpoint: "http://svc/upload".into(),
            message: "connection refused".into(),
            timed_out: false,
        };
        let client_error = Error::Service {
            stage: Stage::SettingParameters,
            endpoint: "http://svc".into(),
            status: 400,
            status_text: "Bad Request".into(),
            body: String::new(),
        };
        let shape = Error::shape(Stage::ListingSheets, "http://svc", "not an array", None);

        assert!(transport.is_retryable());
        assert!(client_error.is_retryable(), "4xx responses are retried too");
        assert!(shape.is_retryable());
    }

    #[test]
    fn local_faults_are_terminal() {
        assert!(!Error::Validation("no sheets".into()).is_retryable());
        assert!(
            !Error::SizeLimit {
                size_bytes: 2,
                limit_bytes: 1
            }
            .is_retryable()
        );
        assert!(
            !Error::InvalidUrl {
                field: "file URL",
                url: String::new()
            }
            .is_retryable()
        );
    }
}
