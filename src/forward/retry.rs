//! Exponential backoff for redelivering forwarded payloads.
//!
//! A payload only reaches the retry path after its first delivery failed, so
//! every attempt here is preceded by a delay:
//!
//! - Default: 3 retries with 3s, 6s, 12s delays
//!
//! Permanent errors end the sequence immediately.

use std::future::Future;
use std::time::Duration;

use super::client::ForwardError;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential growth).
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Default redelivery configuration.
    ///
    /// - 3 retries with 3s, 6s, 12s delays
    /// - Total max wait: ~21 seconds
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(3),
        max_delay: Duration::from_secs(30),
        backoff_multiplier: 2.0,
    };

    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the delay before the given retry attempt (0-indexed).
    ///
    /// The delay grows exponentially: `initial_delay * backoff_multiplier^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }

    /// Returns an iterator over all retry delays.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.delay_for_attempt(attempt))
    }

    /// Computes the total maximum wait time for all retries.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of a redelivery sequence.
#[derive(Debug)]
pub enum RetryResult<T> {
    /// An attempt succeeded.
    Success(T),

    /// Every retry failed with a transient error.
    ExhaustedRetries {
        last_error: ForwardError,
        attempts: u32,
    },

    /// A permanent error occurred (not retriable).
    PermanentError(ForwardError),
}

impl<T> RetryResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }
}

/// Retries an operation that has already failed once.
///
/// Sleeps before each attempt according to `config`. With `max_retries == 0`
/// the operation is never called and the original error is returned as
/// exhausted.
pub async fn retry_after_failure<T, F, Fut>(
    config: RetryConfig,
    first_error: ForwardError,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ForwardError>>,
{
    let mut last_error = first_error;
    let mut attempts = 0;

    for delay in config.delays() {
        tokio::time::sleep(delay).await;
        attempts += 1;

        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if !e.is_transient() => return RetryResult::PermanentError(e),
            Err(e) => last_error = e,
        }
    }

    RetryResult::ExhaustedRetries {
        last_error,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryConfig {
        RetryConfig::new(max_retries, Duration::from_millis(1), Duration::from_millis(4), 2.0)
    }

    fn unavailable() -> ForwardError {
        ForwardError::Status { status: 503 }
    }

    #[test]
    fn default_delays_are_3_6_12() {
        let delays: Vec<_> = RetryConfig::DEFAULT.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(3),
                Duration::from_secs(6),
                Duration::from_secs(12)
            ]
        );
        assert_eq!(RetryConfig::DEFAULT.total_max_wait(), Duration::from_secs(21));
    }

    #[test]
    fn delays_respect_cap() {
        let config = RetryConfig::new(6, Duration::from_secs(3), Duration::from_secs(20), 2.0);
        let delays: Vec<_> = config.delays().collect();
        assert_eq!(delays[2], Duration::from_secs(12));
        for delay in &delays[3..] {
            assert_eq!(*delay, Duration::from_secs(20));
        }
    }

    #[tokio::test]
    async fn succeeds_on_second_retry() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_after_failure(fast(3), unavailable(), move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move { if count < 1 { Err(unavailable()) } else { Ok(count) } }
        })
        .await;

        assert!(result.is_success());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_error_stops_retrying() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_after_failure(fast(3), unavailable(), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ForwardError::Status { status: 401 }) }
        })
        .await;

        assert!(matches!(result, RetryResult::PermanentError(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_after_max_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_after_failure(fast(3), unavailable(), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(unavailable()) }
        })
        .await;

        match result {
            RetryResult::ExhaustedRetries { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("Expected ExhaustedRetries, got {:?}", other),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_never_calls_operation() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry_after_failure(fast(0), unavailable(), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ForwardError>(()) }
        })
        .await;

        assert!(matches!(
            result,
            RetryResult::ExhaustedRetries { attempts: 0, .. }
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
