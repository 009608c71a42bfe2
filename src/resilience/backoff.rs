//! Retry with exponential backoff and jitter.
//!
//! The delay before retry `n` (1-based) is `min(base_delay * 2^(n-1), max_delay)`,
//! plus jitter drawn uniformly from `[0, 0.1 * delay]`. The cap applies before
//! jitter, so a realized delay may exceed `max_delay` by up to 10%.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::config::{RETRY_BASE_DELAY, RETRY_JITTER_RATIO, RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY};
use crate::error_handling::ConfigError;

/// Decides whether an error is worth another attempt.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Called before each backoff sleep with `(attempt, error, delay)`.
pub type RetryObserver<E> = Arc<dyn Fn(u32, &E, Duration) + Send + Sync>;

/// How many times to run an operation and how long to wait in between.
///
/// Built through [`RetryPolicy::builder`], which validates the fields.
pub struct RetryPolicy<E> {
    pub(super) max_attempts: u32,
    pub(super) base_delay: Duration,
    pub(super) max_delay: Duration,
    pub(super) should_retry: RetryPredicate<E>,
    pub(super) on_retry: Option<RetryObserver<E>>,
}

impl<E> RetryPolicy<E> {
    /// Starts a builder populated with the defaults (3 attempts, 1s base, 30s cap).
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder {
            policy: RetryPolicy::default(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Pre-jitter delay after the given failed attempt (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    fn should_retry(&self, error: &E) -> bool {
        (self.should_retry)(error)
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_delay: RETRY_BASE_DELAY,
            max_delay: RETRY_MAX_DELAY,
            should_retry: Arc::new(|_: &E| true),
            on_retry: None,
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            should_retry: Arc::clone(&self.should_retry),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("on_retry", &self.on_retry.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder<E> {
    policy: RetryPolicy<E>,
}

impl<E> RetryPolicyBuilder<E> {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.policy.base_delay = base_delay;
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.policy.max_delay = max_delay;
        self
    }

    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.policy.should_retry = Arc::new(predicate);
        self
    }

    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &E, Duration) + Send + Sync + 'static,
    {
        self.policy.on_retry = Some(Arc::new(observer));
        self
    }

    /// Validates and returns the policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRetryPolicy` if `max_attempts` is zero or
    /// `base_delay` exceeds `max_delay`.
    pub fn build(self) -> Result<RetryPolicy<E>, ConfigError> {
        if self.policy.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.policy.base_delay > self.policy.max_delay {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "base_delay {:?} exceeds max_delay {:?}",
                self.policy.base_delay, self.policy.max_delay
            )));
        }
        Ok(self.policy)
    }
}

/// Failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The policy declined to retry; `error` is the original error, untouched.
    #[error("{error}")]
    Aborted {
        /// Attempts made, including the one that failed with `error`
        attempts: u32,
        error: E,
    },

    /// Every attempt failed with a retryable error.
    #[error("Operation failed after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Total attempts made (equals the policy's `max_attempts`)
        attempts: u32,
        /// Error of the final attempt
        #[source]
        last_error: E,
    },
}

impl<E> RetryError<E> {
    /// Number of times the operation ran.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Aborted { attempts, .. } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Aborted { error, .. } => error,
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Aborted { error, .. } => error,
            RetryError::Exhausted { last_error, .. } => last_error,
        }
    }
}

/// Random jitter in `[0, RETRY_JITTER_RATIO * delay]`.
pub(crate) fn jitter(delay: Duration) -> Duration {
    let max_secs = delay.as_secs_f64() * RETRY_JITTER_RATIO;
    if max_secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(rand::rng().random_range(0.0..=max_secs))
}

/// Runs `operation` until it succeeds, the policy declines to retry, or the
/// attempts run out.
///
/// # Errors
///
/// - `RetryError::Aborted` with the original error when `should_retry` returns false
///   (the operation ran once more than the number of sleeps taken, which is `attempts`)
/// - `RetryError::Exhausted` after `max_attempts` failed attempts; there is no sleep
///   after the final attempt
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use demographics_data::resilience::{retry_with_backoff, RetryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = RetryPolicy::<std::io::Error>::builder()
///     .max_attempts(5)
///     .base_delay(Duration::from_millis(200))
///     .build()?;
/// let body = retry_with_backoff(|| tokio::fs::read_to_string("stats.json"), &policy).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    policy: &RetryPolicy<E>,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !policy.should_retry(&error) {
            return Err(RetryError::Aborted {
                attempts: attempt,
                error,
            });
        }

        if attempt >= policy.max_attempts {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last_error: error,
            });
        }

        let delay = policy.backoff_delay(attempt);
        let wait = delay.saturating_add(jitter(delay));
        if let Some(on_retry) = &policy.on_retry {
            on_retry(attempt, &error, wait);
        }
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}
