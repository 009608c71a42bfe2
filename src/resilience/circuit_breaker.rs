//! Circuit breaker for a shared downstream dependency.
//!
//! Stops calling a dependency that keeps failing. After `failure_threshold`
//! consecutive failures the circuit opens and calls are rejected without running;
//! once `recovery_timeout` has passed since the last failure, the next call runs as
//! a half-open trial. A success closes the circuit, a failure re-checks the
//! threshold.
//!
//! One breaker models the health of one dependency: callers sharing an instance
//! see each other's transitions.

use std::future::Future;
use std::time::Duration;

use strum_macros::{AsRefStr, Display};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::{
    BREAKER_FAILURE_THRESHOLD, BREAKER_MONITORING_PERIOD, BREAKER_RECOVERY_TIMEOUT,
};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls run normally
    Closed,
    /// Calls are rejected until the recovery timeout elapses
    Open,
    /// One trial call decides whether to close again
    HalfOpen,
}

/// Read-only view of the breaker's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failures: u32,
    pub last_failure_time: Option<Instant>,
}

/// Failure of a call made through the breaker.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// Rejected without running the wrapped function.
    #[error("circuit breaker is open")]
    Open,

    /// The wrapped function ran and failed; its error is passed through.
    #[error(transparent)]
    Inner(E),
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failures: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker tracking consecutive failures.
pub struct CircuitBreaker {
    name: String,
    /// Number of consecutive failures before opening circuit
    failure_threshold: u32,
    /// Time since the last failure before a trial call is allowed
    recovery_timeout: Duration,
    /// Not used by transitions; failures are counted since the last success
    monitoring_period: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Creates a circuit breaker with default settings.
    ///
    /// Defaults:
    /// - Failure threshold: 5 consecutive failures
    /// - Recovery timeout: 60 seconds
    /// - Monitoring period: 10 seconds
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_threshold(name, BREAKER_FAILURE_THRESHOLD, BREAKER_RECOVERY_TIMEOUT)
    }

    /// Creates a circuit breaker with custom settings.
    ///
    /// # Arguments
    ///
    /// * `name` - Identifies the protected dependency in logs
    /// * `failure_threshold` - Consecutive failures before opening the circuit (at least 1)
    /// * `recovery_timeout` - How long after the last failure a trial call is allowed
    pub fn with_threshold(
        name: impl Into<String>,
        failure_threshold: u32,
        recovery_timeout: Duration,
    ) -> Self {
        CircuitBreaker {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            monitoring_period: BREAKER_MONITORING_PERIOD,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failures: 0,
                last_failure_time: None,
            }),
        }
    }

    pub fn with_monitoring_period(mut self, monitoring_period: Duration) -> Self {
        self.monitoring_period = monitoring_period;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    pub fn monitoring_period(&self) -> Duration {
        self.monitoring_period
    }

    /// Runs `f` unless the circuit is open.
    ///
    /// The lock is released while `f` runs, so concurrent callers are not
    /// serialized by the breaker.
    ///
    /// # Errors
    ///
    /// `CircuitBreakerError::Open` if the call was rejected (`f` never ran),
    /// otherwise `CircuitBreakerError::Inner` with `f`'s own error.
    pub async fn execute<T, E, F, Fut>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.allow_request().await {
            return Err(CircuitBreakerError::Open);
        }

        match f().await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(e) => {
                self.record_failure().await;
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    /// Decides whether a call may run, moving Open to HalfOpen once the
    /// recovery timeout has passed.
    async fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Open {
            return true;
        }

        let recovered = inner
            .last_failure_time
            .is_some_and(|t| t.elapsed() > self.recovery_timeout);
        if recovered {
            inner.state = CircuitState::HalfOpen;
            log::info!(
                "Circuit breaker '{}': recovery timeout elapsed, trying a half-open call",
                self.name
            );
            true
        } else {
            log::debug!("Circuit breaker '{}': rejecting call (open)", self.name);
            false
        }
    }

    /// Records a successful call.
    ///
    /// Resets the failure count and closes a half-open circuit. A success that
    /// lands while the circuit is open (another caller opened it meanwhile) is
    /// ignored.
    async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => inner.failures = 0,
            CircuitState::HalfOpen => {
                inner.failures = 0;
                inner.state = CircuitState::Closed;
                log::info!(
                    "Circuit breaker '{}': circuit closed after successful call",
                    self.name
                );
            }
            CircuitState::Open => {}
        }
    }

    /// Records a failed call.
    ///
    /// Increments the failure count and opens the circuit when the threshold is
    /// reached, from Closed and HalfOpen alike.
    async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.failures = inner.failures.saturating_add(1);
        inner.last_failure_time = Some(Instant::now());

        if inner.failures >= self.failure_threshold && inner.state != CircuitState::Open {
            inner.state = CircuitState::Open;
            log::warn!(
                "Circuit breaker '{}': circuit opened after {} consecutive failures (recovery: {}s)",
                self.name,
                inner.failures,
                self.recovery_timeout.as_secs()
            );
        }
    }

    /// Current state, failure count and last failure time.
    pub async fn state(&self) -> CircuitSnapshot {
        let inner = self.inner.lock().await;
        CircuitSnapshot {
            state: inner.state,
            failures: inner.failures,
            last_failure_time: inner.last_failure_time,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new("default")
    }
}
