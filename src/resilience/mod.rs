//! Resilience layer: retry with backoff and circuit breaking.
//!
//! - [`retry_with_backoff`] retries any async operation under a [`RetryPolicy`]
//! - [`retry_database_operation`] does the same with database defaults and a
//!   transient-error classifier
//! - [`CircuitBreaker`] stops calling a dependency that keeps failing
//!
//! The pieces are independent; `storage::Database` composes them.

mod backoff;
mod circuit_breaker;
mod retry;

pub use backoff::{
    retry_with_backoff, RetryError, RetryObserver, RetryPolicy, RetryPolicyBuilder,
    RetryPredicate,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitSnapshot, CircuitState};
pub use retry::{
    db_retry_policy, is_retryable_db_error, retry_database_operation, ErrorCode, RetryOverrides,
};
