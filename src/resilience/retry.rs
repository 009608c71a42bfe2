//! Error retriability for database operations.
//!
//! A database error is retryable when it carries one of the transient codes
//! (`SQLITE_BUSY`, `SQLITE_LOCKED`, `ETIMEDOUT`, `ECONNRESET`, `ECONNREFUSED`) or
//! when its message mentions a timeout or a connection. Everything else, SQL
//! syntax errors and constraint violations included, fails on the first attempt.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{
    DB_RETRY_BASE_DELAY, DB_RETRY_MAX_ATTEMPTS, RETRYABLE_ERROR_CODES,
    RETRYABLE_MESSAGE_FRAGMENTS, RETRY_MAX_DELAY,
};
use crate::error_handling::DatabaseError;

use super::backoff::{retry_with_backoff, RetryError, RetryObserver, RetryPolicy, RetryPredicate};

/// Errors that expose a symbolic code (`SQLITE_BUSY`, `ECONNRESET`, ...).
pub trait ErrorCode: fmt::Display {
    /// The symbolic code, if the error has one.
    fn error_code(&self) -> Option<Cow<'_, str>>;
}

/// Symbolic name of a SQLite primary result code.
fn sqlite_code_name(code: i32) -> Option<&'static str> {
    // Extended codes carry the primary code in the low byte
    match code & 0xff {
        1 => Some("SQLITE_ERROR"),
        5 => Some("SQLITE_BUSY"),
        6 => Some("SQLITE_LOCKED"),
        8 => Some("SQLITE_READONLY"),
        10 => Some("SQLITE_IOERR"),
        11 => Some("SQLITE_CORRUPT"),
        13 => Some("SQLITE_FULL"),
        14 => Some("SQLITE_CANTOPEN"),
        19 => Some("SQLITE_CONSTRAINT"),
        20 => Some("SQLITE_MISMATCH"),
        _ => None,
    }
}

impl ErrorCode for std::io::Error {
    fn error_code(&self) -> Option<Cow<'_, str>> {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::TimedOut => Some(Cow::Borrowed("ETIMEDOUT")),
            ErrorKind::ConnectionReset => Some(Cow::Borrowed("ECONNRESET")),
            ErrorKind::ConnectionRefused => Some(Cow::Borrowed("ECONNREFUSED")),
            _ => None,
        }
    }
}

impl ErrorCode for sqlx::Error {
    fn error_code(&self) -> Option<Cow<'_, str>> {
        match self {
            // sqlx reports the numeric (possibly extended) SQLite result code
            sqlx::Error::Database(db_err) => {
                let code = db_err.code()?;
                match code.parse::<i32>() {
                    Ok(numeric) => sqlite_code_name(numeric).map(Cow::Borrowed),
                    Err(_) => Some(Cow::Owned(code.into_owned())),
                }
            }
            sqlx::Error::Io(io_err) => io_err.error_code(),
            sqlx::Error::PoolTimedOut => Some(Cow::Borrowed("ETIMEDOUT")),
            _ => None,
        }
    }
}

impl ErrorCode for DatabaseError {
    fn error_code(&self) -> Option<Cow<'_, str>> {
        match self {
            DatabaseError::SqlError(e) => e.error_code(),
            DatabaseError::RetriesExhausted { source, .. } => source.error_code(),
            _ => None,
        }
    }
}

/// Determines if a database error is retryable.
///
/// Matches the code exactly against the transient set, then falls back to a
/// case-sensitive search of the message for `"timeout"` or `"connection"`.
pub fn is_retryable_db_error<E>(error: &E) -> bool
where
    E: ErrorCode + ?Sized,
{
    if let Some(code) = error.error_code() {
        if RETRYABLE_ERROR_CODES.contains(&code.as_ref()) {
            return true;
        }
    }

    let message = error.to_string();
    RETRYABLE_MESSAGE_FRAGMENTS
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Caller overrides for [`retry_database_operation`].
///
/// Unset fields keep the database defaults; set fields replace them wholesale.
/// A `base_delay` above the resulting `max_delay` is clamped to the cap.
pub struct RetryOverrides<E> {
    max_attempts: Option<NonZeroU32>,
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
    should_retry: Option<RetryPredicate<E>>,
    on_retry: Option<RetryObserver<E>>,
}

impl<E> Default for RetryOverrides<E> {
    fn default() -> Self {
        RetryOverrides {
            max_attempts: None,
            base_delay: None,
            max_delay: None,
            should_retry: None,
            on_retry: None,
        }
    }
}

impl<E> Clone for RetryOverrides<E> {
    fn clone(&self) -> Self {
        RetryOverrides {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            should_retry: self.should_retry.clone(),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<E> fmt::Debug for RetryOverrides<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOverrides")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("should_retry", &self.should_retry.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl<E> RetryOverrides<E> {
    pub fn max_attempts(mut self, max_attempts: NonZeroU32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = Some(base_delay);
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &E, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }
}

/// The database retry policy for `operation`, with `overrides` merged over it.
///
/// Defaults: 3 attempts, 500ms base delay, [`is_retryable_db_error`] as the
/// classifier, and a warning logged before each retry.
pub fn db_retry_policy<E>(operation: &str, overrides: RetryOverrides<E>) -> RetryPolicy<E>
where
    E: ErrorCode + 'static,
{
    let operation = operation.to_string();
    let default_observer: RetryObserver<E> = Arc::new(move |attempt: u32, error: &E, delay: Duration| {
        log::warn!(
            "Database operation '{}' failed (attempt {}): {}; retrying in {}ms",
            operation,
            attempt,
            error,
            delay.as_millis()
        );
    });
    let default_predicate: RetryPredicate<E> = Arc::new(|error: &E| is_retryable_db_error(error));

    RetryPolicy {
        max_attempts: overrides
            .max_attempts
            .map_or(DB_RETRY_MAX_ATTEMPTS, NonZeroU32::get),
        base_delay: overrides.base_delay.unwrap_or(DB_RETRY_BASE_DELAY),
        max_delay: overrides.max_delay.unwrap_or(RETRY_MAX_DELAY),
        should_retry: overrides.should_retry.unwrap_or(default_predicate),
        on_retry: Some(overrides.on_retry.unwrap_or(default_observer)),
    }
}

/// Retries a database operation on transient failures.
///
/// # Arguments
///
/// * `operation_name` - Identifies the operation in retry warnings
/// * `operation` - Produces a fresh future for each attempt
/// * `overrides` - Replaces individual fields of the database defaults
///
/// # Errors
///
/// Non-retryable errors come back as `RetryError::Aborted` after one attempt;
/// persistent transient errors as `RetryError::Exhausted`.
pub async fn retry_database_operation<T, E, F, Fut>(
    operation_name: &str,
    operation: F,
    overrides: RetryOverrides<E>,
) -> Result<T, RetryError<E>>
where
    E: ErrorCode + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let policy = db_retry_policy(operation_name, overrides);
    retry_with_backoff(operation, &policy).await
}
