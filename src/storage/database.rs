//! Resilient database access.
//!
//! [`Database`] runs every operation through one shared circuit breaker and the
//! database retry policy: transient SQLite errors (`SQLITE_BUSY`, lock and
//! timeout errors) are retried with backoff, persistent failures trip the
//! breaker so later calls fail fast.

use std::future::Future;
use std::sync::Arc;

use sqlx::SqlitePool;

use crate::error_handling::DatabaseError;
use crate::import::is_valid_identifier;
use crate::resilience::{
    retry_database_operation, CircuitBreaker, CircuitBreakerError, RetryError, RetryOverrides,
};

/// An sqlx pool guarded by a circuit breaker and retry policy.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    breaker: Arc<CircuitBreaker>,
    retry: RetryOverrides<sqlx::Error>,
}

impl Database {
    /// Wraps `pool` with a default breaker named `sqlite`.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_breaker(pool, Arc::new(CircuitBreaker::new("sqlite")))
    }

    /// Wraps `pool` with a breaker shared with other callers.
    pub fn with_breaker(pool: SqlitePool, breaker: Arc<CircuitBreaker>) -> Self {
        Database {
            pool,
            breaker,
            retry: RetryOverrides::default(),
        }
    }

    pub fn with_retry_overrides(mut self, retry: RetryOverrides<sqlx::Error>) -> Self {
        self.retry = retry;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Runs `op` with retries inside the circuit breaker.
    ///
    /// `op` receives a handle to the pool and may be called several times. The
    /// breaker sees one outcome per `run`, after retries.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::CircuitOpen` if the breaker rejected the call
    /// - `DatabaseError::RetriesExhausted` if a transient error persisted
    /// - `DatabaseError::SqlError` for a non-retryable error
    pub async fn run<T, F, Fut>(&self, name: &str, op: F) -> Result<T, DatabaseError>
    where
        F: FnMut(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut op = op;
        let op = &mut op;
        let pool = &self.pool;
        let retry = self.retry.clone();

        let result = self
            .breaker
            .execute(move || retry_database_operation(name, move || op(pool.clone()), retry))
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::Open) => Err(DatabaseError::CircuitOpen),
            Err(CircuitBreakerError::Inner(RetryError::Aborted { error, .. })) => {
                Err(DatabaseError::SqlError(error))
            }
            Err(CircuitBreakerError::Inner(RetryError::Exhausted {
                attempts,
                last_error,
            })) => Err(DatabaseError::RetriesExhausted {
                operation: name.to_string(),
                attempts,
                source: last_error,
            }),
        }
    }

    /// Number of rows in `table`.
    pub async fn count_rows(&self, table: &str) -> Result<i64, DatabaseError> {
        if !is_valid_identifier(table) {
            return Err(DatabaseError::InvalidIdentifier(table.to_string()));
        }
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        self.run(&format!("count_rows({})", table), |pool| {
            let sql = sql.clone();
            async move { sqlx::query_scalar::<_, i64>(&sql).fetch_one(&pool).await }
        })
        .await
    }

    /// Folds the WAL back into the main database file and truncates it.
    pub async fn checkpoint(&self) -> Result<(), DatabaseError> {
        self.run("wal_checkpoint", |pool| async move {
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
                .execute(&pool)
                .await
                .map(|_| ())
        })
        .await
    }
}
