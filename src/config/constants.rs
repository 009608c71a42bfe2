//! Configuration constants.
//!
//! Defaults for the retry layer, the circuit breaker, the SQLite pool and the
//! CSV importer.

use std::time::Duration;

pub const DB_PATH: &str = "./demographics.db";
pub const MANIFEST_PATH: &str = "./setup/imports.json";
pub const DATA_DIR: &str = "./setup/data";

// Generic retry policy
/// Maximum number of attempts (including the initial attempt)
pub const RETRY_MAX_ATTEMPTS: u32 = 3;
/// Delay before the first retry; doubles with each following attempt
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Ceiling on the computed backoff delay (jitter is added on top)
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
/// Jitter is drawn uniformly from `[0, RETRY_JITTER_RATIO * delay]`
pub const RETRY_JITTER_RATIO: f64 = 0.1;

// Database retry policy
pub const DB_RETRY_MAX_ATTEMPTS: u32 = 3;
/// Delay before the first database retry
pub const DB_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Error codes treated as transient by the database retry classifier.
pub const RETRYABLE_ERROR_CODES: &[&str] = &[
    "SQLITE_BUSY",
    "SQLITE_LOCKED",
    "ETIMEDOUT",
    "ECONNRESET",
    "ECONNREFUSED",
];
/// Message fragments (case-sensitive) treated as transient.
pub const RETRYABLE_MESSAGE_FRAGMENTS: &[&str] = &["timeout", "connection"];

// Circuit breaker
pub const BREAKER_FAILURE_THRESHOLD: u32 = 5;
pub const BREAKER_RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);
/// Stored on the breaker for monitoring; transitions count consecutive failures only
pub const BREAKER_MONITORING_PERIOD: Duration = Duration::from_secs(10);

// SQLite
/// How long a write waits on a locked database before SQLite reports SQLITE_BUSY
pub const DB_BUSY_TIMEOUT_MS: u64 = 5000;
/// Upper bound on bound parameters per statement (SQLITE_MAX_VARIABLE_NUMBER)
pub const SQLITE_MAX_BIND_PARAMS: usize = 32766;

// Importer
/// Rows per multi-row INSERT statement
pub const IMPORT_BATCH_SIZE: usize = 1000;
