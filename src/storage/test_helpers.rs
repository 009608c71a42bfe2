//! Shared test helpers for module tests.

use std::time::Duration;

use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::storage::init_db_pool_with_path;

/// Creates a file-backed test database in a fresh temporary directory.
///
/// The `TempDir` must be kept alive for as long as the pool is used.
pub async fn create_test_pool() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let pool = init_db_pool_with_path(&dir.path().join("test.db"), Duration::from_secs(5))
        .await
        .expect("Failed to create test database pool");
    (pool, dir)
}
