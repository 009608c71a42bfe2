// Shared test helpers for database setup and CSV fixtures.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use demographics_data::storage::init_db_pool_with_path;

/// Creates a file-backed test database inside `dir`.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool_in(dir: &Path) -> SqlitePool {
    init_db_pool_with_path(&dir.join("test.db"), Duration::from_secs(5))
        .await
        .expect("Failed to create test database pool")
}

/// Creates a temp dir and a database in it; keep the `TempDir` alive.
#[allow(dead_code)]
pub async fn create_test_pool() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let pool = create_test_pool_in(dir.path()).await;
    (pool, dir)
}

/// Writes a CSV fixture and returns its path.
#[allow(dead_code)]
pub fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    std::fs::write(&path, content).expect("Failed to write CSV fixture");
    path
}

/// Counts rows in `table`.
#[allow(dead_code)]
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Whether `table` exists.
#[allow(dead_code)]
pub async fn table_exists(pool: &SqlitePool, table: &str) -> bool {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
            .bind(table)
            .fetch_one(pool)
            .await
            .expect("Failed to query sqlite_master");
    count == 1
}

/// Reads one text column of `table` in insertion order.
#[allow(dead_code)]
pub async fn text_column(pool: &SqlitePool, table: &str, column: &str) -> Vec<Option<String>> {
    sqlx::query(&format!("SELECT {} FROM {} ORDER BY rowid", column, table))
        .fetch_all(pool)
        .await
        .expect("Failed to select column")
        .iter()
        .map(|row| row.get::<Option<String>, _>(0))
        .collect()
}
