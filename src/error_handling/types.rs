//! Error type definitions.
//!
//! This module defines the error types used throughout the crate, one enum per
//! concern (configuration, database access, CSV import, initialization).

use std::path::PathBuf;

use log::SetLoggerError;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Invalid configuration, detected when a policy, spec or manifest is built.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A retry policy failed validation.
    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    /// An importer spec failed validation.
    #[error("Invalid importer spec for table '{table}': {reason}")]
    InvalidImporterSpec {
        /// Destination table of the offending spec
        table: String,
        /// What was wrong with it
        reason: String,
    },

    /// The import manifest could not be read.
    #[error("Failed to read manifest {}: {source}", path.display())]
    ManifestIo {
        /// Manifest location
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The import manifest is not valid JSON or has unknown/missing fields.
    #[error("Failed to parse manifest {}: {source}", path.display())]
    ManifestParse {
        /// Manifest location
        path: PathBuf,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// The manifest parsed but its content is inconsistent.
    #[error("Invalid manifest {}: {reason}", path.display())]
    InvalidManifest {
        /// Manifest location
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// An importer name requested on the command line is not in the manifest.
    #[error("Unknown importer '{0}'")]
    UnknownImporter(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error (non-retryable, returned on first failure).
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// The database circuit breaker rejected the call without running it.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// A retryable error persisted through every attempt.
    #[error("Database operation '{operation}' failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Name of the operation, for diagnostics
        operation: String,
        /// Total attempts made
        attempts: u32,
        /// The error of the final attempt
        source: sqlx::Error,
    },

    /// A caller passed something that is not a plain SQL identifier.
    #[error("Invalid table name '{0}'")]
    InvalidIdentifier(String),
}

/// Error types for CSV imports.
///
/// Skipped rows are not errors; everything here aborts the import.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The source file does not exist and the spec does not allow that.
    #[error("CSV file not found: {}", .0.display())]
    MissingCsv(PathBuf),

    /// The source file exists but could not be opened or read.
    #[error("Failed to read CSV {}: {source}", path.display())]
    Io {
        /// CSV location
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The CSV parser rejected the file.
    #[error("Malformed CSV {}: {source}", path.display())]
    Csv {
        /// CSV location
        path: PathBuf,
        /// Underlying parser error
        source: csv_async::Error,
    },

    /// A row processor produced a tuple that does not match the column list.
    #[error("Row at line {line} of '{table}' has {actual} values, expected {expected}")]
    RowShape {
        /// Destination table
        table: String,
        /// CSV line number of the offending row
        line: u64,
        /// Number of declared columns
        expected: usize,
        /// Number of values produced
        actual: usize,
    },

    /// Table DDL failed.
    #[error("Failed to create table '{table}': {source}")]
    CreateTable {
        /// Destination table
        table: String,
        /// Underlying SQL error
        source: sqlx::Error,
    },

    /// An index statement failed.
    #[error("Failed to create index on '{table}' ({statement}): {source}")]
    CreateIndex {
        /// Destination table
        table: String,
        /// The failing statement
        statement: String,
        /// Underlying SQL error
        source: sqlx::Error,
    },

    /// A multi-row insert failed; the whole transaction was rolled back.
    #[error("Failed to insert batch {batch} into '{table}': {source}")]
    Insert {
        /// Destination table
        table: String,
        /// 1-based chunk number within the transaction
        batch: usize,
        /// Underlying SQL error
        source: sqlx::Error,
    },

    /// BEGIN or COMMIT failed.
    #[error("Transaction error on '{table}': {source}")]
    Transaction {
        /// Destination table
        table: String,
        /// Underlying SQL error
        source: sqlx::Error,
    },

    /// The importer was built from an invalid spec.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
