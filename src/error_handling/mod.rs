//! Error handling.
//!
//! Errors are categorized by concern:
//! - **Configuration**: invalid retry policies, importer specs or manifests
//! - **Database**: SQL failures, circuit-open rejections, exhausted retries
//! - **Import**: missing or malformed CSV, DDL failures, rolled-back inserts
//! - **Initialization**: logger setup

mod types;

pub use types::{ConfigError, DatabaseError, ImportError, InitializationError};
