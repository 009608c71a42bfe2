//! demographics_data library: resilient SQLite access and CSV batch import
//!
//! This library populates the dashboard's SQLite database from CSV sources
//! (INSEE population data, QPV priority neighbourhoods, crime statistics and the
//! like) and provides the retry and circuit-breaker primitives the dashboard uses
//! around its database calls.
//!
//! # Example
//!
//! ```no_run
//! use demographics_data::{run_setup, Config};
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     manifest: PathBuf::from("setup/imports.json"),
//!     db_path: PathBuf::from("dashboard.db"),
//!     ..Default::default()
//! };
//!
//! let report = run_setup(config).await?;
//! for table in &report.tables {
//!     println!("{}: {} rows", table.table, table.row_count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod config;
pub mod error_handling;
pub mod import;
pub mod initialization;
pub mod resilience;
mod run;
pub mod storage;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, Opt};
pub use error_handling::{ConfigError, DatabaseError, ImportError, InitializationError};
pub use run::{run_setup, SetupReport, TableReport};
