//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (retry, circuit breaker, SQLite, importer defaults)
//! - CLI option types and parsing

mod constants;
mod types;

pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, Opt};
