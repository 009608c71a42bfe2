//! Configuration types and CLI options.
//!
//! `Opt` is the clap-derived command line; `Config` is the library-facing
//! configuration it converts into.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{DATA_DIR, DB_BUSY_TIMEOUT_MS, DB_PATH, MANIFEST_PATH};

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: One JSON object per line for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration for a setup run.
///
/// # Examples
///
/// ```no_run
/// use demographics_data::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     db_path: PathBuf::from("./dashboard.db"),
///     only: vec!["qpv".to_string()],
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Import manifest (JSON)
    pub manifest: PathBuf,

    /// Directory CSV paths in the manifest are resolved against
    pub data_dir: PathBuf,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// SQLite busy timeout in milliseconds
    pub busy_timeout_ms: u64,

    /// Restrict the run to these importer names (empty = all)
    pub only: Vec<String>,

    /// Delete the database file before importing
    pub fresh: bool,

    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(MANIFEST_PATH),
            data_dir: PathBuf::from(DATA_DIR),
            db_path: PathBuf::from(DB_PATH),
            busy_timeout_ms: DB_BUSY_TIMEOUT_MS,
            only: Vec::new(),
            fresh: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

/// Command-line options for the setup binary.
///
/// ```bash
/// # Import everything listed in the manifest
/// demographics_setup --manifest setup/imports.json --data-dir setup/data
///
/// # Rebuild two tables into a fresh database
/// demographics_setup --fresh --only qpv --only mosques
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "demographics_setup",
    about = "Populates the dashboard SQLite database from CSV sources."
)]
pub struct Opt {
    /// Import manifest (JSON)
    #[arg(long, value_parser, default_value = MANIFEST_PATH)]
    pub manifest: PathBuf,

    /// Directory that CSV paths in the manifest are relative to
    #[arg(long, value_parser, default_value = DATA_DIR)]
    pub data_dir: PathBuf,

    /// Database path (SQLite file)
    #[arg(long, value_parser, env = "DASHBOARD_DB_PATH", default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// How long a write waits on a locked database before failing (milliseconds)
    #[arg(long, default_value_t = DB_BUSY_TIMEOUT_MS)]
    pub busy_timeout_ms: u64,

    /// Only run the named importer (repeatable)
    #[arg(long)]
    pub only: Vec<String>,

    /// Delete the database file before importing
    #[arg(long)]
    pub fresh: bool,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl From<Opt> for Config {
    fn from(opt: Opt) -> Self {
        Config {
            manifest: opt.manifest,
            data_dir: opt.data_dir,
            db_path: opt.db_path,
            busy_timeout_ms: opt.busy_timeout_ms,
            only: opt.only,
            fresh: opt.fresh,
            log_level: opt.log_level,
            log_format: opt.log_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.db_path, PathBuf::from("./demographics.db"));
        assert_eq!(config.busy_timeout_ms, 5000);
        assert!(config.only.is_empty());
        assert!(!config.fresh);
    }

    #[test]
    fn test_opt_parses_repeated_only() {
        let opt = Opt::try_parse_from([
            "demographics_setup",
            "--only",
            "qpv",
            "--only",
            "mosques",
            "--fresh",
            "--log-format",
            "json",
        ])
        .expect("valid arguments");
        let config = Config::from(opt);
        assert_eq!(config.only, vec!["qpv".to_string(), "mosques".to_string()]);
        assert!(config.fresh);
        assert!(matches!(config.log_format, LogFormat::Json));
    }

    #[test]
    fn test_opt_rejects_unknown_log_level() {
        let result = Opt::try_parse_from(["demographics_setup", "--log-level", "loud"]);
        assert!(result.is_err());
    }
}
