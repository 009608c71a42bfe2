//! Setup binary entry point.
//!
//! This is a thin wrapper around the `demographics_data` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All import logic is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::process;

use demographics_data::initialization::init_logger_with;
use demographics_data::{run_setup, Config, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    let config: Config = Opt::parse().into();

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    match run_setup(config).await {
        Ok(report) => {
            for table in &report.tables {
                println!(
                    "  {:<28} {:>9} rows ({} read, {} skipped)",
                    table.table, table.row_count, table.import.rows_read, table.import.rows_skipped
                );
            }
            println!(
                "{} Imported {} table{} ({} rows) in {:.1}s",
                "✅".green(),
                report.tables.len(),
                if report.tables.len() == 1 { "" } else { "s" },
                report.total_rows_inserted(),
                report.elapsed_seconds
            );
            println!("Database ready at {}", report.db_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("demographics_setup error: {:#}", e);
            process::exit(1);
        }
    }
}
