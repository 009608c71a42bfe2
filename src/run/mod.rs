//! Setup run: opens the database and runs every manifest import in order.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::Config;
use crate::import::{ImportManifest, ImportReport};
use crate::storage::{init_db_pool_with_path, Database};

/// Outcome of one importer.
#[derive(Debug, Clone)]
pub struct TableReport {
    /// Importer name from the manifest
    pub name: String,
    /// Destination table
    pub table: String,
    /// Counts reported by the importer
    pub import: ImportReport,
    /// Rows in the table after the import
    pub row_count: i64,
}

/// Results of a setup run.
#[derive(Debug, Clone)]
pub struct SetupReport {
    /// One entry per importer, in run order
    pub tables: Vec<TableReport>,
    /// Path to the populated SQLite database
    pub db_path: PathBuf,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
}

impl SetupReport {
    pub fn total_rows_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.import.rows_inserted).sum()
    }
}

/// Removes the database file and its WAL side files, if present.
async fn remove_database_files(db_path: &Path) -> Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut path = db_path.as_os_str().to_owned();
        path.push(suffix);
        let path = PathBuf::from(path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", path.display()))
            }
        }
    }
    Ok(())
}

/// Runs the imports selected by `config`.
///
/// Importers run strictly one after another; the first failure stops the run.
/// After each import the destination table's row count is read back through
/// the resilient [`Database`] wrapper.
///
/// # Errors
///
/// Returns an error if the manifest is invalid, `config.only` names an unknown
/// importer, the database cannot be opened, or any import fails.
///
/// # Example
///
/// ```no_run
/// use demographics_data::{run_setup, Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let report = run_setup(Config::default()).await?;
/// println!("{} rows imported", report.total_rows_inserted());
/// # Ok(())
/// # }
/// ```
pub async fn run_setup(config: Config) -> Result<SetupReport> {
    let start = Instant::now();

    let manifest = ImportManifest::load(&config.manifest)
        .await
        .context("Failed to load import manifest")?;
    let selected = manifest.select(&config.only)?;
    info!(
        "Running {} of {} importer(s) from {}",
        selected.len(),
        manifest.imports.len(),
        config.manifest.display()
    );

    if config.fresh {
        remove_database_files(&config.db_path).await?;
    }

    let pool = init_db_pool_with_path(
        &config.db_path,
        Duration::from_millis(config.busy_timeout_ms),
    )
    .await
    .context("Failed to initialize database pool")?;
    let db = Database::new(pool.clone());

    let mut tables = Vec::with_capacity(selected.len());
    for definition in selected {
        let mut importer = definition.importer(&config.data_dir, pool.clone())?;
        let import = importer
            .import()
            .await
            .with_context(|| format!("Import '{}' failed", definition.name))?;

        let row_count = db
            .count_rows(&definition.table_name)
            .await
            .with_context(|| format!("Failed to count rows of '{}'", definition.table_name))?;
        if (row_count as u64) < import.rows_inserted {
            warn!(
                "Table '{}' holds {} row(s) but {} were inserted",
                definition.table_name, row_count, import.rows_inserted
            );
        }

        tables.push(TableReport {
            name: definition.name.clone(),
            table: definition.table_name.clone(),
            import,
            row_count,
        });
    }

    if let Err(e) = db.checkpoint().await {
        warn!("Failed to checkpoint WAL file (this is non-critical): {}", e);
    }
    pool.close().await;

    Ok(SetupReport {
        tables,
        db_path: config.db_path,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    })
}
