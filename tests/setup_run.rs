//! Tests for the manifest-driven setup run and the setup binary.

mod helpers;

use std::path::{Path, PathBuf};
use std::process::Command;

use demographics_data::{run_setup, Config, LogFormat, LogLevel};
use tempfile::TempDir;

use helpers::{count_rows, table_exists, write_csv};

const MANIFEST: &str = r#"{
  "imports": [
    {
      "name": "communes",
      "csv_path": "insee/communes.csv",
      "table_name": "communes",
      "columns": [
        {"name": "cog", "type": "TEXT", "required": true, "source": "COM"},
        {"name": "population", "type": "INTEGER"}
      ],
      "required_fields": ["COM"],
      "indexes": ["CREATE INDEX IF NOT EXISTS idx_communes_cog ON communes(cog)"]
    },
    {
      "name": "qpv",
      "csv_path": "qpv.csv",
      "table_name": "qpv",
      "columns": [
        {"name": "code_qp", "type": "TEXT"},
        {"name": "cog", "type": "TEXT", "source": "insee_com"}
      ],
      "insert_mode": "insert_or_ignore",
      "create_table_sql": "CREATE TABLE IF NOT EXISTS qpv (code_qp TEXT PRIMARY KEY, cog TEXT)"
    },
    {
      "name": "mosques",
      "csv_path": "mosques.csv",
      "table_name": "mosques",
      "columns": [{"name": "name", "type": "TEXT"}],
      "allow_missing_csv": true
    }
  ]
}"#;

/// Lays out a manifest and its data files under `dir`.
fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
    let data_dir = dir.join("data");
    write_csv(
        &data_dir,
        "insee/communes.csv",
        "COM,population\n01001,779\n,12\n01002,256\n",
    );
    write_csv(
        &data_dir,
        "qpv.csv",
        "code_qp,insee_com\nQN01001M,01053\nQN01001M,01053\nQN06901M,69123\n",
    );
    let manifest = dir.join("imports.json");
    std::fs::write(&manifest, MANIFEST).expect("write manifest");
    (manifest, data_dir)
}

fn config_for(dir: &Path, manifest: PathBuf, data_dir: PathBuf) -> Config {
    Config {
        manifest,
        data_dir,
        db_path: dir.join("dashboard.db"),
        log_level: LogLevel::Warn,
        log_format: LogFormat::Plain,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_run_setup_imports_every_table() {
    let dir = TempDir::new().expect("temp dir");
    let (manifest, data_dir) = write_fixtures(dir.path());

    let report = run_setup(config_for(dir.path(), manifest, data_dir))
        .await
        .expect("setup succeeds");

    let summary: Vec<(&str, i64)> = report
        .tables
        .iter()
        .map(|t| (t.name.as_str(), t.row_count))
        .collect();
    assert_eq!(summary, [("communes", 2), ("qpv", 2), ("mosques", 0)]);
    assert_eq!(report.tables[0].import.rows_skipped, 1);
    assert_eq!(report.tables[1].import.rows_accepted, 3);
    assert_eq!(report.total_rows_inserted(), 4);
    assert!(report.db_path.exists());
}

#[tokio::test]
async fn test_only_restricts_importers() {
    let dir = TempDir::new().expect("temp dir");
    let (manifest, data_dir) = write_fixtures(dir.path());
    let config = Config {
        only: vec!["qpv".to_string()],
        ..config_for(dir.path(), manifest, data_dir)
    };

    let report = run_setup(config).await.expect("setup succeeds");
    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables[0].table, "qpv");
}

#[tokio::test]
async fn test_unknown_importer_is_an_error() {
    let dir = TempDir::new().expect("temp dir");
    let (manifest, data_dir) = write_fixtures(dir.path());
    let config = Config {
        only: vec!["iris".to_string()],
        ..config_for(dir.path(), manifest, data_dir)
    };

    let err = run_setup(config).await.expect_err("unknown importer");
    assert!(format!("{:#}", err).contains("Unknown importer 'iris'"));
}

#[tokio::test]
async fn test_first_failure_stops_the_run() {
    let dir = TempDir::new().expect("temp dir");
    let (manifest, data_dir) = write_fixtures(dir.path());
    // Communes source disappears: the import fails and later importers never run
    std::fs::remove_file(data_dir.join("insee/communes.csv")).expect("remove fixture");
    let config = config_for(dir.path(), manifest, data_dir);
    let db_path = config.db_path.clone();

    let err = run_setup(config).await.expect_err("missing CSV fails");
    let message = format!("{:#}", err);
    assert!(message.contains("Import 'communes' failed"), "{message}");
    assert!(message.contains("CSV file not found"), "{message}");

    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("open database");
    assert!(table_exists(&pool, "communes").await);
    assert!(!table_exists(&pool, "qpv").await);
}

#[tokio::test]
async fn test_fresh_rebuilds_the_database() {
    let dir = TempDir::new().expect("temp dir");
    let (manifest, data_dir) = write_fixtures(dir.path());
    let config = config_for(dir.path(), manifest, data_dir);

    run_setup(config.clone()).await.expect("first run");
    // Without --fresh the plain INSERT importer appends a second copy
    run_setup(config.clone()).await.expect("second run");
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}", config.db_path.display()))
        .await
        .expect("open database");
    assert_eq!(count_rows(&pool, "communes").await, 4);
    pool.close().await;

    let report = run_setup(Config {
        fresh: true,
        ..config
    })
    .await
    .expect("fresh run");
    assert_eq!(report.tables[0].row_count, 2);
}

#[tokio::test]
async fn test_invalid_manifest_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let manifest = dir.path().join("imports.json");
    std::fs::write(
        &manifest,
        r#"{"imports": [{"name": "a", "csv_path": "a.csv", "table_name": "a", "columns": [], "encoding": "latin1"}]}"#,
    )
    .expect("write manifest");

    let err = run_setup(config_for(dir.path(), manifest, dir.path().to_path_buf()))
        .await
        .expect_err("invalid manifest");
    assert!(format!("{:#}", err).contains("Failed to parse manifest"));
}

#[test]
fn test_binary_exits_with_status_one_on_failure() {
    let dir = TempDir::new().expect("temp dir");
    let output = Command::new(env!("CARGO_BIN_EXE_demographics_setup"))
        .arg("--manifest")
        .arg(dir.path().join("missing.json"))
        .arg("--db-path")
        .arg(dir.path().join("dashboard.db"))
        .output()
        .expect("run binary");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("demographics_setup error"), "{stderr}");
}

#[test]
fn test_binary_imports_manifest() {
    let dir = TempDir::new().expect("temp dir");
    let (manifest, data_dir) = write_fixtures(dir.path());
    let output = Command::new(env!("CARGO_BIN_EXE_demographics_setup"))
        .arg("--manifest")
        .arg(&manifest)
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--db-path")
        .arg(dir.path().join("dashboard.db"))
        .args(["--log-level", "error", "--only", "communes"])
        .output()
        .expect("run binary");

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Imported 1 table (2 rows)"), "{stdout}");
}
