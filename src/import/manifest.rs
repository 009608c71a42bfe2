//! JSON manifest describing every import of a setup run.
//!
//! ```json
//! {
//!   "imports": [
//!     {
//!       "name": "communes",
//!       "csv_path": "insee/communes.csv",
//!       "table_name": "communes",
//!       "columns": [
//!         { "name": "cog", "type": "TEXT", "required": true, "source": "COM" },
//!         { "name": "population", "type": "INTEGER" }
//!       ],
//!       "required_fields": ["COM"],
//!       "indexes": ["CREATE INDEX IF NOT EXISTS idx_communes_cog ON communes(cog)"],
//!       "insert_mode": "insert_or_ignore"
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sqlx::SqlitePool;

use super::importer::BaseImporter;
use super::spec::{ColumnSpec, ImporterSpec, InsertMode};
use super::table::SqlTableCreator;
use crate::config::IMPORT_BATCH_SIZE;
use crate::error_handling::ConfigError;

fn default_batch_size() -> usize {
    IMPORT_BATCH_SIZE
}

/// One importer as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportDefinition {
    pub name: String,
    /// Relative paths are resolved against the data directory
    pub csv_path: PathBuf,
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub indexes: Vec<String>,
    #[serde(default)]
    pub insert_mode: InsertMode,
    #[serde(default)]
    pub allow_missing_csv: bool,
    /// Replaces the DDL generated from `columns`
    #[serde(default)]
    pub create_table_sql: Option<String>,
}

impl ImportDefinition {
    pub fn to_spec(&self, data_dir: &Path) -> ImporterSpec {
        ImporterSpec::new(data_dir.join(&self.csv_path), &self.table_name, self.columns.clone())
            .required_fields(self.required_fields.iter().cloned())
            .batch_size(self.batch_size)
            .indexes(self.indexes.iter().cloned())
            .insert_mode(self.insert_mode)
            .allow_missing_csv(self.allow_missing_csv)
    }

    /// Builds the importer, with custom DDL when `create_table_sql` is set.
    pub fn importer(&self, data_dir: &Path, pool: SqlitePool) -> Result<BaseImporter, ConfigError> {
        let importer = BaseImporter::new(self.to_spec(data_dir), pool)?;
        Ok(match &self.create_table_sql {
            Some(sql) => importer.with_table_creator(SqlTableCreator::new(sql.clone())),
            None => importer,
        })
    }
}

/// The ordered list of imports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportManifest {
    pub imports: Vec<ImportDefinition>,
}

impl ImportManifest {
    /// Reads and validates a manifest file.
    ///
    /// # Errors
    ///
    /// `ConfigError::ManifestIo` if the file cannot be read, otherwise see
    /// [`ImportManifest::from_json`].
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::ManifestIo {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json, path)
    }

    /// Parses and validates manifest JSON; `path` is only used in errors.
    ///
    /// # Errors
    ///
    /// `ConfigError::ManifestParse` for malformed JSON or unknown fields,
    /// `ConfigError::InvalidManifest` for duplicate importer names, and
    /// `ConfigError::InvalidImporterSpec` for an invalid importer.
    pub fn from_json(json: &str, path: &Path) -> Result<Self, ConfigError> {
        let manifest: ImportManifest =
            serde_json::from_str(json).map_err(|source| ConfigError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut names = HashSet::new();
        for definition in &manifest.imports {
            if !names.insert(definition.name.as_str()) {
                return Err(ConfigError::InvalidManifest {
                    path: path.to_path_buf(),
                    reason: format!("importer '{}' is declared twice", definition.name),
                });
            }
            definition.to_spec(Path::new("")).validate()?;
        }

        Ok(manifest)
    }

    /// Definitions to run, in manifest order. An empty `only` selects all.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownImporter` for a name not in the manifest.
    pub fn select(&self, only: &[String]) -> Result<Vec<&ImportDefinition>, ConfigError> {
        if let Some(unknown) = only
            .iter()
            .find(|name| !self.imports.iter().any(|d| &d.name == *name))
        {
            return Err(ConfigError::UnknownImporter(unknown.clone()));
        }

        Ok(self
            .imports
            .iter()
            .filter(|d| only.is_empty() || only.contains(&d.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
                "required_fields": ["COM"]
            },
            {
                "name": "qpv",
                "csv_path": "/abs/qpv.csv",
                "table_name": "qpv",
                "columns": [{"name": "code_qp", "type": "TEXT"}],
                "batch_size": 250,
                "insert_mode": "insert_or_ignore",
                "allow_missing_csv": true,
                "create_table_sql": "CREATE TABLE IF NOT EXISTS qpv (code_qp TEXT PRIMARY KEY)"
            }
        ]
    }"#;

    fn parse(json: &str) -> Result<ImportManifest, ConfigError> {
        ImportManifest::from_json(json, Path::new("imports.json"))
    }

    #[test]
    fn test_parse_manifest_with_defaults() {
        let manifest = parse(MANIFEST).expect("valid manifest");
        assert_eq!(manifest.imports.len(), 2);

        let communes = &manifest.imports[0];
        assert_eq!(communes.batch_size, 1000);
        assert_eq!(communes.insert_mode, InsertMode::Insert);
        assert!(!communes.allow_missing_csv);
        assert!(communes.create_table_sql.is_none());

        let qpv = &manifest.imports[1];
        assert_eq!(qpv.batch_size, 250);
        assert_eq!(qpv.insert_mode, InsertMode::InsertOrIgnore);
        assert!(qpv.allow_missing_csv);
    }

    #[test]
    fn test_to_spec_resolves_paths() {
        let manifest = parse(MANIFEST).expect("valid manifest");
        let data_dir = Path::new("/data");
        assert_eq!(
            manifest.imports[0].to_spec(data_dir).csv_path,
            PathBuf::from("/data/insee/communes.csv")
        );
        // Absolute paths are kept as-is
        assert_eq!(
            manifest.imports[1].to_spec(data_dir).csv_path,
            PathBuf::from("/abs/qpv.csv")
        );
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let json = r#"{"imports": [{"name": "a", "csv_path": "a.csv", "table_name": "a",
            "columns": [{"name": "x", "type": "TEXT"}], "delimiter": ";"}]}"#;
        assert!(matches!(parse(json), Err(ConfigError::ManifestParse { .. })));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let json = r#"{"imports": [
            {"name": "a", "csv_path": "a.csv", "table_name": "a", "columns": [{"name": "x", "type": "TEXT"}]},
            {"name": "a", "csv_path": "b.csv", "table_name": "b", "columns": [{"name": "x", "type": "TEXT"}]}
        ]}"#;
        assert!(matches!(parse(json), Err(ConfigError::InvalidManifest { .. })));
    }

    #[test]
    fn test_invalid_importer_is_rejected() {
        let json = r#"{"imports": [
            {"name": "a", "csv_path": "a.csv", "table_name": "a", "columns": [], "batch_size": 10}
        ]}"#;
        assert!(matches!(
            parse(json),
            Err(ConfigError::InvalidImporterSpec { .. })
        ));
    }

    #[test]
    fn test_select() {
        let manifest = parse(MANIFEST).expect("valid manifest");
        assert_eq!(manifest.select(&[]).expect("all").len(), 2);

        let selected = manifest.select(&["qpv".to_string()]).expect("known name");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "qpv");

        assert!(matches!(
            manifest.select(&["iris".to_string()]),
            Err(ConfigError::UnknownImporter(name)) if name == "iris"
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = ImportManifest::load(Path::new("/nonexistent/imports.json"))
            .await
            .expect_err("missing manifest");
        assert!(matches!(err, ConfigError::ManifestIo { .. }));
    }
}
