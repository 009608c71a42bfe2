//! Importer configuration: destination table, column list and load options.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use strum_macros::Display;

use crate::config::{IMPORT_BATCH_SIZE, SQLITE_MAX_BIND_PARAMS};
use crate::error_handling::ConfigError;

/// Compiles a hard-coded pattern, panicking if it is malformed.
pub(crate) fn compile_regex_unsafe(pattern: &str, context: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        panic!(
            "Failed to compile regex pattern '{}' in {}: {}. This is a programming error.",
            pattern, context, e
        )
    })
}

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_regex_unsafe(r"^[A-Za-z_][A-Za-z0-9_]*$", "IDENTIFIER_RE"));

/// Whether `name` can be used as a table or column name without quoting tricks.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Conflict policy for inserted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    /// Constraint violations fail the batch
    #[default]
    #[strum(serialize = "INSERT")]
    Insert,
    /// Rows violating a constraint are dropped silently
    #[strum(serialize = "INSERT OR IGNORE")]
    InsertOrIgnore,
}

/// How raw CSV text is coerced for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

/// One destination column.
///
/// `required` only adds `NOT NULL` to the DDL; row filtering is driven by
/// [`ImporterSpec::required_fields`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default)]
    pub required: bool,
    /// Raw SQL literal for the `DEFAULT` clause
    #[serde(default)]
    pub default: Option<String>,
    /// CSV header to read the value from (defaults to `name`)
    #[serde(default)]
    pub source: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        ColumnSpec {
            name: name.into(),
            sql_type: sql_type.into(),
            required: false,
            default: None,
            source: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// CSV header this column reads from.
    pub fn source_field(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    /// Numeric when the declared type mentions INTEGER or REAL.
    pub fn kind(&self) -> ColumnKind {
        let upper = self.sql_type.to_ascii_uppercase();
        if upper.contains("INTEGER") {
            ColumnKind::Integer
        } else if upper.contains("REAL") {
            ColumnKind::Real
        } else {
            ColumnKind::Text
        }
    }

    /// Column definition as it appears in `CREATE TABLE`.
    pub fn ddl(&self) -> String {
        let mut ddl = format!("{} {}", self.name, self.sql_type);
        if self.required {
            ddl.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            ddl.push_str(" DEFAULT ");
            ddl.push_str(default);
        }
        ddl
    }
}

/// Everything needed to load one CSV file into one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterSpec {
    pub csv_path: PathBuf,
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
    /// CSV headers that must be present and non-blank for a row to be kept
    pub required_fields: Vec<String>,
    pub batch_size: usize,
    /// Statements run after the table is created
    pub indexes: Vec<String>,
    pub insert_mode: InsertMode,
    pub allow_missing_csv: bool,
}

impl ImporterSpec {
    pub fn new(
        csv_path: impl Into<PathBuf>,
        table_name: impl Into<String>,
        columns: Vec<ColumnSpec>,
    ) -> Self {
        ImporterSpec {
            csv_path: csv_path.into(),
            table_name: table_name.into(),
            columns,
            required_fields: Vec::new(),
            batch_size: IMPORT_BATCH_SIZE,
            indexes: Vec::new(),
            insert_mode: InsertMode::default(),
            allow_missing_csv: false,
        }
    }

    pub fn required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn indexes<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes = statements.into_iter().map(Into::into).collect();
        self
    }

    pub fn insert_mode(mut self, insert_mode: InsertMode) -> Self {
        self.insert_mode = insert_mode;
        self
    }

    pub fn allow_missing_csv(mut self, allow: bool) -> Self {
        self.allow_missing_csv = allow;
        self
    }

    /// Checks the spec before any I/O happens.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidImporterSpec` for an invalid table or column name, an
    /// empty or duplicated column list, a blank column type, or a zero batch size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidImporterSpec {
            table: self.table_name.clone(),
            reason,
        };

        if !is_valid_identifier(&self.table_name) {
            return Err(invalid("table name is not a valid identifier".to_string()));
        }
        if self.columns.is_empty() {
            return Err(invalid("no columns declared".to_string()));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !is_valid_identifier(&column.name) {
                return Err(invalid(format!(
                    "column '{}' is not a valid identifier",
                    column.name
                )));
            }
            if column.sql_type.trim().is_empty() {
                return Err(invalid(format!("column '{}' has no type", column.name)));
            }
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(invalid(format!("column '{}' declared twice", column.name)));
            }
        }

        Ok(())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for the declared columns.
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnSpec::ddl).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table_name,
            columns.join(", ")
        )
    }

    /// Statement prefix up to (not including) the `VALUES` list.
    pub fn insert_prefix(&self) -> String {
        format!(
            "{} INTO {} ({}) ",
            self.insert_mode,
            self.table_name,
            self.column_names().join(", ")
        )
    }

    /// Rows per INSERT statement: `batch_size`, lowered if the statement would
    /// exceed SQLite's bound-parameter limit.
    pub fn insert_chunk_size(&self) -> usize {
        let max_rows = (SQLITE_MAX_BIND_PARAMS / self.columns.len().max(1)).max(1);
        self.batch_size.min(max_rows)
    }
}
