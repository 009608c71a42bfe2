//! CSV → SQLite import pipeline.
//!
//! An [`ImporterSpec`] declares one source file and one destination table;
//! [`BaseImporter`] creates the table, streams and filters rows, and inserts them
//! in chunks inside a single transaction. The [`manifest`] module loads importer
//! definitions from JSON for the setup binary.

mod importer;
pub mod manifest;
mod processor;
mod reader;
mod row;
mod spec;
mod table;
mod value;

pub use importer::{BaseImporter, ImportReport, ReadOutcome};
pub use manifest::{ImportDefinition, ImportManifest};
pub use processor::{ColumnMapper, RequiredFieldsValidator, RowProcessor, RowValidator};
pub use reader::{CsvRowReader, RowReader, RowSink};
pub use row::{CsvHeaders, CsvRow};
pub use spec::{is_valid_identifier, ColumnKind, ColumnSpec, ImporterSpec, InsertMode};
pub use table::{DefaultTableCreator, SqlTableCreator, TableCreator};
pub use value::{parse_number, RowValues, SqlValue};
