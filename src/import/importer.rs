//! The CSV → SQLite import pipeline.

use std::path::Path;
use std::time::Instant;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::processor::{ColumnMapper, RequiredFieldsValidator, RowProcessor, RowValidator};
use super::reader::{CsvRowReader, RowReader, RowSink};
use super::row::CsvRow;
use super::spec::ImporterSpec;
use super::table::{DefaultTableCreator, TableCreator};
use super::value::{RowValues, SqlValue};
use crate::error_handling::{ConfigError, ImportError};

/// Counts for one completed import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Data rows read from the source
    pub rows_read: usize,
    /// Rows rejected by the validator or the processor
    pub rows_skipped: usize,
    /// Rows sent to the database
    pub rows_accepted: usize,
    /// Rows the database reported as inserted (lower than `rows_accepted`
    /// when `INSERT OR IGNORE` drops conflicting rows)
    pub rows_inserted: u64,
    /// INSERT statements executed
    pub batches: usize,
}

/// Rows produced by [`BaseImporter::read_csv`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOutcome {
    pub rows: Vec<RowValues>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Applies the validator and processor to each row as it arrives.
struct ProcessingSink<'a, P> {
    table: &'a str,
    width: usize,
    validator: &'a dyn RowValidator,
    processor: &'a mut P,
    outcome: ReadOutcome,
}

impl<P: RowProcessor> RowSink for ProcessingSink<'_, P> {
    fn accept(&mut self, row: CsvRow) -> Result<(), ImportError> {
        self.outcome.rows_read += 1;
        if !self.validator.validate(&row) {
            self.outcome.rows_skipped += 1;
            return Ok(());
        }

        match self.processor.process(&row) {
            Some(values) if values.len() != self.width => Err(ImportError::RowShape {
                table: self.table.to_string(),
                line: row.line(),
                expected: self.width,
                actual: values.len(),
            }),
            Some(values) => {
                self.outcome.rows.push(values);
                Ok(())
            }
            None => {
                log::debug!(
                    "Processor excluded line {} of '{}'",
                    row.line(),
                    self.table
                );
                self.outcome.rows_skipped += 1;
                Ok(())
            }
        }
    }
}

/// Loads one CSV source into one table.
///
/// Every stage can be swapped out: the row source ([`RowReader`]), the DDL
/// ([`TableCreator`]), the row gate ([`RowValidator`]) and the row transform
/// ([`RowProcessor`]). The defaults read a CSV file, create the table from the
/// declared columns, require the spec's `required_fields`, and map columns from
/// their source headers.
///
/// # Example
///
/// ```no_run
/// # async fn demo(pool: sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
/// use demographics_data::import::{BaseImporter, ColumnSpec, ImporterSpec};
///
/// let spec = ImporterSpec::new(
///     "data/communes.csv",
///     "communes",
///     vec![
///         ColumnSpec::new("code", "TEXT").required(),
///         ColumnSpec::new("population", "INTEGER"),
///     ],
/// )
/// .required_fields(["code"]);
///
/// let report = BaseImporter::new(spec, pool)?.import().await?;
/// println!("{} rows inserted", report.rows_inserted);
/// # Ok(())
/// # }
/// ```
pub struct BaseImporter<P = ColumnMapper> {
    spec: ImporterSpec,
    pool: SqlitePool,
    processor: P,
    validator: Box<dyn RowValidator>,
    table_creator: Box<dyn TableCreator>,
    reader: Box<dyn RowReader>,
}

impl BaseImporter<ColumnMapper> {
    /// Creates an importer with the default strategies.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidImporterSpec` if the spec fails validation.
    pub fn new(spec: ImporterSpec, pool: SqlitePool) -> Result<Self, ConfigError> {
        spec.validate()?;
        Ok(BaseImporter {
            processor: ColumnMapper::for_spec(&spec),
            validator: Box::new(RequiredFieldsValidator::for_spec(&spec)),
            table_creator: Box::new(DefaultTableCreator),
            reader: Box::new(CsvRowReader),
            spec,
            pool,
        })
    }
}

impl<P: RowProcessor> BaseImporter<P> {
    /// Replaces the row processor. Its values must follow the column order.
    pub fn with_processor<Q: RowProcessor>(self, processor: Q) -> BaseImporter<Q> {
        BaseImporter {
            spec: self.spec,
            pool: self.pool,
            processor,
            validator: self.validator,
            table_creator: self.table_creator,
            reader: self.reader,
        }
    }

    pub fn with_validator(mut self, validator: impl RowValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn with_table_creator(mut self, table_creator: impl TableCreator + 'static) -> Self {
        self.table_creator = Box::new(table_creator);
        self
    }

    pub fn with_reader(mut self, reader: impl RowReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn spec(&self) -> &ImporterSpec {
        &self.spec
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Hands back the processor along with any state it accumulated.
    pub fn into_processor(self) -> P {
        self.processor
    }

    /// Creates the table, then runs every index statement.
    ///
    /// # Errors
    ///
    /// `ImportError::CreateTable` or `ImportError::CreateIndex` on the first
    /// failing statement.
    pub async fn create_table(&self) -> Result<(), ImportError> {
        let table = &self.spec.table_name;
        self.table_creator
            .create_table(&self.pool, &self.spec)
            .await
            .map_err(|source| ImportError::CreateTable {
                table: table.clone(),
                source,
            })?;

        for statement in &self.spec.indexes {
            sqlx::raw_sql(statement)
                .execute(&self.pool)
                .await
                .map_err(|source| ImportError::CreateIndex {
                    table: table.clone(),
                    statement: statement.clone(),
                    source,
                })?;
        }

        log::debug!(
            "Table '{}' ready ({} index statement(s))",
            table,
            self.spec.indexes.len()
        );
        Ok(())
    }

    /// Reads the source and returns the accepted rows in source order.
    ///
    /// A missing source is an empty outcome when `allow_missing_csv` is set.
    ///
    /// # Errors
    ///
    /// `ImportError::MissingCsv` for a missing source otherwise, read errors from
    /// the reader, and `ImportError::RowShape` when the processor returns the
    /// wrong number of values.
    pub async fn read_csv(&mut self) -> Result<ReadOutcome, ImportError> {
        let path: &Path = &self.spec.csv_path;
        let mut sink = ProcessingSink {
            table: &self.spec.table_name,
            width: self.spec.columns.len(),
            validator: self.validator.as_ref(),
            processor: &mut self.processor,
            outcome: ReadOutcome::default(),
        };

        match self.reader.read_rows(path, &mut sink).await {
            Ok(()) => {}
            Err(ImportError::MissingCsv(missing)) if self.spec.allow_missing_csv => {
                log::warn!(
                    "CSV file {} not found, importing no rows into '{}'",
                    missing.display(),
                    self.spec.table_name
                );
                return Ok(ReadOutcome::default());
            }
            Err(e) => return Err(e),
        }

        let outcome = sink.outcome;
        if outcome.rows_skipped > 0 {
            log::warn!(
                "Skipped {} of {} row(s) from {}",
                outcome.rows_skipped,
                outcome.rows_read,
                path.display()
            );
        }
        Ok(outcome)
    }

    /// Inserts `rows` in one transaction, one multi-row INSERT per chunk.
    ///
    /// Returns the number of rows the database reported as inserted. An empty
    /// slice does nothing.
    ///
    /// # Errors
    ///
    /// `ImportError::Insert` with the 1-based chunk number if a chunk fails; the
    /// transaction is rolled back so no row of this call is kept.
    /// `ImportError::Transaction` if the transaction cannot begin or commit.
    pub async fn insert_batch(&self, rows: &[RowValues]) -> Result<u64, ImportError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let table = &self.spec.table_name;
        let transaction_error = |source: sqlx::Error| ImportError::Transaction {
            table: table.clone(),
            source,
        };

        let chunk_size = self.spec.insert_chunk_size();
        let prefix = self.spec.insert_prefix();
        let mut inserted = 0u64;
        let mut tx = self.pool.begin().await.map_err(transaction_error)?;

        for (i, chunk) in rows.chunks(chunk_size).enumerate() {
            let batch = i + 1;
            let mut builder = QueryBuilder::<Sqlite>::new(prefix.as_str());
            builder.push_values(chunk, |mut b, row| {
                for value in row {
                    match value {
                        SqlValue::Null => b.push_bind(None::<String>),
                        SqlValue::Integer(n) => b.push_bind(*n),
                        SqlValue::Real(x) => b.push_bind(*x),
                        SqlValue::Text(s) => b.push_bind(s.clone()),
                    };
                }
            });

            match builder.build().execute(&mut *tx).await {
                Ok(result) => {
                    inserted += result.rows_affected();
                    log::debug!(
                        "Inserted batch {} ({} row(s)) into '{}'",
                        batch,
                        chunk.len(),
                        table
                    );
                }
                Err(source) => {
                    if let Err(e) = tx.rollback().await {
                        log::warn!("Rollback on '{}' failed: {}", table, e);
                    }
                    return Err(ImportError::Insert {
                        table: table.clone(),
                        batch,
                        source,
                    });
                }
            }
        }

        tx.commit().await.map_err(transaction_error)?;
        Ok(inserted)
    }

    /// Runs `create_table`, `read_csv` and `insert_batch` in order; the first
    /// failure aborts the import.
    pub async fn import(&mut self) -> Result<ImportReport, ImportError> {
        let start = Instant::now();
        log::info!(
            "Importing {} into '{}'",
            self.spec.csv_path.display(),
            self.spec.table_name
        );

        self.create_table().await?;
        let outcome = self.read_csv().await?;
        let rows_inserted = self.insert_batch(&outcome.rows).await?;

        let report = ImportReport {
            rows_read: outcome.rows_read,
            rows_skipped: outcome.rows_skipped,
            rows_accepted: outcome.rows.len(),
            rows_inserted,
            batches: outcome.rows.len().div_ceil(self.spec.insert_chunk_size()),
        };
        log::info!(
            "Imported {} row(s) into '{}' ({} read, {} skipped) in {:.2}s",
            report.rows_inserted,
            self.spec.table_name,
            report.rows_read,
            report.rows_skipped,
            start.elapsed().as_secs_f64()
        );
        Ok(report)
    }
}
