//! Row sources for the importer.
//!
//! A [`RowReader`] streams rows into a [`RowSink`] instead of returning a
//! collection, so the importer decides what to keep while the file is read.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use csv_async::{AsyncReaderBuilder, StringRecord};

use super::row::{CsvHeaders, CsvRow};
use crate::error_handling::ImportError;

/// Receives rows as they are read.
pub trait RowSink: Send {
    fn accept(&mut self, row: CsvRow) -> Result<(), ImportError>;
}

impl RowSink for Vec<CsvRow> {
    fn accept(&mut self, row: CsvRow) -> Result<(), ImportError> {
        self.push(row);
        Ok(())
    }
}

/// Produces the raw rows of an import source.
///
/// # Errors
///
/// Implementations return `ImportError::MissingCsv` when the source does not
/// exist; the importer turns that into an empty import when missing sources are
/// allowed. Any error returned by the sink must be propagated unchanged.
#[async_trait]
pub trait RowReader: Send + Sync {
    async fn read_rows(&self, path: &Path, sink: &mut dyn RowSink) -> Result<(), ImportError>;
}

/// Reads a UTF-8, comma-delimited file with a header row.
///
/// Rows may be shorter or longer than the header; missing trailing fields read
/// as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRowReader;

#[async_trait]
impl RowReader for CsvRowReader {
    async fn read_rows(&self, path: &Path, sink: &mut dyn RowSink) -> Result<(), ImportError> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ImportError::MissingCsv(path.to_path_buf())
            } else {
                ImportError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let csv_error = |source: csv_async::Error| ImportError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .create_reader(file);

        let headers = Arc::new(CsvHeaders::new(reader.headers().await.map_err(csv_error)?));

        let mut record = StringRecord::new();
        let mut line = 1u64;
        while reader.read_record(&mut record).await.map_err(csv_error)? {
            line = record.position().map_or(line + 1, |p| p.line());
            sink.accept(CsvRow::new(Arc::clone(&headers), record.clone(), line))?;
        }

        Ok(())
    }
}
