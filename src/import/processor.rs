//! Row gating and transformation strategies.

use super::row::CsvRow;
use super::spec::{ColumnKind, ColumnSpec, ImporterSpec};
use super::value::{RowValues, SqlValue};

/// Decides whether a raw row is eligible for processing.
pub trait RowValidator: Send + Sync {
    fn validate(&self, row: &CsvRow) -> bool;
}

impl<F> RowValidator for F
where
    F: Fn(&CsvRow) -> bool + Send + Sync,
{
    fn validate(&self, row: &CsvRow) -> bool {
        self(row)
    }
}

/// Accepts a row only when every required field is present and non-blank.
#[derive(Debug, Clone, Default)]
pub struct RequiredFieldsValidator {
    table: String,
    fields: Vec<String>,
}

impl RequiredFieldsValidator {
    pub fn new(table: impl Into<String>, fields: Vec<String>) -> Self {
        RequiredFieldsValidator {
            table: table.into(),
            fields,
        }
    }

    pub fn for_spec(spec: &ImporterSpec) -> Self {
        Self::new(spec.table_name.clone(), spec.required_fields.clone())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl RowValidator for RequiredFieldsValidator {
    fn validate(&self, row: &CsvRow) -> bool {
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| !row.has_value(field))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return true;
        }
        log::debug!(
            "Skipping line {} of '{}': missing required field(s) {}",
            row.line(),
            self.table,
            missing.join(", ")
        );
        false
    }
}

/// Turns a validated row into values ordered like the importer's columns.
///
/// `None` excludes the row. Processors take `&mut self` so they can keep state
/// across rows (running totals, lookup tables); the importer hands the processor
/// back through `BaseImporter::into_processor`.
pub trait RowProcessor: Send {
    fn process(&mut self, row: &CsvRow) -> Option<RowValues>;
}

impl<F> RowProcessor for F
where
    F: FnMut(&CsvRow) -> Option<RowValues> + Send,
{
    fn process(&mut self, row: &CsvRow) -> Option<RowValues> {
        self(row)
    }
}

/// Reads each column from its source header and coerces it by column type.
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    columns: Vec<(String, ColumnKind)>,
}

impl ColumnMapper {
    pub fn new(columns: &[ColumnSpec]) -> Self {
        ColumnMapper {
            columns: columns
                .iter()
                .map(|c| (c.source_field().to_string(), c.kind()))
                .collect(),
        }
    }

    pub fn for_spec(spec: &ImporterSpec) -> Self {
        Self::new(&spec.columns)
    }
}

impl RowProcessor for ColumnMapper {
    fn process(&mut self, row: &CsvRow) -> Option<RowValues> {
        Some(
            self.columns
                .iter()
                .map(|(source, kind)| SqlValue::coerce(*kind, row.get(source)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields_validator() {
        let validator = RequiredFieldsValidator::new("t", vec!["code".into(), "nom".into()]);
        assert!(validator.validate(&CsvRow::from_pairs([("code", "1"), ("nom", "A")], 2)));
        assert!(!validator.validate(&CsvRow::from_pairs([("code", "1"), ("nom", " ")], 3)));
        assert!(!validator.validate(&CsvRow::from_pairs([("code", "1")], 4)));
    }

    #[test]
    fn test_no_required_fields_accepts_everything() {
        let validator = RequiredFieldsValidator::default();
        assert!(validator.validate(&CsvRow::from_pairs([("a", "")], 2)));
    }

    #[test]
    fn test_closure_validator() {
        let only_2023 = |row: &CsvRow| row.get("annee") == Some("2023");
        assert!(only_2023.validate(&CsvRow::from_pairs([("annee", "2023")], 2)));
        assert!(!only_2023.validate(&CsvRow::from_pairs([("annee", "2022")], 2)));
    }

    #[test]
    fn test_column_mapper_coerces_by_type() {
        let columns = vec![
            ColumnSpec::new("code", "TEXT"),
            ColumnSpec::new("population", "INTEGER").from_source("pop"),
            ColumnSpec::new("densite", "REAL"),
        ];
        let mut mapper = ColumnMapper::new(&columns);
        let row = CsvRow::from_pairs(
            [("code", " 01053 "), ("pop", "41365"), ("densite", "abc")],
            2,
        );
        assert_eq!(
            mapper.process(&row),
            Some(vec![
                SqlValue::Text("01053".into()),
                SqlValue::Integer(41365),
                SqlValue::Null,
            ])
        );
    }

    #[test]
    fn test_stateful_closure_processor() {
        let mut seen = 0u32;
        {
            let mut processor = |row: &CsvRow| {
                seen += 1;
                row.get("x").map(|x| vec![SqlValue::from(x)])
            };
            assert!(processor.process(&CsvRow::from_pairs([("x", "1")], 2)).is_some());
            assert!(processor.process(&CsvRow::from_pairs([("y", "1")], 3)).is_none());
        }
        assert_eq!(seen, 2);
    }
}
