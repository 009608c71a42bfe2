//! Raw CSV rows addressed by header name.

use std::collections::HashMap;
use std::sync::Arc;

use csv_async::StringRecord;

const UTF8_BOM: char = '\u{feff}';

/// Header row of a CSV file with a name → position index.
///
/// When a header name appears more than once, the last occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct CsvHeaders {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl CsvHeaders {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let name = name.as_ref();
                let name = if i == 0 {
                    name.trim_start_matches(UTF8_BOM)
                } else {
                    name
                };
                name.trim().to_string()
            })
            .collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        CsvHeaders { names, index }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One data row of a CSV file.
#[derive(Debug, Clone)]
pub struct CsvRow {
    headers: Arc<CsvHeaders>,
    record: StringRecord,
    line: u64,
}

impl CsvRow {
    pub fn new(headers: Arc<CsvHeaders>, record: StringRecord, line: u64) -> Self {
        CsvRow {
            headers,
            record,
            line,
        }
    }

    /// Builds a row from `(header, value)` pairs; handy for custom readers.
    pub fn from_pairs<'a, I>(pairs: I, line: u64) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let (names, values): (Vec<&str>, Vec<&str>) = pairs.into_iter().unzip();
        CsvRow {
            headers: Arc::new(CsvHeaders::new(names)),
            record: StringRecord::from(values),
            line,
        }
    }

    /// Raw value of the named column, untrimmed. `None` if the header is
    /// unknown or the row is shorter than the header.
    pub fn get(&self, name: &str) -> Option<&str> {
        let position = self.headers.position(name)?;
        self.record.get(position)
    }

    /// Whether the named field is present and non-blank.
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.trim().is_empty())
    }

    /// 1-based line number in the source file (the header is line 1).
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn headers(&self) -> &CsvHeaders {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_header() {
        let row = CsvRow::from_pairs([("code", "75056"), ("nom", " Paris ")], 2);
        assert_eq!(row.get("code"), Some("75056"));
        assert_eq!(row.get("nom"), Some(" Paris "));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.line(), 2);
    }

    #[test]
    fn test_has_value_ignores_whitespace() {
        let row = CsvRow::from_pairs([("a", "  "), ("b", "x")], 2);
        assert!(!row.has_value("a"));
        assert!(row.has_value("b"));
        assert!(!row.has_value("c"));
    }

    #[test]
    fn test_bom_is_stripped_from_first_header() {
        let headers = CsvHeaders::new(["\u{feff}code", "nom"]);
        assert_eq!(headers.position("code"), Some(0));
        assert_eq!(headers.names()[0], "code");
    }

    #[test]
    fn test_duplicate_header_last_wins() {
        let headers = Arc::new(CsvHeaders::new(["a", "b", "a"]));
        let row = CsvRow::new(headers, StringRecord::from(vec!["1", "2", "3"]), 2);
        assert_eq!(row.get("a"), Some("3"));
    }

    #[test]
    fn test_short_row_yields_none() {
        let headers = Arc::new(CsvHeaders::new(["a", "b"]));
        let row = CsvRow::new(headers, StringRecord::from(vec!["1"]), 2);
        assert_eq!(row.get("b"), None);
    }
}
