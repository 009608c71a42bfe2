//! Cell values and coercion of raw CSV text.
//!
//! Numeric columns use lenient float parsing: the longest numeric prefix of the
//! trimmed text is taken (`"12 km"` is 12), and text without one is NULL, never 0.
//! Text columns are trimmed and blank text is NULL.

use std::sync::LazyLock;

use regex::Regex;

use super::spec::{compile_regex_unsafe, ColumnKind};

static NUMERIC_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex_unsafe(
        r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?",
        "NUMERIC_PREFIX_RE",
    )
});

/// A value bound into an INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// One row ready for insertion, ordered like the importer's columns.
pub type RowValues = Vec<SqlValue>;

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Coerces raw CSV text for a column of the given kind.
    pub fn coerce(kind: ColumnKind, raw: Option<&str>) -> SqlValue {
        let Some(raw) = raw else {
            return SqlValue::Null;
        };
        match kind {
            ColumnKind::Integer => match parse_number(raw) {
                Some(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                    SqlValue::Integer(n as i64)
                }
                Some(n) => SqlValue::Real(n),
                None => SqlValue::Null,
            },
            ColumnKind::Real => parse_number(raw).map_or(SqlValue::Null, SqlValue::Real),
            ColumnKind::Text => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    SqlValue::Null
                } else {
                    SqlValue::Text(trimmed.to_string())
                }
            }
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<f64> for SqlValue {
    fn from(n: f64) -> Self {
        SqlValue::Real(n)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Parses the leading number of `raw` (after trimming), or `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let prefix = NUMERIC_PREFIX_RE.find(raw.trim())?;
    prefix
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
