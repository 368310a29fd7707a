//! Column kind detection and the kind to SQLite type map.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::dataset::Dataset;

/// Errors that can occur during schema inference.
#[derive(Debug, Error)]
pub enum InferError {
    /// A column's detected kind has no entry in the type map.
    #[error("unsupported column type '{kind}' for column '{column}'")]
    UnsupportedColumnType { column: String, kind: ScalarKind },
}

/// Scalar kind detected for a column.
///
/// Detection looks at every non-empty value in the column. `Boolean` is a
/// kind of its own with no entry in the type map, so boolean columns fail
/// inference rather than load as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Integer,
    Float,
    Timestamp,
    Text,
    Boolean,
}

impl ScalarKind {
    /// Maps this kind to its SQLite column type.
    ///
    /// The map is closed: exactly four kinds have an entry. `Boolean`
    /// returns `None` and makes the whole conversion fail upstream.
    pub fn column_type(self) -> Option<ColumnType> {
        match self {
            ScalarKind::Integer => Some(ColumnType::Integer),
            ScalarKind::Float => Some(ColumnType::Real),
            ScalarKind::Timestamp => Some(ColumnType::Timestamp),
            ScalarKind::Text => Some(ColumnType::Text),
            ScalarKind::Boolean => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Timestamp => "timestamp",
            ScalarKind::Text => "text",
            ScalarKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQLite column type written into `CREATE TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Real,
    Timestamp,
    Text,
}

impl ColumnType {
    /// SQL type name as it appears in the schema.
    pub fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A named, typed column of the destination table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, exactly as it appeared in the header.
    pub name: String,
    /// SQLite type the column is created with.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Ordered column specs for the destination table, positionally aligned
/// with the dataset that produced them.
pub type SchemaDescriptor = Vec<ColumnSpec>;

/// Datetime formats accepted for the timestamp kind, tried in order.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Date-only format; values parse as midnight.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a value with the accepted timestamp formats.
///
/// RFC 3339 values with an offset are normalized to UTC. Date-only values
/// parse as midnight.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(date.and_time(NaiveTime::MIN));
    }
    None
}

/// Detects the kind of a single non-empty value.
fn detect_value(value: &str) -> ScalarKind {
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return ScalarKind::Boolean;
    }
    if value.parse::<i64>().is_ok() {
        return ScalarKind::Integer;
    }
    if value.parse::<f64>().is_ok() {
        return ScalarKind::Float;
    }
    if parse_timestamp(value).is_some() {
        return ScalarKind::Timestamp;
    }
    ScalarKind::Text
}

/// Detects the kind of a whole column by merging per-value kinds.
///
/// Empty values are skipped; a column with no non-empty values is text.
/// Integer and float mix as float; any other mix collapses to text.
fn detect_column<'a>(values: impl Iterator<Item = &'a str>) -> ScalarKind {
    let mut merged: Option<ScalarKind> = None;
    for value in values {
        if value.is_empty() {
            continue;
        }
        let kind = detect_value(value);
        merged = Some(match merged {
            None => kind,
            Some(previous) if previous == kind => previous,
            Some(ScalarKind::Integer) if kind == ScalarKind::Float => ScalarKind::Float,
            Some(ScalarKind::Float) if kind == ScalarKind::Integer => ScalarKind::Float,
            Some(_) => return ScalarKind::Text,
        });
    }
    merged.unwrap_or(ScalarKind::Text)
}

/// Derives the schema descriptor for a dataset.
///
/// One entry per column, in column order. Fails on the first column whose
/// detected kind has no entry in the type map; nothing has touched the
/// destination at that point.
pub fn infer_schema(dataset: &Dataset) -> Result<SchemaDescriptor, InferError> {
    let mut descriptor = Vec::with_capacity(dataset.columns().len());
    for (index, name) in dataset.columns().iter().enumerate() {
        let kind = detect_column(dataset.column_values(index));
        let column_type =
            kind.column_type()
                .ok_or_else(|| InferError::UnsupportedColumnType {
                    column: name.clone(),
                    kind,
                })?;
        descriptor.push(ColumnSpec {
            name: name.clone(),
            column_type,
        });
    }
    Ok(descriptor)
}
