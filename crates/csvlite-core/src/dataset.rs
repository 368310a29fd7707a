//! In-memory representation of an uploaded CSV file.

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

/// Errors that can occur while parsing an upload into a [`Dataset`].
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("input has no header row")]
    MissingHeader,
    #[error("column {index} has an empty name")]
    EmptyColumnName { index: usize },
    #[error("duplicate column name: '{0}'")]
    DuplicateColumnName(String),
}

/// A fully materialized tabular dataset.
///
/// Column names come from the header row (required, first row); every record
/// is kept as strings in file order. Fields are trimmed of surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Parses CSV bytes into a dataset.
    ///
    /// Records whose field count differs from the header are rejected by the
    /// reader. Column names must be non-empty and unique (ASCII
    /// case-insensitive, the way SQLite compares identifiers); SQLite could
    /// not create the destination table otherwise.
    pub fn parse(input: &[u8]) -> Result<Self, DatasetError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(input);

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(DatasetError::MissingHeader);
        }

        let mut columns: Vec<String> = Vec::with_capacity(headers.len());
        for (index, name) in headers.iter().enumerate() {
            if name.is_empty() {
                return Err(DatasetError::EmptyColumnName { index });
            }
            if columns.iter().any(|existing| existing.eq_ignore_ascii_case(name)) {
                return Err(DatasetError::DuplicateColumnName(name.to_string()));
            }
            columns.push(name.to_string());
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|field| field.to_string()).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All data rows, each positionally aligned with [`columns`](Self::columns).
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows (the header is not a row).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Iterates over the values of one column, top to bottom.
    pub(crate) fn column_values(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| row[index].as_str())
    }
}
