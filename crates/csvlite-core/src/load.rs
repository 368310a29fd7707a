//! Writes a dataset into the destination SQLite file.

use rusqlite::types::ToSql;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use thiserror::Error;

use crate::dataset::Dataset;
use crate::infer::{parse_timestamp, ColumnSpec, ColumnType, SchemaDescriptor};

/// Errors that can occur while loading a dataset into SQLite.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("descriptor has {descriptor} columns but dataset has {dataset}")]
    ColumnCountMismatch { descriptor: usize, dataset: usize },
    #[error("row {row}, column '{column}': value '{value}' does not match type {column_type}")]
    ValueMismatch {
        row: usize,
        column: String,
        column_type: ColumnType,
        value: String,
    },
}

/// How long a conversion waits on a competing writer before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Quotes an identifier for direct inclusion in SQL.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Converts one cell into a SQL parameter per the column's declared type.
///
/// Empty cells become NULL regardless of type.
fn bind_value(spec: &ColumnSpec, value: &str, row: usize) -> Result<Box<dyn ToSql>, LoadError> {
    if value.is_empty() {
        return Ok(Box::new(rusqlite::types::Null));
    }

    let mismatch = || LoadError::ValueMismatch {
        row,
        column: spec.name.clone(),
        column_type: spec.column_type,
        value: value.to_string(),
    };

    match spec.column_type {
        ColumnType::Integer => {
            let parsed: i64 = value.parse().map_err(|_| mismatch())?;
            Ok(Box::new(parsed))
        }
        ColumnType::Real => {
            let parsed: f64 = value.parse().map_err(|_| mismatch())?;
            Ok(Box::new(parsed))
        }
        ColumnType::Timestamp => {
            let parsed = parse_timestamp(value).ok_or_else(mismatch)?;
            Ok(Box::new(parsed))
        }
        ColumnType::Text => Ok(Box::new(value.to_string())),
    }
}

/// Creates the table described by `descriptor` at `db_path` and inserts
/// every dataset row.
///
/// Any existing table with the same name is dropped first, so repeated loads
/// replace rather than append. Table creation and all inserts run in one
/// transaction; a failure commits nothing. The connection is scoped to this
/// call and closed on every path, and waits up to `BUSY_TIMEOUT_MS` for a
/// competing writer on the same destination.
pub fn load_dataset(
    dataset: &Dataset,
    descriptor: &SchemaDescriptor,
    db_path: &Path,
    table: &str,
) -> Result<(), LoadError> {
    if descriptor.len() != dataset.columns().len() {
        return Err(LoadError::ColumnCountMismatch {
            descriptor: descriptor.len(),
            dataset: dataset.columns().len(),
        });
    }

    let mut conn = Connection::open(db_path)?;
    conn.execute_batch(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"))?;
    // SQLite will not busy-wait on a deferred SHARED-to-RESERVED upgrade,
    // so take the write lock up front.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;

    let column_defs: Vec<String> = descriptor
        .iter()
        .map(|spec| format!("{} {}", quote_ident(&spec.name), spec.column_type.as_sql()))
        .collect();
    tx.execute_batch(&format!(
        "CREATE TABLE {} ({})",
        quote_ident(table),
        column_defs.join(", ")
    ))?;

    let column_names: Vec<String> = descriptor
        .iter()
        .map(|spec| quote_ident(&spec.name))
        .collect();
    let placeholders: Vec<String> = (1..=descriptor.len()).map(|i| format!("?{i}")).collect();
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_names.join(", "),
        placeholders.join(", ")
    );

    {
        let mut stmt = tx.prepare(&insert_sql)?;
        for (row_index, row) in dataset.rows().iter().enumerate() {
            let mut values: Vec<Box<dyn ToSql>> = Vec::with_capacity(row.len());
            for (spec, value) in descriptor.iter().zip(row) {
                values.push(bind_value(spec, value, row_index)?);
            }
            let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
            stmt.execute(params.as_slice())?;
        }
    }

    tx.commit()?;

    tracing::debug!(
        table,
        rows = dataset.row_count(),
        columns = descriptor.len(),
        "dataset loaded"
    );
    Ok(())
}
