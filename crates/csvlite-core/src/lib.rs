//! Core conversion pipeline: CSV in, single-table SQLite database out.
//!
//! The pipeline is strictly linear. [`Dataset::parse`] materializes the
//! upload in memory, [`infer_schema`] maps each column's detected scalar
//! kind to a SQLite column type, and [`load_dataset`] creates the table and
//! writes every row. [`convert_csv`] chains the three.
//!
//! # Design decisions
//!
//! - **Full materialization**: uploads are capped by the HTTP layer, so the
//!   dataset lives entirely in memory. No streaming.
//! - **Detection scans every value**: column kinds are decided from all
//!   rows, not a sample, so a value that fails to bind at load time cannot
//!   occur through this crate's own pipeline.
//! - **One schema authority**: `CREATE TABLE` is derived from the
//!   [`SchemaDescriptor`] and nothing else; the insert binds by the same
//!   descriptor.
//! - **Scoped connections**: the destination connection is opened inside
//!   [`load_dataset`] and dropped on every path, success or error.

mod convert;
mod dataset;
mod infer;
mod load;

pub use convert::{convert_csv, derive_db_filename, is_csv_filename, Conversion, ConvertError};
pub use dataset::{Dataset, DatasetError};
pub use infer::{infer_schema, ColumnSpec, ColumnType, InferError, ScalarKind, SchemaDescriptor};
pub use load::{load_dataset, LoadError};

/// Name of the table every conversion writes into.
pub const DEFAULT_TABLE_NAME: &str = "input_table";

/// Extension expected on uploaded files.
pub const CSV_EXT: &str = ".csv";

/// Extension of the generated database file.
pub const SQLITE_EXT: &str = ".sqlite";
