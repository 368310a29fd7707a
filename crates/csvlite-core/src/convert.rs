//! End-to-end conversion and output filename derivation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::dataset::{Dataset, DatasetError};
use crate::infer::{infer_schema, InferError, SchemaDescriptor};
use crate::load::{load_dataset, LoadError};
use crate::{CSV_EXT, SQLITE_EXT};

/// Errors from the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("csv parsing failed: {0}")]
    Dataset(#[from] DatasetError),
    #[error("schema inference failed: {0}")]
    Infer(#[from] InferError),
    #[error("database load failed: {0}")]
    Load(#[from] LoadError),
}

/// Summary of one completed conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversion {
    /// Name of the table the data was written into.
    pub table: String,
    /// Ordered column specs the table was created with.
    pub columns: SchemaDescriptor,
    /// Number of data rows written.
    pub rows: usize,
}

/// Runs the full pipeline: parse, infer, load.
///
/// Inference completes before the destination is opened, so a conversion
/// that fails before loading never creates the output file.
pub fn convert_csv(input: &[u8], db_path: &Path, table: &str) -> Result<Conversion, ConvertError> {
    let dataset = Dataset::parse(input)?;
    let descriptor = infer_schema(&dataset)?;
    load_dataset(&dataset, &descriptor, db_path, table)?;

    Ok(Conversion {
        table: table.to_string(),
        columns: descriptor,
        rows: dataset.row_count(),
    })
}

/// Returns true if the filename carries the expected upload extension
/// (ASCII case-insensitive).
pub fn is_csv_filename(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(CSV_EXT)
}

/// Derives the output filename from the uploaded filename.
///
/// The name is reduced to its final path component; a final `.csv` (ASCII
/// case-insensitive) is replaced with `.sqlite`. Names without the upload
/// extension get `.sqlite` appended.
pub fn derive_db_filename(upload_name: &str) -> String {
    let name = Path::new(upload_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(upload_name);

    if is_csv_filename(name) {
        // The matched suffix is pure ASCII, so the slice stays on a char boundary.
        format!("{}{}", &name[..name.len() - CSV_EXT.len()], SQLITE_EXT)
    } else {
        format!("{name}{SQLITE_EXT}")
    }
}
