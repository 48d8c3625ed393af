//! Reading input rows and exporting mapped data.
//!
//! Input is a JSON array of objects, one object per spreadsheet row with the
//! column headers as keys. Empty cells are `null` and stay `null`.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::info;

use crate::error::ImportError;

pub type Row = Map<String, Value>;

/// Mapped thing data with the number of the input row it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub row: usize,
    pub data: Row,
}

/// A row that could not be mapped or uploaded, numbered from 1 in input
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row: usize,
    pub message: String,
}

/// Check that `path` names an existing, non-empty file.
pub fn validate_file(path: &Path) -> Result<(), ImportError> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(ImportError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    if fs::metadata(path)?.len() == 0 {
        return Err(ImportError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

pub fn read_rows(path: &Path) -> Result<Vec<Row>, ImportError> {
    validate_file(path)?;
    let raw = fs::read_to_string(path)?;
    let rows: Vec<Row> = serde_json::from_str(&raw)
        .map_err(|e| ImportError::InvalidRows(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), rows = rows.len(), "read input rows");
    Ok(rows)
}

/// Write mapped rows to `path` as a JSON array.
pub fn export(rows: &[MappedRow], path: &Path) -> Result<(), ImportError> {
    let data: Vec<&Row> = rows.iter().map(|mapped| &mapped.data).collect();
    let json = serde_json::to_string_pretty(&data)
        .map_err(|e| ImportError::InvalidRows(e.to_string()))?;
    fs::write(path, json)?;
    info!(path = %path.display(), rows = rows.len(), "exported rows");
    Ok(())
}
