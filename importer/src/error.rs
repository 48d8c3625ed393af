//! Error types for the spreadsheet importer.

use std::path::PathBuf;

use axsemantics_core::ApiError;
use thiserror::Error;

/// Errors returned while reading, mapping or uploading rows.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("could not find input file {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("input file {} is empty", path.display())]
    EmptyFile { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not a JSON array of objects, or a cell could not be mapped.
    #[error("invalid rows: {0}")]
    InvalidRows(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}
