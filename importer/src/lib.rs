//! Bulk import of spreadsheet rows as things of a content project.
//!
//! # Design
//! Rows arrive as a JSON array of objects (a spreadsheet exported with one
//! object per row). Each row goes through a `Mapping`, then is either
//! exported as JSON or uploaded as a `Thing`. Mapping and upload both keep
//! going past failing rows and report them at the end.

pub mod error;
pub mod mapping;
pub mod rows;
pub mod upload;

pub use error::ImportError;
pub use mapping::{normalize_key, ColumnMapping, MappedRows, Mapping};
pub use rows::{export, read_rows, validate_file, MappedRow, Row, RowFailure};
pub use upload::{upload, Report};
