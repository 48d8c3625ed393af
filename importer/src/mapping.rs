//! Column mapping from spreadsheet rows to thing data.
//!
//! # Design
//! A `Mapping` is plain data loaded from JSON, so column rules live next to
//! the input file instead of in code:
//!
//! ```json
//! {
//!   "columns": {
//!     "MPID": {"rename": "uid"},
//!     "Sizes": {"split_list": {"separator": "~"}},
//!     "Specification": {"split_pairs": {"row_separator": "~", "value_separator": ":"}}
//!   },
//!   "import_unconfigured": true
//! }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use tracing::warn;

use crate::error::ImportError;
use crate::rows::{MappedRow, Row, RowFailure};

/// Outcome of mapping every input row.
#[derive(Debug, Default)]
pub struct MappedRows {
    pub rows: Vec<MappedRow>,
    pub failures: Vec<RowFailure>,
}

/// How a single column is turned into thing fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMapping {
    /// Store the cell under another field name.
    Rename(String),
    /// Split the cell into a list of trimmed parts stored under the column name.
    SplitList { separator: String },
    /// Split the cell into `key<value_separator>value` pairs, one field per pair.
    SplitPairs {
        row_separator: String,
        value_separator: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Mapping {
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnMapping>,
    /// Import columns without a rule under their normalized name.
    #[serde(default = "default_import_unconfigured")]
    pub import_unconfigured: bool,
}

fn default_import_unconfigured() -> bool {
    true
}

impl Default for Mapping {
    fn default() -> Self {
        Self {
            columns: BTreeMap::new(),
            import_unconfigured: true,
        }
    }
}

impl Mapping {
    pub fn from_json(raw: &str) -> Result<Self, ImportError> {
        serde_json::from_str(raw).map_err(|e| ImportError::InvalidRows(format!("mapping: {e}")))
    }

    /// Map every row. A row that fails is recorded and the rest still go
    /// through.
    pub fn parse_rows(&self, rows: &[Row]) -> MappedRows {
        let mut mapped = MappedRows::default();
        for (index, row) in rows.iter().enumerate() {
            let number = index + 1;
            match self.parse_row(row) {
                Ok(data) => mapped.rows.push(MappedRow { row: number, data }),
                Err(e) => {
                    warn!(row = number, error = %e, "row could not be mapped");
                    mapped.failures.push(RowFailure {
                        row: number,
                        message: e.to_string(),
                    });
                }
            }
        }
        mapped
    }

    /// Map one input row to thing data.
    pub fn parse_row(&self, row: &Map<String, Value>) -> Result<Map<String, Value>, ImportError> {
        let mut data = Map::new();
        for (column, cell) in row {
            match self.columns.get(column) {
                Some(ColumnMapping::Rename(field)) => {
                    data.insert(field.clone(), cell.clone());
                }
                Some(ColumnMapping::SplitList { separator }) => {
                    data.insert(column.clone(), split_list(cell, separator));
                }
                Some(ColumnMapping::SplitPairs {
                    row_separator,
                    value_separator,
                }) => {
                    data.extend(split_pairs(column, cell, row_separator, value_separator)?);
                }
                None if self.import_unconfigured => {
                    data.insert(normalize_key(column), cell.clone());
                }
                None => {}
            }
        }
        Ok(data)
    }
}

/// Trim, keep only `[A-Za-z0-9_ ]`, title-case each word and drop spaces.
///
/// `"  size (cm) "` becomes `"SizeCm"`.
pub fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut after_letter = false;
    for c in key.trim().chars() {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == ' ') {
            continue;
        }
        if c.is_ascii_alphabetic() {
            if after_letter {
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c.to_ascii_uppercase());
            }
            after_letter = true;
        } else {
            after_letter = false;
            if c != ' ' {
                out.push(c);
            }
        }
    }
    out
}

fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn split_list(cell: &Value, separator: &str) -> Value {
    let parts = cell_text(cell)
        .map(|text| {
            text.split(separator)
                .map(|part| Value::String(part.trim().to_string()))
                .collect()
        })
        .unwrap_or_default();
    Value::Array(parts)
}

fn split_pairs(
    column: &str,
    cell: &Value,
    row_separator: &str,
    value_separator: &str,
) -> Result<Map<String, Value>, ImportError> {
    let mut data = Map::new();
    // Non-text cells carry no pairs.
    let Value::String(text) = cell else {
        return Ok(data);
    };
    for pair in text.split(row_separator).filter(|p| !p.trim().is_empty()) {
        let (key, value) = pair.split_once(value_separator).ok_or_else(|| {
            ImportError::InvalidRows(format!(
                "column {column}: {pair:?} has no {value_separator:?} separator"
            ))
        })?;
        data.insert(normalize_key(key), Value::String(value.trim().to_string()));
    }
    Ok(data)
}
