//! Creating one thing per mapped row.

use axsemantics_core::{Client, Createable, Resource, Thing};
use serde_json::Value;
use tracing::{info, warn};

use crate::rows::{MappedRow, RowFailure};

#[derive(Debug, Default)]
pub struct Report {
    pub created: Vec<Thing>,
    pub failures: Vec<RowFailure>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Create a thing in `project_id` for every row.
///
/// `uid` and `name` are taken from the row and the whole row becomes
/// `pure_data`. A failing row is recorded and the next row is tried.
pub fn upload(client: &Client, project_id: &Value, rows: &[MappedRow]) -> Report {
    let mut report = Report::default();
    for mapped in rows {
        let (number, row) = (mapped.row, &mapped.data);
        let mut thing = Thing::new(client, project_id.clone());
        for field in ["uid", "name"] {
            if let Some(value) = row.get(field) {
                thing.set(field, value.clone());
            }
        }
        thing.set("pure_data", Value::Object(row.clone()));

        match thing.create() {
            Ok(()) => {
                info!(row = number, id = ?thing.id(), "created thing");
                report.created.push(thing);
            }
            Err(e) => {
                warn!(row = number, error = %e, "row failed");
                report.failures.push(RowFailure {
                    row: number,
                    message: e.to_string(),
                });
            }
        }
    }
    report
}
