//! Dirty-tracking field container underlying every resource.
//!
//! # Design
//! A `Record` is a field map plus the set of field names assigned since the
//! last load, plus the raw snapshot of that load. `serialize` produces the
//! partial-update payload from those three pieces:
//!
//! - `id` and `_`-prefixed fields are never emitted.
//! - A nested record is always emitted as its own (recursive) diff.
//! - A dirty field is emitted through [`diff_value`]: mapping values gain an
//!   empty-string tombstone for every key the previous value had and the new
//!   one lacks, and `null` becomes `""`. The API has no null semantics for
//!   partial updates, so removals travel as `""`.
//!
//! Assignments go through `set`, which marks the field dirty even when the
//! value did not change. Loads wrap nested JSON objects into nested records
//! and arrays into field lists; assigned values are stored raw.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Name of the identity field.
pub const ID_FIELD: &str = "id";

/// One field value inside a `Record`.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    Record(Record),
    List(Vec<Field>),
}

impl Field {
    /// Wraps a loaded JSON value, turning objects into nested records.
    pub fn from_loaded(value: Value) -> Self {
        match value {
            Value::Object(map) => Field::Record(Record::from_map(map)),
            Value::Array(items) => Field::List(items.into_iter().map(Field::from_loaded).collect()),
            other => Field::Value(other),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Field::Value(value) => value.clone(),
            Field::Record(record) => record.to_value(),
            Field::List(items) => Value::Array(items.iter().map(Field::to_value).collect()),
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Field::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Value(Value::Null))
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(value) => value.serialize(serializer),
            Field::Record(record) => Serialize::serialize(record, serializer),
            Field::List(items) => items.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Field>,
    dirty: BTreeSet<String>,
    previous: Option<Map<String, Value>>,
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record::from_map(map)
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clean record holding `data`.
    pub fn from_map(data: Map<String, Value>) -> Self {
        let mut record = Self::new();
        record.load(data, false);
        record
    }

    /// Replaces the contents with `data`, or merges it in when `partial`.
    ///
    /// A full load empties the dirty set. A partial load only clears the
    /// marks of the keys it loaded. Either way `data` becomes the snapshot
    /// later diffs are computed against.
    pub fn load(&mut self, data: Map<String, Value>, partial: bool) {
        if partial {
            for key in data.keys() {
                self.dirty.remove(key);
            }
        } else {
            self.dirty.clear();
            self.fields.clear();
        }

        for (key, value) in &data {
            self.fields
                .insert(key.clone(), Field::from_loaded(value.clone()));
        }
        self.previous = Some(data);
    }

    /// Assigns `key` and marks it dirty.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        self.fields.insert(key.clone(), Field::Value(value.into()));
        self.dirty.insert(key);
    }

    /// `set` for every entry of `values`.
    pub fn update(&mut self, values: Map<String, Value>) {
        for (key, value) in values {
            self.set(key, value);
        }
    }

    /// Drops the field and its dirty mark.
    pub fn remove(&mut self, key: &str) -> Option<Field> {
        self.dirty.remove(key);
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.fields.get(key).map(Field::to_value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(Field::Value(Value::String(s))) => Some(s),
            _ => None,
        }
    }

    /// Nested record stored under `key`. Changes made through it show up in
    /// the parent's `serialize`.
    pub fn get_record_mut(&mut self, key: &str) -> Option<&mut Record> {
        match self.fields.get_mut(key) {
            Some(Field::Record(record)) => Some(record),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Identity value, if present and not null.
    pub fn id(&self) -> Option<&Value> {
        match self.fields.get(ID_FIELD) {
            Some(Field::Value(value)) if !value.is_null() => Some(value),
            _ => None,
        }
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.dirty.contains(key)
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw data of the last load.
    pub fn previous(&self) -> Option<&Map<String, Value>> {
        self.previous.as_ref()
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(key, field)| (key.clone(), field.to_value()))
            .collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    /// Partial-update payload against `previous`, or against the last load
    /// when `previous` is `None`.
    pub fn serialize(&self, previous: Option<&Map<String, Value>>) -> Map<String, Value> {
        let empty = Map::new();
        let previous = previous.or(self.previous.as_ref()).unwrap_or(&empty);
        let mut params = Map::new();

        for (key, field) in &self.fields {
            if key == ID_FIELD || key.starts_with('_') {
                continue;
            }
            match field {
                Field::Record(nested) => {
                    let nested_previous = previous.get(key).and_then(Value::as_object);
                    params.insert(key.clone(), Value::Object(nested.serialize(nested_previous)));
                }
                _ if self.dirty.contains(key) => {
                    params.insert(key.clone(), diff_value(field.to_value(), previous.get(key)));
                }
                _ => {}
            }
        }

        params
    }
}

/// Diff of one dirty value against its previous value.
///
/// Keys of a previous mapping missing from the current mapping are emitted
/// as `""`. `null` becomes `""`. Everything else is returned unchanged.
pub fn diff_value(current: Value, previous: Option<&Value>) -> Value {
    match current {
        Value::Object(mut map) => {
            if let Some(Value::Object(previous)) = previous {
                for key in previous.keys() {
                    if !map.contains_key(key) {
                        map.insert(key.clone(), Value::String(String::new()));
                    }
                }
            }
            Value::Object(map)
        }
        Value::Null => Value::String(String::new()),
        other => other,
    }
}
