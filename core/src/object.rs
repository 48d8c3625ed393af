//! Type-tag dispatch of decoded responses.
//!
//! A response object becomes the concrete resource named by the tag the
//! caller expects (or, failing that, by its own `"type"` field). Unknown
//! tags fall back to a plain `Record`. Arrays dispatch element-wise and
//! scalars pass through untouched.

use serde_json::{Map, Value};

use crate::client::Client;
use crate::record::Record;
use crate::resource::Resource;
use crate::resources::{ContentProject, Thing, CONTENT_PROJECT_TAG, THING_TAG};

#[derive(Debug, Clone)]
pub enum ApiObject {
    ContentProject(ContentProject),
    Thing(Thing),
    Record(Record),
}

/// A decoded response after dispatch.
#[derive(Debug, Clone)]
pub enum ApiValue {
    Object(ApiObject),
    List(Vec<ApiValue>),
    Value(Value),
}

impl ApiValue {
    /// Plain JSON again, with objects rendered from their records.
    pub fn to_value(&self) -> Value {
        match self {
            ApiValue::Object(object) => object.record().to_value(),
            ApiValue::List(items) => Value::Array(items.iter().map(ApiValue::to_value).collect()),
            ApiValue::Value(value) => value.clone(),
        }
    }

    pub fn into_object(self) -> Option<ApiObject> {
        match self {
            ApiValue::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl ApiObject {
    /// Builds the object for `tag`. `path_params` are added to the data
    /// when it does not carry them itself.
    pub fn from_map(
        client: &Client,
        tag: Option<&str>,
        mut data: Map<String, Value>,
        path_params: &Map<String, Value>,
    ) -> Self {
        for (key, value) in path_params {
            data.entry(key.clone()).or_insert_with(|| value.clone());
        }

        let tag = tag
            .map(str::to_string)
            .or_else(|| data.get("type").and_then(Value::as_str).map(str::to_string));
        let record = Record::from_map(data);

        match tag.as_deref() {
            Some(CONTENT_PROJECT_TAG) => {
                ApiObject::ContentProject(ContentProject::from_parts(client.clone(), record))
            }
            Some(THING_TAG) => ApiObject::Thing(Thing::from_parts(client.clone(), record)),
            _ => ApiObject::Record(record),
        }
    }

    pub fn from_value(
        client: &Client,
        tag: Option<&str>,
        value: Value,
        path_params: &Map<String, Value>,
    ) -> ApiValue {
        match value {
            Value::Object(map) => ApiValue::Object(Self::from_map(client, tag, map, path_params)),
            Value::Array(items) => ApiValue::List(
                items
                    .into_iter()
                    .map(|item| Self::from_value(client, tag, item, path_params))
                    .collect(),
            ),
            other => ApiValue::Value(other),
        }
    }

    /// Tag of the concrete type, `None` for a plain record.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            ApiObject::ContentProject(_) => Some(CONTENT_PROJECT_TAG),
            ApiObject::Thing(_) => Some(THING_TAG),
            ApiObject::Record(_) => None,
        }
    }

    pub fn record(&self) -> &Record {
        match self {
            ApiObject::ContentProject(project) => project.record(),
            ApiObject::Thing(thing) => thing.record(),
            ApiObject::Record(record) => record,
        }
    }

    pub fn into_content_project(self) -> Option<ContentProject> {
        match self {
            ApiObject::ContentProject(project) => Some(project),
            _ => None,
        }
    }

    pub fn into_thing(self) -> Option<Thing> {
        match self {
            ApiObject::Thing(thing) => Some(thing),
            _ => None,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            ApiObject::ContentProject(project) => project.into_record(),
            ApiObject::Thing(thing) => thing.into_record(),
            ApiObject::Record(record) => record,
        }
    }
}
