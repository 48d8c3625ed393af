//! Capability traits that bind a `Record` to API endpoints.
//!
//! # Design
//! `Resource` is the base: a type tag, an optional path template, access to
//! the record and the client, URL derivation and `refresh`. Each API verb is
//! a separate capability trait with a default implementation, and concrete
//! types opt into the ones their endpoint supports:
//!
//! | trait | request |
//! |---|---|
//! | `Createable` | `POST class_path` with required fields plus the diff |
//! | `Updateable` | `PUT instance_url` with the full state |
//! | `Deleteable` | `DELETE instance_url` |
//! | `Listable` | paginated `GET class_path` |
//! | `ContentGeneration` | `POST instance_url/generate_content/` |
//!
//! Every verb reloads the record from the response body.

use percent_encoding::utf8_percent_encode;
use serde_json::{Map, Value};

use crate::client::{Client, UNRESERVED};
use crate::collection::Collection;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::object::{ApiObject, ApiValue};
use crate::record::{Field, Record, ID_FIELD};

pub trait Resource: Sized {
    /// Tag used for the URL segment and for response dispatch.
    const TYPE_TAG: &'static str;

    /// Path below the API version with `{field}` placeholders filled from the
    /// record. `None` means the escaped type tag.
    const PATH_TEMPLATE: Option<&'static str> = None;

    fn from_parts(client: Client, record: Record) -> Self;

    fn client(&self) -> &Client;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn id(&self) -> Option<&Value> {
        self.record().id()
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        self.record().get_value(key)
    }

    fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.record_mut().set(key, value);
    }

    fn class_path(&self) -> Result<String, ApiError> {
        let segment = match Self::PATH_TEMPLATE {
            Some(template) => expand_template(template, self.record())?,
            None => escape_segment(Self::TYPE_TAG),
        };
        Ok(format!("/{}/{}/", self.client().api_version(), segment))
    }

    /// Class path plus the escaped identity, or the bare class path before
    /// the resource exists server-side.
    fn instance_url(&self) -> Result<String, ApiError> {
        let class_path = self.class_path()?;
        Ok(match self.id() {
            Some(id) => format!("{class_path}{}/", escape_segment(&segment_value(id))),
            None => class_path,
        })
    }

    fn retrieve(client: &Client, id: impl Into<Value>) -> Result<Self, ApiError> {
        Self::retrieve_with(client, id, Map::new())
    }

    /// `retrieve` for resources whose path needs extra fields, such as the
    /// owning project of a thing.
    fn retrieve_with(
        client: &Client,
        id: impl Into<Value>,
        mut path_params: Map<String, Value>,
    ) -> Result<Self, ApiError> {
        path_params.insert(ID_FIELD.to_string(), id.into());
        let mut instance = Self::from_parts(client.clone(), Record::from_map(path_params));
        instance.refresh()?;
        Ok(instance)
    }

    fn refresh(&mut self) -> Result<(), ApiError> {
        let url = self.instance_url()?;
        let response = self.client().request(HttpMethod::Get, &url, None, &[])?;
        self.load_response(response)
    }

    /// Full load of a response body. `null` (an empty body) clears the record.
    fn load_response(&mut self, response: Value) -> Result<(), ApiError> {
        match response {
            Value::Object(map) => self.record_mut().load(map, false),
            Value::Null => self.record_mut().load(Map::new(), false),
            other => {
                return Err(ApiError::UnexpectedResponse(format!(
                    "expected a {} object, got {other}",
                    Self::TYPE_TAG
                )))
            }
        }
        Ok(())
    }
}

pub trait Createable: Resource {
    /// Fields that must be present and non-null before `create`.
    const REQUIRED_FIELDS: &'static [&'static str];

    fn create(&mut self) -> Result<(), ApiError> {
        let mut params = Map::new();
        for &field in Self::REQUIRED_FIELDS {
            match self.record().get(field) {
                Some(value) if !value.is_null() => {
                    params.insert(field.to_string(), value.to_value());
                }
                _ => return Err(ApiError::missing_field(field)),
            }
        }
        params.extend(self.record().serialize(None));

        let path = self.class_path()?;
        let response = self
            .client()
            .request(HttpMethod::Post, &path, Some(&Value::Object(params)), &[])?;
        self.load_response(response)
    }
}

pub trait Updateable: Resource {
    fn save(&mut self) -> Result<(), ApiError> {
        require_identity(self)?;
        let url = self.instance_url()?;
        let params = self.record().to_value();
        let response = self
            .client()
            .request(HttpMethod::Put, &url, Some(&params), &[])?;
        self.load_response(response)
    }
}

pub trait Deleteable: Resource {
    /// Leaves the record holding whatever the server answered, usually
    /// nothing, so the object is a tombstone afterwards.
    fn delete(&mut self) -> Result<(), ApiError> {
        require_identity(self)?;
        let url = self.instance_url()?;
        let response = self.client().request(HttpMethod::Delete, &url, None, &[])?;
        self.load_response(response)
    }
}

pub trait Listable: Resource {
    fn all(client: &Client) -> Result<Collection, ApiError> {
        Self::all_with(client, Map::new())
    }

    /// Collection over the list endpoint. `path_params` fill the path
    /// template and are carried into every yielded item.
    fn all_with(client: &Client, path_params: Map<String, Value>) -> Result<Collection, ApiError> {
        let probe = Self::from_parts(client.clone(), Record::from_map(path_params.clone()));
        let path = probe.class_path()?;
        Ok(Collection::new(client.clone(), Self::TYPE_TAG, path, path_params))
    }
}

pub trait ContentGeneration: Resource {
    /// Asks the API to (re)generate text. Needs an identity. The answer is
    /// dispatched like any other response of this type.
    fn generate_content(&self, force: bool) -> Result<ApiValue, ApiError> {
        require_identity(self)?;
        let url = format!("{}generate_content/?force={force}", self.instance_url()?);
        let response = self.client().request(HttpMethod::Post, &url, None, &[])?;
        Ok(ApiObject::from_value(
            self.client(),
            Some(Self::TYPE_TAG),
            response,
            &Map::new(),
        ))
    }
}

/// Instance verbs without an identity would hit the collection endpoint.
fn require_identity<R: Resource>(resource: &R) -> Result<(), ApiError> {
    match resource.id() {
        Some(_) => Ok(()),
        None => Err(ApiError::missing_field(ID_FIELD)),
    }
}

pub(crate) fn escape_segment(segment: &str) -> String {
    utf8_percent_encode(segment, UNRESERVED).to_string()
}

/// Identities and path parameters render without JSON quoting.
fn segment_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn expand_template(template: &str, record: &Record) -> Result<String, ApiError> {
    let mut path = String::new();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = record
            .get(name)
            .filter(|field| !field.is_null())
            .map(Field::to_value)
            .ok_or_else(|| ApiError::missing_field(name))?;

        path.push_str(&rest[..start]);
        path.push_str(&escape_segment(&segment_value(&value)));
        rest = &rest[start + len + 1..];
    }
    path.push_str(rest);

    Ok(path)
}
