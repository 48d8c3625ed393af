//! Concrete API resources: content projects and the things inside them.

use serde_json::{Map, Value};

use crate::client::Client;
use crate::collection::Collection;
use crate::error::ApiError;
use crate::record::{Field, Record, ID_FIELD};
use crate::resource::{
    ContentGeneration, Createable, Deleteable, Listable, Resource, Updateable,
};

pub const CONTENT_PROJECT_TAG: &str = "content-project";
pub const THING_TAG: &str = "thing";

/// Field of a thing that names its owning content project.
pub const PROJECT_FIELD: &str = "content_project";

/// A content project: the container things are generated in.
#[derive(Debug, Clone)]
pub struct ContentProject {
    client: Client,
    record: Record,
}

impl ContentProject {
    /// An empty project, to be filled in and created.
    pub fn new(client: &Client) -> Self {
        Self::from_parts(client.clone(), Record::new())
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// All things of this project. The project must exist server-side.
    pub fn things(&self) -> Result<Collection, ApiError> {
        let id = self.id().ok_or_else(|| ApiError::missing_field(ID_FIELD))?;
        Thing::all_in(&self.client, id.clone())
    }

    /// A new, unsaved thing belonging to this project.
    pub fn new_thing(&self) -> Result<Thing, ApiError> {
        let id = self.id().ok_or_else(|| ApiError::missing_field(ID_FIELD))?;
        Ok(Thing::new(&self.client, id.clone()))
    }
}

impl Resource for ContentProject {
    const TYPE_TAG: &'static str = CONTENT_PROJECT_TAG;

    fn from_parts(client: Client, record: Record) -> Self {
        Self { client, record }
    }

    fn client(&self) -> &Client {
        &self.client
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}

impl Createable for ContentProject {
    const REQUIRED_FIELDS: &'static [&'static str] = &["name", "engine_configuration"];
}

impl Deleteable for ContentProject {}

impl Listable for ContentProject {}

impl ContentGeneration for ContentProject {}

/// One data object of a content project that text is generated for.
#[derive(Debug, Clone)]
pub struct Thing {
    client: Client,
    record: Record,
}

impl Thing {
    /// An empty thing in project `project_id`, to be filled in and created.
    pub fn new(client: &Client, project_id: impl Into<Value>) -> Self {
        let mut thing = Self::from_parts(client.clone(), Record::new());
        thing.set(PROJECT_FIELD, project_id);
        thing
    }

    pub fn project_id(&self) -> Option<&Value> {
        match self.record.get(PROJECT_FIELD) {
            Some(Field::Value(value)) if !value.is_null() => Some(value),
            _ => None,
        }
    }

    pub fn retrieve_in(
        client: &Client,
        project_id: impl Into<Value>,
        id: impl Into<Value>,
    ) -> Result<Self, ApiError> {
        Self::retrieve_with(client, id, project_params(project_id.into()))
    }

    pub fn all_in(client: &Client, project_id: impl Into<Value>) -> Result<Collection, ApiError> {
        Self::all_with(client, project_params(project_id.into()))
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

fn project_params(project_id: Value) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(PROJECT_FIELD.to_string(), project_id);
    params
}

impl Resource for Thing {
    const TYPE_TAG: &'static str = THING_TAG;
    const PATH_TEMPLATE: Option<&'static str> = Some("content-project/{content_project}/thing");

    fn from_parts(client: Client, record: Record) -> Self {
        Self { client, record }
    }

    fn client(&self) -> &Client {
        &self.client
    }

    fn record(&self) -> &Record {
        &self.record
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }
}

impl Createable for Thing {
    const REQUIRED_FIELDS: &'static [&'static str] = &["uid", "name", PROJECT_FIELD];
}

impl Updateable for Thing {}

impl Deleteable for Thing {}

impl Listable for Thing {}

impl ContentGeneration for Thing {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::config::ApiConfig;
    use crate::http::HttpMethod;
    use crate::object::ApiObject;
    use crate::test_support::ScriptedTransport;

    const BASE: &str = "http://localhost:3000";

    fn setup() -> (Arc<ScriptedTransport>, Client) {
        let transport = Arc::new(ScriptedTransport::default());
        let config = ApiConfig::new(BASE).with_token("t0ken");
        (transport.clone(), Client::with_transport(config, transport))
    }

    fn body(request: &crate::http::HttpRequest) -> Value {
        serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn create_project_posts_required_fields() {
        let (transport, client) = setup();
        transport.push(
            201,
            r#"{"id":42,"name":"X","engine_configuration":1,"count_things":0}"#,
        );

        let mut project = ContentProject::new(&client);
        project.set("name", "X");
        project.set("engine_configuration", 1);
        project.create().unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].url, format!("{BASE}/v1/content-project/"));
        assert_eq!(sent[0].header("authorization"), Some("Token t0ken"));
        assert_eq!(body(&sent[0]), json!({"name": "X", "engine_configuration": 1}));

        assert_eq!(project.id(), Some(&json!(42)));
        assert_eq!(project.record().dirty_fields().count(), 0);
        assert_eq!(project.get_value("count_things"), Some(json!(0)));
    }

    #[test]
    fn create_without_required_field_sends_nothing() {
        let (transport, client) = setup();
        let mut project = ContentProject::new(&client);
        project.set("name", "X");

        let err = project.create().unwrap_err();
        assert!(matches!(err, ApiError::MissingField { ref field } if field == "engine_configuration"));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn null_required_field_counts_as_missing() {
        let (_, client) = setup();
        let mut thing = Thing::new(&client, 4004);
        thing.set("uid", Value::Null);
        thing.set("name", "n");
        assert!(matches!(
            thing.create().unwrap_err(),
            ApiError::MissingField { .. }
        ));
    }

    #[test]
    fn retrieve_loads_clean_record() {
        let (transport, client) = setup();
        transport.push(200, r#"{"id":5,"name":"TV","engine_configuration":3}"#);

        let project = ContentProject::retrieve(&client, 5).unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].url, format!("{BASE}/v1/content-project/5/"));
        assert_eq!(
            project.record().to_value(),
            json!({"id": 5, "name": "TV", "engine_configuration": 3})
        );
        assert_eq!(project.record().dirty_fields().count(), 0);
    }

    #[test]
    fn retrieve_with_token_override() {
        let (transport, client) = setup();
        transport.push(200, r#"{"id":5}"#);

        ContentProject::retrieve(&client.with_token("other"), 5).unwrap();
        assert_eq!(transport.requests()[0].header("authorization"), Some("Token other"));
    }

    #[test]
    fn not_found_on_every_verb() {
        let (transport, client) = setup();
        let not_found = r#"{"detail":"Not found."}"#;
        for _ in 0..4 {
            transport.push(404, not_found);
        }

        let err = Thing::retrieve_in(&client, 1, 2).unwrap_err();
        assert_eq!((err.status(), err.body()), (Some(404), Some(not_found)));

        let mut thing = Thing::new(&client, 1);
        thing.set("uid", "u");
        thing.set("name", "n");
        let err = thing.create().unwrap_err();
        assert_eq!((err.status(), err.body()), (Some(404), Some(not_found)));

        thing.set("id", 2);
        let err = thing.save().unwrap_err();
        assert_eq!((err.status(), err.body()), (Some(404), Some(not_found)));

        let err = thing.delete().unwrap_err();
        assert_eq!((err.status(), err.body()), (Some(404), Some(not_found)));
    }

    #[test]
    fn create_thing_sends_diff_of_nested_data() {
        let (transport, client) = setup();
        transport.push(
            201,
            r#"{"id":7,"uid":"MP-1","name":"Shirt","content_project":4004,"pure_data":{"Size":"M"}}"#,
        );

        let mut thing = Thing::new(&client, 4004);
        thing.set("uid", "MP-1");
        thing.set("name", "Shirt");
        thing.set("pure_data", json!({"Size": "M"}));
        thing.create().unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].url, format!("{BASE}/v1/content-project/4004/thing/"));
        assert_eq!(
            body(&sent[0]),
            json!({"uid": "MP-1", "name": "Shirt", "content_project": 4004, "pure_data": {"Size": "M"}})
        );
        assert_eq!(thing.id(), Some(&json!(7)));
        assert_eq!(thing.project_id(), Some(&json!(4004)));
    }

    #[test]
    fn save_puts_full_state() {
        let (transport, client) = setup();
        transport.push(200, r#"{"id":7,"uid":"u","name":"new","content_project":1}"#);
        transport.push(200, r#"{"id":7,"uid":"u","name":"new","content_project":1}"#);

        let mut thing = Thing::retrieve_in(&client, 1, 7).unwrap();
        thing.set("name", "new");
        thing.save().unwrap();

        let sent = transport.requests();
        assert_eq!(sent[1].method, HttpMethod::Put);
        assert_eq!(sent[1].url, format!("{BASE}/v1/content-project/1/thing/7/"));
        assert_eq!(
            body(&sent[1]),
            json!({"id": 7, "uid": "u", "name": "new", "content_project": 1})
        );
        assert!(!thing.record().is_dirty("name"));
    }

    #[test]
    fn delete_leaves_a_tombstone() {
        let (transport, client) = setup();
        transport.push(200, r#"{"id":5,"name":"TV","engine_configuration":3}"#);
        transport.push(204, "");

        let mut project = ContentProject::retrieve(&client, 5).unwrap();
        project.delete().unwrap();

        let sent = transport.requests();
        assert_eq!(sent[1].method, HttpMethod::Delete);
        assert_eq!(sent[1].url, format!("{BASE}/v1/content-project/5/"));
        assert!(project.record().is_empty());
        assert!(project.id().is_none());
    }

    #[test]
    fn delete_twice_fails_without_a_request() {
        let (transport, client) = setup();
        transport.push(200, r#"{"id":5,"name":"TV","engine_configuration":3}"#);
        transport.push(204, "");

        let mut project = ContentProject::retrieve(&client, 5).unwrap();
        project.delete().unwrap();
        let err = project.delete().unwrap_err();

        assert!(matches!(err, ApiError::MissingField { ref field } if field == "id"));
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn instance_verbs_need_identity() {
        let (transport, client) = setup();

        let mut project = ContentProject::new(&client);
        assert!(matches!(project.delete(), Err(ApiError::MissingField { .. })));

        let mut thing = Thing::new(&client, 1);
        thing.set("uid", "u");
        assert!(matches!(thing.save(), Err(ApiError::MissingField { .. })));
        assert!(matches!(thing.delete(), Err(ApiError::MissingField { .. })));

        assert!(transport.requests().is_empty());
    }

    #[test]
    fn things_are_listed_under_the_project() {
        let (transport, client) = setup();
        transport.push(200, r#"{"id":5}"#);
        transport.push(
            200,
            r#"{"count":1,"next":null,"results":[{"id":1,"uid":"a","name":"A"}]}"#,
        );

        let project = ContentProject::retrieve(&client, 5).unwrap();
        let things: Vec<Thing> = project
            .things()
            .unwrap()
            .map(|item| item.unwrap().into_thing().unwrap())
            .collect();

        assert_eq!(things.len(), 1);
        assert_eq!(things[0].project_id(), Some(&json!(5)));
        assert_eq!(
            transport.requests()[1].url,
            format!("{BASE}/v1/content-project/5/thing/")
        );
    }

    #[test]
    fn things_of_unsaved_project_is_an_error() {
        let (_, client) = setup();
        let project = ContentProject::new(&client);
        assert!(matches!(
            project.things().unwrap_err(),
            ApiError::MissingField { .. }
        ));
        assert!(project.new_thing().is_err());
    }

    #[test]
    fn listing_things_needs_a_project() {
        let (_, client) = setup();
        assert!(Thing::all(&client).is_err());
        assert_eq!(
            Thing::all_in(&client, 3).unwrap().path(),
            "/v1/content-project/3/thing/"
        );
        assert_eq!(ContentProject::all(&client).unwrap().path(), "/v1/content-project/");
    }

    #[test]
    fn generate_content_posts_force_flag() {
        let (transport, client) = setup();
        transport.push(200, r#"{"id":5}"#);
        transport.push(200, r#"{"status":"queued"}"#);

        let project = ContentProject::retrieve(&client, 5).unwrap();
        let answer = project.generate_content(true).unwrap();

        let answer = answer.into_object().and_then(ApiObject::into_content_project).unwrap();
        assert_eq!(answer.get_value("status"), Some(json!("queued")));
        let sent = transport.requests();
        assert_eq!(sent[1].method, HttpMethod::Post);
        assert_eq!(
            sent[1].url,
            format!("{BASE}/v1/content-project/5/generate_content/?force=true")
        );
    }

    #[test]
    fn generate_content_needs_identity() {
        let (transport, client) = setup();
        let thing = Thing::new(&client, 1);
        assert!(thing.generate_content(false).is_err());
        assert!(transport.requests().is_empty());
    }
}
