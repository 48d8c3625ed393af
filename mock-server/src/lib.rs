//! In-memory stand-in for the content API.
//!
//! Serves token login, content projects and their things with the same URL
//! layout, pagination envelope and status codes as the real service, so
//! the client can be exercised end to end without network access.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const PROJECT_REQUIRED: &[&str] = &["name", "engine_configuration"];
pub const THING_REQUIRED: &[&str] = &["uid", "name"];

#[derive(Clone, Debug)]
pub struct Settings {
    pub page_size: usize,
    pub email: String,
    pub password: String,
    /// Token accepted without logging in.
    pub token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 10,
            email: "user@example.com".to_string(),
            password: "securepassword".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    settings: Settings,
    tokens: HashSet<String>,
    projects: BTreeMap<u64, Map<String, Value>>,
    things: BTreeMap<u64, Map<String, Value>>,
    next_id: u64,
}

impl Store {
    fn new(settings: Settings) -> Self {
        let mut tokens = HashSet::new();
        if let Some(token) = &settings.token {
            tokens.insert(token.clone());
        }
        Self {
            settings,
            tokens,
            next_id: 1,
            ..Self::default()
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Failure> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Token "));
        match token {
            Some(token) if self.tokens.contains(token) => Ok(()),
            Some(_) => Err(Failure::new(StatusCode::UNAUTHORIZED, "Invalid token.")),
            None => Err(Failure::new(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            )),
        }
    }

    fn project(&self, id: u64) -> Result<&Map<String, Value>, Failure> {
        self.projects.get(&id).ok_or_else(Failure::not_found)
    }

    fn thing(&self, project_id: u64, thing_id: u64) -> Result<&Map<String, Value>, Failure> {
        self.things
            .get(&thing_id)
            .filter(|thing| thing.get("content_project") == Some(&json!(project_id)))
            .ok_or_else(Failure::not_found)
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error answer in the `{"detail": ...}` shape the API uses.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    body: Value,
}

impl Failure {
    fn new(status: StatusCode, detail: &str) -> Self {
        Self {
            status,
            body: json!({ "detail": detail }),
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found.")
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

#[derive(Deserialize)]
pub struct GenerateQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn app() -> Router {
    app_with(Settings::default())
}

pub fn app_with(settings: Settings) -> Router {
    let db: Db = Arc::new(RwLock::new(Store::new(settings)));
    Router::new()
        .route("/v1/rest-auth/login/", post(login))
        .route("/v1/content-project/", get(list_projects).post(create_project))
        .route(
            "/v1/content-project/{id}/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route(
            "/v1/content-project/{id}/generate_content/",
            post(generate_project),
        )
        .route(
            "/v1/content-project/{id}/thing/",
            get(list_things).post(create_thing),
        )
        .route(
            "/v1/content-project/{id}/thing/{thing_id}/",
            get(get_thing).put(update_thing).delete(delete_thing),
        )
        .route(
            "/v1/content-project/{id}/thing/{thing_id}/generate_content/",
            post(generate_thing),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, Settings::default()).await
}

pub async fn run_with(listener: TcpListener, settings: Settings) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(settings)).await
}

async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    if input.email != store.settings.email || input.password != store.settings.password {
        return Err(Failure {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "non_field_errors": ["Unable to log in with provided credentials."] }),
        });
    }
    let key = Uuid::new_v4().simple().to_string();
    store.tokens.insert(key.clone());
    Ok(Json(json!({ "key": key })))
}

/// Checks the fields a create needs are present, non-null and non-empty.
fn require(data: &Map<String, Value>, fields: &[&str]) -> Result<(), Failure> {
    let errors: Map<String, Value> = fields
        .iter()
        .filter(|field| is_blank(data.get(**field)))
        .map(|field| (field.to_string(), json!(["This field is required."])))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Failure {
            status: StatusCode::BAD_REQUEST,
            body: Value::Object(errors),
        })
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// One page of `items` in the `{count, next, previous, results}` envelope.
fn paginate(
    items: Vec<Map<String, Value>>,
    page: Option<usize>,
    page_size: usize,
    path: &str,
) -> Result<Json<Value>, Failure> {
    let page = page.unwrap_or(1);
    let count = items.len();
    let start = page.saturating_sub(1) * page_size;
    if page == 0 || (start >= count && page > 1) {
        return Err(Failure::new(StatusCode::NOT_FOUND, "Invalid page."));
    }
    let results: Vec<Value> = items
        .into_iter()
        .skip(start)
        .take(page_size)
        .map(Value::Object)
        .collect();
    let next = (start + page_size < count).then(|| format!("{path}?page={}", page + 1));
    let previous = (page > 1).then(|| format!("{path}?page={}", page - 1));
    Ok(Json(json!({
        "count": count,
        "next": next,
        "previous": previous,
        "results": results,
    })))
}

async fn list_projects(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    store.authorize(&headers)?;
    let projects = store.projects.values().cloned().collect();
    paginate(projects, query.page, store.settings.page_size, "/v1/content-project/")
}

async fn create_project(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(mut input): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    require(&input, PROJECT_REQUIRED)?;

    let id = store.allocate_id();
    input.insert("id".to_string(), json!(id));
    input.entry("count_things").or_insert(json!(0));
    store.projects.insert(id, input.clone());
    Ok((StatusCode::CREATED, Json(Value::Object(input))))
}

async fn get_project(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    store.authorize(&headers)?;
    Ok(Json(Value::Object(store.project(id)?.clone())))
}

async fn update_project(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(mut input): Json<Map<String, Value>>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    store.project(id)?;
    input.insert("id".to_string(), json!(id));
    store.projects.insert(id, input.clone());
    Ok(Json(Value::Object(input)))
}

async fn delete_project(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    store.projects.remove(&id).ok_or_else(Failure::not_found)?;
    store
        .things
        .retain(|_, thing| thing.get("content_project") != Some(&json!(id)));
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_project(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    store.authorize(&headers)?;
    store.project(id)?;
    Ok(Json(json!({ "status": "queued", "force": query.force })))
}

async fn list_things(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    store.authorize(&headers)?;
    store.project(id)?;
    let things = store
        .things
        .values()
        .filter(|thing| thing.get("content_project") == Some(&json!(id)))
        .cloned()
        .collect();
    paginate(
        things,
        query.page,
        store.settings.page_size,
        &format!("/v1/content-project/{id}/thing/"),
    )
}

async fn create_thing(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(mut input): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    store.project(id)?;
    require(&input, THING_REQUIRED)?;

    let thing_id = store.allocate_id();
    input.insert("id".to_string(), json!(thing_id));
    input.insert("content_project".to_string(), json!(id));
    store.things.insert(thing_id, input.clone());
    if let Some(project) = store.projects.get_mut(&id) {
        let count = project.get("count_things").and_then(Value::as_u64).unwrap_or(0);
        project.insert("count_things".to_string(), json!(count + 1));
    }
    Ok((StatusCode::CREATED, Json(Value::Object(input))))
}

async fn get_thing(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, thing_id)): Path<(u64, u64)>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    store.authorize(&headers)?;
    Ok(Json(Value::Object(store.thing(id, thing_id)?.clone())))
}

async fn update_thing(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, thing_id)): Path<(u64, u64)>,
    Json(mut input): Json<Map<String, Value>>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    store.thing(id, thing_id)?;
    input.insert("id".to_string(), json!(thing_id));
    input.insert("content_project".to_string(), json!(id));
    store.things.insert(thing_id, input.clone());
    Ok(Json(Value::Object(input)))
}

async fn delete_thing(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, thing_id)): Path<(u64, u64)>,
) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    store.authorize(&headers)?;
    store.thing(id, thing_id)?;
    store.things.remove(&thing_id);
    if let Some(project) = store.projects.get_mut(&id) {
        let count = project.get("count_things").and_then(Value::as_u64).unwrap_or(1);
        project.insert("count_things".to_string(), json!(count.saturating_sub(1)));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_thing(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((id, thing_id)): Path<(u64, u64)>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    store.authorize(&headers)?;
    store.thing(id, thing_id)?;
    Ok(Json(json!({ "status": "queued", "force": query.force })))
}
