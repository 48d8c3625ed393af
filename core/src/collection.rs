//! Lazy, forward-only iteration over a paginated list endpoint.
//!
//! # Design
//! List endpoints answer `{"count": n, "next": <url or null>, "results":
//! [...]}`. A `Collection` moves through three states:
//!
//! - `NotStarted`: nothing fetched; the first `next()` loads page 1.
//! - `HasPage`: items are handed out from the current page; when the page
//!   runs out and the last answer had a `next`, the following page is
//!   requested as `?page=N`.
//! - `Exhausted`: terminal. Reached when a page runs out without a `next`,
//!   or right after a request error has been yielded.
//!
//! Items go through the same dispatch as single responses and carry the
//! collection's path parameters (e.g. the owning project of a thing).

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::Client;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::object::ApiObject;

#[derive(Debug)]
enum State {
    NotStarted,
    HasPage { items: Vec<Value>, cursor: usize },
    Exhausted,
}

#[derive(Debug)]
pub struct Collection {
    client: Client,
    tag: &'static str,
    path: String,
    path_params: Map<String, Value>,
    next_page: Option<u32>,
    total: Option<u64>,
    state: State,
}

impl Collection {
    pub fn new(
        client: Client,
        tag: &'static str,
        path: String,
        path_params: Map<String, Value>,
    ) -> Self {
        Self {
            client,
            tag,
            path,
            path_params,
            next_page: None,
            total: None,
            state: State::NotStarted,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Item count reported by the server; known once a page was fetched.
    pub fn total_count(&self) -> Option<u64> {
        self.total
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, State::Exhausted)
    }

    /// Consumes items until one has every field in `filters` equal to the
    /// given value.
    pub fn find(&mut self, filters: &Map<String, Value>) -> Result<Option<ApiObject>, ApiError> {
        for item in self.by_ref() {
            let item = item?;
            let matched = filters
                .iter()
                .all(|(key, value)| item.record().get_value(key).as_ref() == Some(value));
            if matched {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    fn fetch(&mut self, page: u32) -> Result<(), ApiError> {
        let params = (page > 1).then(|| json!({ "page": page }));
        debug!(path = %self.path, page, "fetching page");
        let response = self
            .client
            .request(HttpMethod::Get, &self.path, params.as_ref(), &[])?;

        let Value::Object(mut body) = response else {
            return Err(ApiError::UnexpectedResponse(
                "list answer is not an object".to_string(),
            ));
        };
        let items = match body.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ApiError::UnexpectedResponse(
                    "list answer has no results".to_string(),
                ))
            }
        };
        let has_next = body.get("next").is_some_and(names_a_page);

        self.total = body.get("count").and_then(Value::as_u64);
        self.next_page = has_next.then_some(page + 1);
        self.state = State::HasPage { items, cursor: 0 };
        Ok(())
    }

    fn wrap(&self, item: Value) -> Result<ApiObject, ApiError> {
        match item {
            Value::Object(map) => Ok(ApiObject::from_map(
                &self.client,
                Some(self.tag),
                map,
                &self.path_params,
            )),
            other => Err(ApiError::UnexpectedResponse(format!(
                "list item is not an object: {other}"
            ))),
        }
    }
}

/// `next` continues the listing unless it is null, false, zero or empty.
fn names_a_page(next: &Value) -> bool {
    match next {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

impl Iterator for Collection {
    type Item = Result<ApiObject, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match &mut self.state {
                State::Exhausted => return None,
                State::NotStarted => None,
                State::HasPage { items, cursor } => match items.get_mut(*cursor) {
                    Some(item) => {
                        *cursor += 1;
                        Some(item.take())
                    }
                    None => None,
                },
            };
            if let Some(item) = item {
                return Some(self.wrap(item));
            }

            let page = match (&self.state, self.next_page) {
                (State::NotStarted, _) => 1,
                (_, Some(page)) => page,
                (_, None) => {
                    self.state = State::Exhausted;
                    return None;
                }
            };
            if let Err(e) = self.fetch(page) {
                self.state = State::Exhausted;
                return Some(Err(e));
            }
        }
    }
}
