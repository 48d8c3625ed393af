//! Request building, execution and response parsing for the content API.
//!
//! # Design
//! `Client` holds an `ApiConfig`, an optional token override and a shared
//! `Transport`. Every call is split the same way: `build_request` turns a
//! method, path and parameters into an `HttpRequest`, the transport runs it,
//! and `parse_response` turns the `HttpResponse` into JSON or an `ApiError`.
//! Both halves are pure, so they are tested without a network.
//!
//! Cloning a `Client` is cheap; resources keep their own clone.

use std::fmt;
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};

const USER_AGENT: &str = concat!("AXSemantics Rust Client/", env!("CARGO_PKG_VERSION"));

/// Characters left alone in query keys/values and path segments.
pub(crate) const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Clone)]
pub struct Client {
    config: ApiConfig,
    token: Option<String>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Client over a blocking `ureq` transport using `config.timeout`.
    pub fn new(config: ApiConfig) -> Self {
        let transport = Arc::new(UreqTransport::new(config.timeout));
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: ApiConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            token: None,
            transport,
        }
    }

    /// A clone that authenticates with `token` instead of the config default.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// The token requests are sent with: the override, else the default.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().or(self.config.token.as_deref())
    }

    pub fn api_version(&self) -> &str {
        &self.config.api_version
    }

    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Value>,
        user_headers: &[(String, String)],
    ) -> Result<HttpRequest, ApiError> {
        let mut url = format!("{}{}", self.config.api_base, path);
        let mut body = None;

        match params {
            Some(params) if method.uses_query() => {
                let query = encode_query(params);
                if !query.is_empty() {
                    url.push(if url.contains('?') { '&' } else { '?' });
                    url.push_str(&query);
                }
            }
            Some(params) => {
                let encoded = serde_json::to_string(params)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?;
                body = Some(encoded);
            }
            None => {}
        }

        let mut headers = vec![
            ("user-agent".to_string(), USER_AGENT.to_string()),
            ("content-type".to_string(), "application/json".to_string()),
        ];
        if let Some(token) = self.token() {
            headers.push(("authorization".to_string(), format!("Token {token}")));
        }
        for (key, value) in user_headers {
            match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
                Some(existing) => existing.1 = value.clone(),
                None => headers.push((key.clone(), value.clone())),
            }
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// 2xx bodies decode to JSON (an empty body is `null`); anything else
    /// becomes `ApiError::Api` carrying the request and the raw body.
    pub fn parse_response(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<Value, ApiError> {
        if !response.is_success() {
            warn!(
                status = response.status,
                method = %request.method,
                url = %request.url,
                body = %response.body,
                "unexpected response status"
            );
            return Err(ApiError::Api {
                status: response.status,
                method: request.method,
                url: request.url.clone(),
                body: response.body,
            });
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// One at-most-once round-trip.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Value, ApiError> {
        let request = self.build_request(method, path, params, headers)?;
        debug!(method = %request.method, url = %request.url, "api request");
        let response = self.transport.execute(&request)?;
        self.parse_response(&request, response)
    }

    /// Exchanges credentials for a token and makes it this client's default.
    ///
    /// A 400 from the login endpoint is reported as
    /// `ApiError::Authentication`; other failures pass through.
    pub fn login(&mut self, email: &str, password: &str) -> Result<String, ApiError> {
        let path = format!("/{}/rest-auth/login/", self.config.api_version);
        let params = json!({ "email": email, "password": password });

        let response = match self.request(HttpMethod::Post, &path, Some(&params), &[]) {
            Ok(response) => response,
            Err(ApiError::Api {
                status: 400, body, ..
            }) => return Err(ApiError::Authentication { status: 400, body }),
            Err(e) => return Err(e),
        };

        let key = response
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::UnexpectedResponse("login answer has no key".to_string()))?
            .to_string();
        info!(email, "received authentication token");
        self.config.token = Some(key.clone());
        Ok(key)
    }
}

/// Encodes an object as `k=v&k=v`; an array of objects joins each with `&`.
pub fn encode_query(params: &Value) -> String {
    match params {
        Value::Object(map) => encode_map(map),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(encode_map)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("&"),
        _ => String::new(),
    }
}

fn encode_map(map: &Map<String, Value>) -> String {
    map.iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, UNRESERVED),
                utf8_percent_encode(&query_value(value), UNRESERVED)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;

    fn client() -> Client {
        Client::with_transport(
            ApiConfig::new("http://localhost:3000"),
            Arc::new(ScriptedTransport::default()),
        )
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn get_params_go_into_the_query_string() {
        let req = client()
            .build_request(
                HttpMethod::Get,
                "/v1/content-project/",
                Some(&json!({"page": 2, "search": "a b"})),
                &[],
            )
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/content-project/?page=2&search=a%20b");
        assert!(req.body.is_none());
    }

    #[test]
    fn query_is_appended_to_an_existing_one() {
        let req = client()
            .build_request(
                HttpMethod::Delete,
                "/v1/thing/?force=true",
                Some(&json!({"page": 1})),
                &[],
            )
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/thing/?force=true&page=1");
    }

    #[test]
    fn list_of_maps_is_joined() {
        let query = encode_query(&json!([{"a": 1}, {"b": "x"}]));
        assert_eq!(query, "a=1&b=x");
    }

    #[test]
    fn post_params_become_json_body() {
        let req = client()
            .build_request(
                HttpMethod::Post,
                "/v1/content-project/",
                Some(&json!({"name": "X", "engine_configuration": 1})),
                &[],
            )
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1/content-project/");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "X", "engine_configuration": 1}));
    }

    #[test]
    fn no_token_means_no_authorization_header() {
        let req = client()
            .build_request(HttpMethod::Get, "/v1/thing/", None, &[])
            .unwrap();
        assert_eq!(req.header("authorization"), None);
        assert!(req.header("user-agent").unwrap().starts_with("AXSemantics Rust Client/"));
    }

    #[test]
    fn token_override_beats_default() {
        let config = ApiConfig::new("http://localhost:3000").with_token("default");
        let base = Client::with_transport(config, Arc::new(ScriptedTransport::default()));

        let req = base.build_request(HttpMethod::Get, "/v1/thing/", None, &[]).unwrap();
        assert_eq!(req.header("authorization"), Some("Token default"));

        let req = base
            .with_token("override")
            .build_request(HttpMethod::Get, "/v1/thing/", None, &[])
            .unwrap();
        assert_eq!(req.header("authorization"), Some("Token override"));
    }

    #[test]
    fn user_headers_replace_defaults() {
        let req = client()
            .build_request(
                HttpMethod::Get,
                "/v1/thing/",
                None,
                &[("Content-Type".to_string(), "text/plain".to_string())],
            )
            .unwrap();
        assert_eq!(req.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn parse_success_and_empty_body() {
        let c = client();
        let req = c.build_request(HttpMethod::Get, "/v1/thing/", None, &[]).unwrap();
        let value = c.parse_response(&req, response(200, r#"{"id":1}"#)).unwrap();
        assert_eq!(value, json!({"id": 1}));
        let value = c.parse_response(&req, response(204, "")).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn parse_not_found_carries_status_and_body() {
        let c = client();
        let req = c.build_request(HttpMethod::Get, "/v1/thing/9/", None, &[]).unwrap();
        let err = c
            .parse_response(&req, response(404, r#"{"detail":"Not found."}"#))
            .unwrap_err();
        match err {
            ApiError::Api {
                status,
                method,
                url,
                body,
            } => {
                assert_eq!(status, 404);
                assert_eq!(method, HttpMethod::Get);
                assert_eq!(url, "http://localhost:3000/v1/thing/9/");
                assert_eq!(body, r#"{"detail":"Not found."}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_bad_json() {
        let c = client();
        let req = c.build_request(HttpMethod::Get, "/v1/thing/", None, &[]).unwrap();
        let err = c.parse_response(&req, response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn login_stores_token() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(200, r#"{"key":"secret-key"}"#);
        let mut c = Client::with_transport(ApiConfig::new("http://localhost:3000"), transport.clone());

        let key = c.login("user@example.com", "pw").unwrap();
        assert_eq!(key, "secret-key");
        assert_eq!(c.token(), Some("secret-key"));

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].url, "http://localhost:3000/v1/rest-auth/login/");
    }

    #[test]
    fn login_bad_request_is_authentication_error() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(400, r#"{"non_field_errors":["Unable to log in."]}"#);
        let mut c = Client::with_transport(ApiConfig::new("http://localhost:3000"), transport);

        let err = c.login("user@example.com", "wrong").unwrap_err();
        assert!(matches!(err, ApiError::Authentication { status: 400, .. }));
        assert_eq!(c.token(), None);
    }

    #[test]
    fn login_server_error_passes_through() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(500, "boom");
        let mut c = Client::with_transport(ApiConfig::new("http://localhost:3000"), transport);

        let err = c.login("user@example.com", "pw").unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 500, .. }));
    }
}
