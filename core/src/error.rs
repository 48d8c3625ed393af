//! Error types for the content API client.
//!
//! # Design
//! Callers need to tell "the request never got an answer" apart from "the
//! server answered with a failure status", so those are separate variants.
//! `Api` carries the method, URL, status and raw body of the failed exchange
//! for diagnostics. Nothing in this crate retries; every error reaches the
//! caller unmodified.

use thiserror::Error;

use crate::http::HttpMethod;

/// Errors returned by the client, resources and collections.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request timed out or the network failed before any response.
    #[error("could not connect to {url} ({method}): {message}")]
    Connection {
        method: HttpMethod,
        url: String,
        message: String,
    },

    /// The login endpoint rejected the credentials.
    #[error("authentication failed with status {status}: {body}")]
    Authentication { status: u16, body: String },

    /// The server answered with a non-2xx status.
    #[error("got status code {status} in answer to a {method} request to {url}")]
    Api {
        status: u16,
        method: HttpMethod,
        url: String,
        body: String,
    },

    /// A field needed to build the request is absent or null.
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The response was valid JSON but not of the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ApiError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::Authentication { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Raw body of the failed response, if there was one.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Api { body, .. } | ApiError::Authentication { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, ApiError::Connection { .. })
    }
}
