//! Blocking client for the AX Semantics content-generation API.
//!
//! # Overview
//! API resources are dictionary-like records with dirty tracking. Content
//! projects and things support the CRUD verbs their endpoints offer, list
//! endpoints are walked lazily page by page, and partial updates are sent
//! as diffs against the last loaded state.
//!
//! # Design
//! - `Client` builds `HttpRequest`s and parses `HttpResponse`s; a
//!   `Transport` does the I/O in between (`UreqTransport` by default).
//! - `Record` holds fields, the dirty set and the last-loaded snapshot.
//! - `Resource` plus one capability trait per verb (`Createable`,
//!   `Updateable`, `Deleteable`, `Listable`, `ContentGeneration`).
//! - `ApiObject` dispatches decoded responses on their type tag.
//! - `Collection` is a forward-only iterator over a paginated list.
//! - No globals: configuration travels in `ApiConfig` inside the `Client`.
//!
//! ```no_run
//! use axsemantics_core::{ApiConfig, Client, ContentProject, Createable, Resource};
//!
//! # fn main() -> Result<(), axsemantics_core::ApiError> {
//! let mut client = Client::new(ApiConfig::from_env());
//! client.login("user@example.com", "securepassword")?;
//!
//! let mut project = ContentProject::new(&client);
//! project.set("name", "TV sets");
//! project.set("engine_configuration", 1);
//! project.create()?;
//!
//! for thing in project.things()? {
//!     println!("{:?}", thing?.record().get_value("uid"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod http;
pub mod object;
pub mod record;
pub mod resource;
pub mod resources;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use collection::Collection;
pub use config::ApiConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use object::{ApiObject, ApiValue};
pub use record::{diff_value, Field, Record};
pub use resource::{
    ContentGeneration, Createable, Deleteable, Listable, Resource, Updateable,
};
pub use resources::{ContentProject, Thing};
