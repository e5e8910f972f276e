//! Declarative, validated HTTP endpoint trees with a per-endpoint mock switch.
//!
//! # Overview
//! A [`Client`] is built from a base URL. Groups and endpoints are declared
//! beneath it, each with an [`EndpointConfig`] of validators for path params,
//! query, headers, body and per-status responses. Configs fold down the tree
//! so a group can require a header or declare a shared 401 once for every
//! endpoint below it.
//!
//! Calling an [`Endpoint`] validates the [`Request`], builds an
//! [`HttpRequest`], sends it through the [`Transport`], and validates the
//! [`Response`] against the schema registered for its status.
//!
//! # Design
//! - Request building and response interpretation are pure functions
//!   ([`build_request`], [`interpret`], [`validate`]); only the transport does
//!   I/O.
//! - Validators work on `serde_json::Value` at runtime. [`schema::typed`] and
//!   [`Response::json`] bridge to concrete serde types at the edges.
//! - [`Endpoint::mock`] swaps the transport for a handler on one endpoint;
//!   [`Client::unmock`] / [`Group::unmock`] restore a whole subtree.
//!
//! ```no_run
//! use endpoint_client::schema::{array, number, object, one_of, string};
//! use endpoint_client::{Client, EndpointConfig, Request, ResponseSchema};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder("http://localhost:3000").build()?;
//! let task = object()
//!     .field("id", number())
//!     .field("content", string())
//!     .field("status", one_of(["waiting", "doing", "done"]));
//! let tasks = client.group(
//!     "/tasks",
//!     EndpointConfig::new().headers(object().field("token", string())),
//! );
//! let list = tasks.get(
//!     "",
//!     EndpointConfig::new().response(200, ResponseSchema::new().body(array(task))),
//! );
//!
//! let res = list
//!     .invoke(Request::new().headers(json!({"token": "secret"})))
//!     .await?;
//! println!("{} tasks", res.body.as_array().map_or(0, Vec::len));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod path;
pub mod request;
pub mod response;
pub mod schema;
pub mod transport;

pub use client::{Client, ClientBuilder, Group};
pub use config::{EndpointConfig, ResponseSchema};
pub use endpoint::{Endpoint, EndpointState, MockHandler};
pub use error::{BoxError, ClientError, ConfigError, Location, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::{build_request, Prepared, Request};
pub use response::{interpret, validate, Response};
pub use schema::{ObjectSchema, SharedValidator, ValidationIssue, Validator};
pub use transport::{transport_fn, FnTransport, Transport};

#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
