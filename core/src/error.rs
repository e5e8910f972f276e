//! Error types for client construction and endpoint calls.
//!
//! # Design
//! Construction problems ([`ConfigError`]) are separate from call failures
//! ([`ClientError`]) because they happen at different times: a client that
//! built successfully never reports a `ConfigError` again.
//!
//! Request-side and response-side validation share [`ValidationError`]; the
//! [`Location`] says which slot failed. An unrecognized status gets its own
//! variant because statuses are an enumerated error surface, not a schema
//! mismatch. Transport and mock-handler errors are carried transparently so
//! callers can downcast to the original type.

use std::fmt;

use crate::response::Response;
use crate::schema::ValidationIssue;

/// Boxed error returned by transports and mock handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building a [`Client`](crate::Client).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No transport was supplied and no default transport is compiled in.
    #[error("no transport configured; supply one with ClientBuilder::transport or enable the `ureq` feature")]
    MissingTransport,

    /// The base URL is not an absolute URL.
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// The request or response slot a validator rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Params,
    Query,
    Headers,
    Body,
    ResponseHeaders { status: u16 },
    ResponseBody { status: u16 },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Params => write!(f, "params"),
            Location::Query => write!(f, "query"),
            Location::Headers => write!(f, "headers"),
            Location::Body => write!(f, "body"),
            Location::ResponseHeaders { status } => write!(f, "response headers ({status})"),
            Location::ResponseBody { status } => write!(f, "response body ({status})"),
        }
    }
}

/// A slot's value failed its validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {location}: {issue}")]
pub struct ValidationError {
    pub location: Location,
    #[source]
    pub issue: ValidationIssue,
}

impl ValidationError {
    pub fn new(location: Location, issue: ValidationIssue) -> Self {
        Self { location, issue }
    }
}

/// Errors returned by [`Endpoint::invoke`](crate::Endpoint::invoke).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server answered with a status the endpoint declares no schema for.
    #[error("unexpected response status {status}")]
    UnknownStatus {
        status: u16,
        response: Box<Response>,
    },

    /// The response body was not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(BoxError),

    #[error(transparent)]
    Handler(BoxError),
}

impl ClientError {
    /// The validation failure, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ClientError::Validation(e) => Some(e),
            _ => None,
        }
    }

    /// The status code of an unrecognized response, if this is one.
    pub fn unknown_status(&self) -> Option<u16> {
        match self {
            ClientError::UnknownStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
