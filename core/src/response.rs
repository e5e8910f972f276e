//! Transport-response interpretation and status-keyed validation.
//!
//! # Design
//! [`interpret`] turns raw transport output into a [`Response`]; [`validate`]
//! checks it against the schema registered for its status. They are separate
//! steps because mocked endpoints skip both: a mock handler already returns a
//! logical `Response`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::EndpointConfig;
use crate::error::{ClientError, Location, ValidationError};
use crate::http::HttpResponse;
use crate::schema::{kind, ValidationIssue, Validator};

/// The logical result of a call.
///
/// Headers are a JSON object so header validators can transform them; as
/// produced by [`interpret`] every value is a string and every name lowercase.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Map<String, Value>,
    pub body: Value,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Map::new(),
            body: Value::Null,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// A string header value by exact name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(Value::as_str)
    }

    /// Deserialize the body into a caller type.
    ///
    /// # Errors
    /// Fails when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Read status, flatten headers and parse the body as JSON.
///
/// Header names are lowercased and repeated headers joined with `", "`. An
/// empty body becomes `null`.
///
/// # Errors
/// [`ClientError::Decode`] when a non-empty body is not JSON.
pub fn interpret(raw: HttpResponse) -> Result<Response, ClientError> {
    let mut headers = Map::new();
    for (name, value) in raw.headers {
        let name = name.to_ascii_lowercase();
        match headers.get_mut(&name) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            _ => {
                headers.insert(name, Value::String(value));
            }
        }
    }

    let body = if raw.body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&raw.body).map_err(ClientError::Decode)?
    };

    Ok(Response {
        status: raw.status,
        headers,
        body,
    })
}

/// Check `res` against the schema registered for its status.
///
/// An empty `responses` map accepts any status unchecked. Otherwise the
/// status must be declared, and its headers/body validators (when present)
/// replace the values with their parsed form.
///
/// # Errors
/// [`ClientError::UnknownStatus`] for an undeclared status,
/// [`ClientError::Validation`] when headers or body do not conform.
pub fn validate(config: &EndpointConfig, res: Response) -> Result<Response, ClientError> {
    if config.responses.is_empty() {
        return Ok(res);
    }
    let Some(schema) = config.responses.get(&res.status) else {
        return Err(ClientError::UnknownStatus {
            status: res.status,
            response: Box::new(res),
        });
    };

    let status = res.status;
    let headers = match &schema.headers {
        Some(validator) => {
            let location = Location::ResponseHeaders { status };
            let parsed = validator
                .parse(&Value::Object(res.headers))
                .map_err(|issue| ValidationError::new(location, issue))?;
            match parsed {
                Value::Object(map) => map,
                other => {
                    let issue =
                        ValidationIssue::new(format!("expected object, got {}", kind(&other)));
                    return Err(ValidationError::new(location, issue).into());
                }
            }
        }
        None => res.headers,
    };
    let body = match &schema.body {
        Some(validator) => validator
            .parse(&res.body)
            .map_err(|issue| ValidationError::new(Location::ResponseBody { status }, issue))?,
        None => res.body,
    };

    Ok(Response {
        status,
        headers,
        body,
    })
}
