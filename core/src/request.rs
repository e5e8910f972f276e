//! Request validation and transport-request construction.
//!
//! # Design
//! [`build_request`] is pure: it validates the caller's [`Request`] against
//! the endpoint's config and produces both the validated logical request
//! (what a mock handler sees) and the [`HttpRequest`] a transport sends.
//! Dispatch is the endpoint's job.
//!
//! Slots are checked in a fixed order (params, query, headers, body) and the
//! first failure is returned. Parsed values, not raw inputs, flow into the
//! URL, headers and body, so validator transforms are observable on the wire.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::config::EndpointConfig;
use crate::error::{Location, ValidationError};
use crate::http::{HttpMethod, HttpRequest};
use crate::path;
use crate::schema::{kind, ValidationIssue, Validator};

const JSON: &str = "application/json";
const FIXED_HEADERS: [&str; 2] = ["accept", "content-type"];

/// The logical call made by a caller. Every slot is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub params: Option<Value>,
    pub query: Option<Value>,
    pub headers: Option<Value>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn headers(mut self, headers: Value) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Output of [`build_request`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    /// The request with every configured slot replaced by its parsed value.
    pub request: Request,
    pub http: HttpRequest,
}

/// Validate `req` against `config` and build the request for `url_template`.
///
/// # Errors
/// Returns the first [`ValidationError`] in slot order. Params, query and
/// headers must also resolve to an object of scalars.
pub fn build_request(
    config: &EndpointConfig,
    method: HttpMethod,
    url_template: &str,
    req: Request,
) -> Result<Prepared, ValidationError> {
    let params = check(
        config.params.as_ref().map(|s| s as &dyn Validator),
        req.params,
        Location::Params,
    )?;
    let path_params = scalar_map(params.as_ref(), Location::Params)?;
    let query = check(
        config.query.as_ref().map(|s| s as &dyn Validator),
        req.query,
        Location::Query,
    )?;
    let query_pairs = scalar_map(query.as_ref(), Location::Query)?;
    let headers = check(
        config.headers.as_ref().map(|s| s as &dyn Validator),
        req.headers,
        Location::Headers,
    )?;
    let header_pairs = scalar_map(headers.as_ref(), Location::Headers)?;
    let body = check(config.body.as_deref(), req.body, Location::Body)?;

    let mut url = path::substitute(url_template, &path_params);
    if !query_pairs.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&query_pairs)
            .finish();
        url.push('?');
        url.push_str(&encoded);
    }

    let mut http_headers: Vec<(String, String)> = header_pairs
        .into_iter()
        .filter(|(name, _)| !FIXED_HEADERS.iter().any(|f| name.eq_ignore_ascii_case(f)))
        .collect();
    for name in FIXED_HEADERS {
        http_headers.push((name.to_string(), JSON.to_string()));
    }

    let http = HttpRequest {
        method,
        url,
        headers: http_headers,
        body: body.as_ref().filter(|b| !b.is_null()).map(Value::to_string),
    };

    Ok(Prepared {
        request: Request {
            params,
            query,
            headers,
            body,
        },
        http,
    })
}

fn check(
    validator: Option<&dyn Validator>,
    input: Option<Value>,
    location: Location,
) -> Result<Option<Value>, ValidationError> {
    let Some(validator) = validator else {
        return Ok(input);
    };
    validator
        .parse(input.as_ref().unwrap_or(&Value::Null))
        .map(Some)
        .map_err(|issue| ValidationError::new(location, issue))
}

/// Flatten an object of scalars into strings. `null` members are skipped.
fn scalar_map(
    value: Option<&Value>,
    location: Location,
) -> Result<BTreeMap<String, String>, ValidationError> {
    let mut out = BTreeMap::new();
    let object = match value {
        None | Some(Value::Null) => return Ok(out),
        Some(Value::Object(map)) => map,
        Some(other) => {
            let issue = ValidationIssue::new(format!("expected object, got {}", kind(other)));
            return Err(ValidationError::new(location, issue));
        }
    };

    for (name, value) in object {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => continue,
            other => {
                let issue = ValidationIssue::new(format!(
                    "expected string, number or boolean, got {}",
                    kind(other)
                ))
                .at(name.as_str());
                return Err(ValidationError::new(location, issue));
            }
        };
        out.insert(name.clone(), text);
    }
    Ok(out)
}
