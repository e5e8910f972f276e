//! Declarative endpoint configuration and the parent/child merge.
//!
//! # Design
//! Every node in the client tree carries one [`EndpointConfig`]. When a child
//! is declared, the parent's (already folded) config is merged into the
//! child's with [`EndpointConfig::merge`], once per nesting level:
//!
//! | Slot | Merge |
//! |------|-------|
//! | `params`, `headers`, `query` | field union, child field wins |
//! | `body` | child replaces parent |
//! | `responses` | per status code, child entry replaces parent entry whole |
//!
//! Response entries are replaced rather than deep-merged so a group can
//! declare shared error statuses (401, 500) while an endpoint fully owns the
//! shape of any status it redeclares.

use std::collections::BTreeMap;
use std::fmt;

use crate::schema::{shared, ObjectSchema, SharedValidator, Validator};

/// Validators for one response status.
#[derive(Clone, Default)]
pub struct ResponseSchema {
    pub headers: Option<SharedValidator>,
    pub body: Option<SharedValidator>,
}

impl ResponseSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(mut self, validator: impl Validator + 'static) -> Self {
        self.headers = Some(shared(validator));
        self
    }

    pub fn body(mut self, validator: impl Validator + 'static) -> Self {
        self.body = Some(shared(validator));
        self
    }
}

impl fmt::Debug for ResponseSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSchema")
            .field("headers", &self.headers.is_some())
            .field("body", &self.body.is_some())
            .finish()
    }
}

/// Validators governing one group's or endpoint's requests and responses.
///
/// A config without validators is legal and passes every slot through as
/// given. An empty `responses` map accepts any status.
#[derive(Clone, Default)]
pub struct EndpointConfig {
    pub params: Option<ObjectSchema>,
    pub headers: Option<ObjectSchema>,
    pub query: Option<ObjectSchema>,
    pub body: Option<SharedValidator>,
    pub responses: BTreeMap<u16, ResponseSchema>,
}

impl EndpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, schema: ObjectSchema) -> Self {
        self.params = Some(schema);
        self
    }

    pub fn headers(mut self, schema: ObjectSchema) -> Self {
        self.headers = Some(schema);
        self
    }

    pub fn query(mut self, schema: ObjectSchema) -> Self {
        self.query = Some(schema);
        self
    }

    pub fn body(mut self, validator: impl Validator + 'static) -> Self {
        self.body = Some(shared(validator));
        self
    }

    /// Declare (or replace) the schema for one status code.
    pub fn response(mut self, status: u16, schema: ResponseSchema) -> Self {
        self.responses.insert(status, schema);
        self
    }

    /// Fold `self` (the parent) into `child`.
    pub fn merge(&self, child: &EndpointConfig) -> EndpointConfig {
        let mut responses = self.responses.clone();
        responses.extend(child.responses.iter().map(|(k, v)| (*k, v.clone())));

        EndpointConfig {
            params: union(&self.params, &child.params),
            headers: union(&self.headers, &child.headers),
            query: union(&self.query, &child.query),
            body: child.body.clone().or_else(|| self.body.clone()),
            responses,
        }
    }
}

fn union(parent: &Option<ObjectSchema>, child: &Option<ObjectSchema>) -> Option<ObjectSchema> {
    match (parent, child) {
        (Some(p), Some(c)) => Some(p.extend(c)),
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) => None,
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("body", &self.body.is_some())
            .field("responses", &self.responses)
            .finish()
    }
}
