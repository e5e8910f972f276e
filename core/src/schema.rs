//! Runtime validators over `serde_json::Value`.
//!
//! # Design
//! Every request and response slot is checked by a [`Validator`]: parse an
//! arbitrary JSON value, return the (possibly transformed) value or a
//! [`ValidationIssue`]. The three request slots whose schemas are unioned
//! across nesting levels (path params, query, headers) use [`ObjectSchema`]
//! because a union needs to see named fields. Body and response slots accept
//! any validator.
//!
//! The built-ins cover the shapes an HTTP API actually needs. Anything else
//! goes through [`from_fn`] or [`typed`], the latter round-tripping through a
//! serde type so `#[serde(default)]` and friends act as transforms.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// A validator shared between a node and every descendant that inherits it.
pub type SharedValidator = Arc<dyn Validator>;

/// Parse-or-fail capability consumed by the request and response pipelines.
///
/// Implementations must be deterministic and free of side effects.
pub trait Validator: Send + Sync {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue>;
}

impl<V: Validator + ?Sized> Validator for Arc<V> {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        (**self).parse(input)
    }
}

/// Wrap a validator for storage in an [`EndpointConfig`](crate::EndpointConfig).
pub fn shared<V: Validator + 'static>(validator: V) -> SharedValidator {
    Arc::new(validator)
}

/// Diagnostic produced when a value does not conform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location of the offending value inside the input, outermost first.
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    /// Prefix the issue's path with an enclosing field or index.
    pub fn at(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path.join("."), self.message)
        }
    }
}

impl std::error::Error for ValidationIssue {}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expected(what: &str, got: &Value) -> ValidationIssue {
    ValidationIssue::new(format!("expected {what}, got {}", kind(got)))
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Accepts strings, optionally trimming and rejecting empties.
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    trim: bool,
    non_empty: bool,
}

pub fn string() -> StringSchema {
    StringSchema::default()
}

impl StringSchema {
    /// Strip leading and trailing whitespace from the parsed value.
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    /// Reject the empty string (checked after trimming).
    pub fn non_empty(mut self) -> Self {
        self.non_empty = true;
        self
    }
}

impl Validator for StringSchema {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        let Value::String(s) = input else {
            return Err(expected("string", input));
        };
        let s = if self.trim { s.trim() } else { s.as_str() };
        if self.non_empty && s.is_empty() {
            return Err(ValidationIssue::new("must not be empty"));
        }
        Ok(Value::String(s.to_string()))
    }
}

/// Accepts JSON numbers; with `coerce()` also numeric strings, which is what
/// path params and query values usually arrive as.
#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    integer: bool,
    coerce: bool,
}

pub fn number() -> NumberSchema {
    NumberSchema::default()
}

impl NumberSchema {
    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }
}

impl Validator for NumberSchema {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        let n = match input {
            Value::Number(n) => n.clone(),
            Value::String(s) if self.coerce => s
                .trim()
                .parse::<Number>()
                .map_err(|_| ValidationIssue::new(format!("{s:?} is not a number")))?,
            other => return Err(expected("number", other)),
        };
        if self.integer && !(n.is_i64() || n.is_u64()) {
            return Err(ValidationIssue::new(format!("expected integer, got {n}")));
        }
        Ok(Value::Number(n))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BooleanSchema;

pub fn boolean() -> BooleanSchema {
    BooleanSchema
}

impl Validator for BooleanSchema {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        match input {
            Value::Bool(_) => Ok(input.clone()),
            other => Err(expected("boolean", other)),
        }
    }
}

/// Accepts anything unchanged.
#[derive(Debug, Clone, Default)]
pub struct AnySchema;

pub fn any() -> AnySchema {
    AnySchema
}

impl Validator for AnySchema {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        Ok(input.clone())
    }
}

/// Accepts exactly one of a fixed set of literal values.
#[derive(Debug, Clone)]
pub struct OneOfSchema {
    allowed: Vec<Value>,
}

pub fn one_of<I, V>(values: I) -> OneOfSchema
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    OneOfSchema {
        allowed: values.into_iter().map(Into::into).collect(),
    }
}

impl Validator for OneOfSchema {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        if self.allowed.contains(input) {
            return Ok(input.clone());
        }
        let allowed: Vec<String> = self.allowed.iter().map(Value::to_string).collect();
        Err(ValidationIssue::new(format!(
            "expected one of [{}], got {input}",
            allowed.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// Accepts an array whose every element passes `item`.
#[derive(Clone)]
pub struct ArraySchema {
    item: SharedValidator,
}

pub fn array(item: impl Validator + 'static) -> ArraySchema {
    ArraySchema {
        item: shared(item),
    }
}

impl Validator for ArraySchema {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        let Value::Array(items) = input else {
            return Err(expected("array", input));
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.item.parse(item).map_err(|e| e.at(i.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

/// Accepts `null` as well as whatever `inner` accepts.
#[derive(Clone)]
pub struct OptionalSchema {
    inner: SharedValidator,
}

pub fn optional(inner: impl Validator + 'static) -> OptionalSchema {
    OptionalSchema {
        inner: shared(inner),
    }
}

impl Validator for OptionalSchema {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        match input {
            Value::Null => Ok(Value::Null),
            other => self.inner.parse(other),
        }
    }
}

/// Validator backed by a closure.
pub struct FnValidator<F> {
    f: F,
}

pub fn from_fn<F>(f: F) -> FnValidator<F>
where
    F: Fn(&Value) -> Result<Value, ValidationIssue> + Send + Sync,
{
    FnValidator { f }
}

impl<F> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Result<Value, ValidationIssue> + Send + Sync,
{
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        (self.f)(input)
    }
}

/// Validates by deserializing into `T` and serializing back.
pub struct TypedSchema<T> {
    _marker: PhantomData<fn() -> T>,
}

pub fn typed<T>() -> TypedSchema<T>
where
    T: DeserializeOwned + Serialize,
{
    TypedSchema {
        _marker: PhantomData,
    }
}

impl<T> Validator for TypedSchema<T>
where
    T: DeserializeOwned + Serialize,
{
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        let value: T = serde_json::from_value(input.clone())
            .map_err(|e| ValidationIssue::new(e.to_string()))?;
        serde_json::to_value(&value).map_err(|e| ValidationIssue::new(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ObjectSchema
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Presence {
    Required,
    Optional,
    Default(Value),
}

#[derive(Clone)]
struct Field {
    validator: SharedValidator,
    presence: Presence,
}

/// Named-field validator; the only schema the unionable slots accept.
///
/// Unknown keys are dropped from the parsed value unless
/// [`passthrough`](ObjectSchema::passthrough) is set. A `null` input is
/// treated as `{}` so a missing slot reports its first missing field.
#[derive(Clone, Default)]
pub struct ObjectSchema {
    fields: BTreeMap<String, Field>,
    passthrough: bool,
}

pub fn object() -> ObjectSchema {
    ObjectSchema::default()
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(self, name: impl Into<String>, validator: impl Validator + 'static) -> Self {
        self.with(name, validator, Presence::Required)
    }

    /// A field that may be absent; absent fields are left out of the output.
    pub fn optional_field(
        self,
        name: impl Into<String>,
        validator: impl Validator + 'static,
    ) -> Self {
        self.with(name, validator, Presence::Optional)
    }

    /// A field filled with `default` (then validated) when absent.
    pub fn default_field(
        self,
        name: impl Into<String>,
        default: impl Into<Value>,
        validator: impl Validator + 'static,
    ) -> Self {
        self.with(name, validator, Presence::Default(default.into()))
    }

    /// Keep keys that no field declares instead of stripping them.
    pub fn passthrough(mut self) -> Self {
        self.passthrough = true;
        self
    }

    fn with(
        mut self,
        name: impl Into<String>,
        validator: impl Validator + 'static,
        presence: Presence,
    ) -> Self {
        self.fields.insert(
            name.into(),
            Field {
                validator: shared(validator),
                presence,
            },
        );
        self
    }

    /// Field union of `self` and `child`. The child's definition wins on a
    /// name collision, and its unknown-key policy is the one kept.
    pub fn extend(&self, child: &ObjectSchema) -> ObjectSchema {
        let mut fields = self.fields.clone();
        fields.extend(child.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        ObjectSchema {
            fields,
            passthrough: child.passthrough,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

impl fmt::Debug for ObjectSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSchema")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("passthrough", &self.passthrough)
            .finish()
    }
}

impl Validator for ObjectSchema {
    fn parse(&self, input: &Value) -> Result<Value, ValidationIssue> {
        let empty = Map::new();
        let object = match input {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => return Err(expected("object", other)),
        };

        let mut out = Map::new();
        for (name, field) in &self.fields {
            let parsed = match (object.get(name), &field.presence) {
                (Some(value), _) => field.validator.parse(value),
                (None, Presence::Required) => Err(ValidationIssue::new("required")),
                (None, Presence::Optional) => continue,
                (None, Presence::Default(value)) => field.validator.parse(value),
            };
            out.insert(name.clone(), parsed.map_err(|e| e.at(name.as_str()))?);
        }

        if self.passthrough {
            for (name, value) in object {
                if !self.fields.contains_key(name) {
                    out.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(Value::Object(out))
    }
}
