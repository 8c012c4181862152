//! Defensive access to decoded frame payloads.
//!
//! The server's JSON is loosely typed: numbers sometimes arrive as strings,
//! optional fields are simply absent, and nested shapes vary per command.
//! [`FieldMap`] wraps the decoded object and exposes accessors where every
//! missing or mistyped field is a normal, named outcome.

use serde_json::{Map, Value};
use thiserror::Error;

/// A payload field could not be read as requested.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// A required field is absent from the payload.
    #[error("missing required field '{0}'")]
    Missing(String),

    /// The field exists but has an incompatible JSON type.
    #[error("field '{key}' is not a {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
    },
}

/// String-keyed view over one frame's JSON payload.
///
/// Also used to build outbound payloads: insertion order is preserved, so
/// encoded frames list fields in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    inner: Map<String, Value>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_object(inner: Map<String, Value>) -> Self {
        Self { inner }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Compact JSON rendering of the payload.
    pub fn to_json(&self) -> String {
        Value::Object(self.inner.clone()).to_string()
    }

    // -------------------------------------------------------------------------
    // Outbound construction
    // -------------------------------------------------------------------------

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.insert(key.into(), value.into());
    }

    /// Builder-style insert for outbound payloads.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    // -------------------------------------------------------------------------
    // Inbound access
    // -------------------------------------------------------------------------

    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Required string field.
    pub fn string(&self, key: &str) -> Result<&str, FieldError> {
        match self.inner.get(key) {
            None => Err(FieldError::Missing(key.to_string())),
            Some(value) => value.as_str().ok_or(FieldError::WrongType {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Optional string field; absence and wrong type both read as `None`.
    pub fn opt_string(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    /// Optional string field with a documented default.
    pub fn string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.opt_string(key).unwrap_or(default)
    }

    /// Required integer field. The server sends numbers both as JSON numbers
    /// and as numeric strings; both are accepted.
    pub fn int(&self, key: &str) -> Result<i64, FieldError> {
        let value = self
            .inner
            .get(key)
            .ok_or_else(|| FieldError::Missing(key.to_string()))?;
        match value {
            Value::Number(n) => n.as_i64().ok_or(FieldError::WrongType {
                key: key.to_string(),
                expected: "integer",
            }),
            Value::String(s) => s.parse::<i64>().map_err(|_| FieldError::WrongType {
                key: key.to_string(),
                expected: "integer",
            }),
            _ => Err(FieldError::WrongType {
                key: key.to_string(),
                expected: "integer",
            }),
        }
    }

    /// Required array field.
    pub fn list(&self, key: &str) -> Result<&Vec<Value>, FieldError> {
        match self.inner.get(key) {
            None => Err(FieldError::Missing(key.to_string())),
            Some(value) => value.as_array().ok_or(FieldError::WrongType {
                key: key.to_string(),
                expected: "array",
            }),
        }
    }

    /// Required array-of-strings field; non-string elements are skipped.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, FieldError> {
        Ok(self
            .list(key)?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    /// Required array-of-objects field; non-object elements are skipped.
    pub fn object_list(&self, key: &str) -> Result<Vec<FieldMap>, FieldError> {
        Ok(self
            .list(key)?
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| FieldMap::from_object(obj.clone()))
            .collect())
    }
}
