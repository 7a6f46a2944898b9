//! Flat relational record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Field name to value mapping.
pub type FieldMap = serde_json::Map<String, Value>;

/// A flat record: field name to scalar (or list of scalars) value.
///
/// Records carry foreign keys as ordinary fields. Which field is the
/// primary key is decided by the model, not the record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(FieldMap);

impl Record {
    /// Create a record from a field map.
    pub fn new(fields: FieldMap) -> Self {
        Self(fields)
    }

    /// Create a record from a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidDocument {
                pointer: String::new(),
                message: format!("record must be a JSON object, got {}", other),
            }),
        }
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field value, returning the previous one.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Merge fields into this record, overwriting existing values.
    pub fn merge(&mut self, fields: FieldMap) {
        for (field, value) in fields {
            self.0.insert(field, value);
        }
    }

    /// Borrow the underlying field map.
    pub fn fields(&self) -> &FieldMap {
        &self.0
    }

    /// Consume the record, returning the field map.
    pub fn into_fields(self) -> FieldMap {
        self.0
    }

    /// Canonical string form of a key-like field, `None` if absent or null.
    pub fn key(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(key_string)
    }
}

impl From<FieldMap> for Record {
    fn from(fields: FieldMap) -> Self {
        Self(fields)
    }
}

/// Canonical string form of a key value.
///
/// Wire ids are strings while stored keys are often numbers; keys are
/// compared through this form so `1` and `"1"` address the same record.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Compare two key values by canonical form. Two nulls are equal.
pub fn keys_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        _ => match (key_string(a), key_string(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}
