//! Normalized model definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RelationDescriptor;
use crate::document::IncludeChain;

/// Storage type of a model's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    /// Numeric keys; wire ids must parse as integers.
    #[default]
    Integer,
    /// Opaque string keys.
    String,
}

impl IdType {
    /// Convert a wire id to a stored key value.
    ///
    /// Returns `None` if an integer model receives a non-numeric id.
    pub fn to_value(self, id: &str) -> Option<Value> {
        match self {
            IdType::Integer => id.parse::<i64>().ok().map(Value::from),
            IdType::String => Some(Value::String(id.to_string())),
        }
    }
}

/// A model with its relations resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDef {
    pub(crate) name: String,
    pub(crate) plural: String,
    pub(crate) primary_key: String,
    pub(crate) id_type: IdType,
    pub(crate) default_include: Vec<IncludeChain>,
    pub(crate) relations: BTreeMap<String, RelationDescriptor>,
}

impl ModelDef {
    /// Singular model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plural wire type.
    pub fn plural(&self) -> &str {
        &self.plural
    }

    /// Primary key field.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Primary key storage type.
    pub fn id_type(&self) -> IdType {
        self.id_type
    }

    /// Include chains applied to every document whose primary data is
    /// this model.
    pub fn default_include(&self) -> &[IncludeChain] {
        &self.default_include
    }

    /// All relations keyed by name.
    pub fn relations(&self) -> &BTreeMap<String, RelationDescriptor> {
        &self.relations
    }

    /// A single relation by name.
    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.get(name)
    }

    /// Convert a wire id to this model's key value.
    pub fn id_value(&self, id: &str) -> Option<Value> {
        self.id_type.to_value(id)
    }
}
