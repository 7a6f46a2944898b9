//! Outbound document shapes.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::types::{FieldMap, ReferenceObject, RelationshipData};

/// A `links` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Links {
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

/// One entry of a resource's `relationships`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipObject {
    pub links: Links,

    /// Present only when sideloading or answering a relationship endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RelationshipData>,
}

/// A resource object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub type_name: String,

    pub id: String,

    pub attributes: FieldMap,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, RelationshipObject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl ResourceObject {
    /// The `(type, id)` identity of this resource.
    pub fn reference(&self) -> ReferenceObject {
        ReferenceObject::new(&self.type_name, &self.id)
    }

    /// Linkage emitted for a relation, if any.
    pub fn relationship_data(&self, relation: &str) -> Option<&RelationshipData> {
        self.relationships
            .get(relation)
            .and_then(|rel| rel.data.as_ref())
    }
}

/// Top-level `data` member.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    /// A single resource, or `null`.
    Single(Option<ResourceObject>),
    /// A resource collection.
    Many(Vec<ResourceObject>),
    /// Linkage only, for relationship endpoints.
    Linkage(RelationshipData),
}

/// A complete (possibly compound) document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundDocument {
    pub data: PrimaryData,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<ResourceObject>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

impl CompoundDocument {
    /// Primary resources in order; empty for linkage documents.
    pub fn primary(&self) -> Vec<&ResourceObject> {
        match &self.data {
            PrimaryData::Single(resource) => resource.iter().collect(),
            PrimaryData::Many(resources) => resources.iter().collect(),
            PrimaryData::Linkage(_) => Vec::new(),
        }
    }

    /// Find an included resource by wire type and id.
    pub fn find_included(&self, type_name: &str, id: &str) -> Option<&ResourceObject> {
        self.included
            .iter()
            .find(|r| r.type_name == type_name && r.id == id)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relationship_without_data_omits_key() {
        let rel = RelationshipObject {
            links: Links {
                self_link: None,
                related: Some("/posts/1/author".to_string()),
            },
            data: None,
        };
        assert_eq!(
            serde_json::to_value(rel).unwrap(),
            json!({"links": {"related": "/posts/1/author"}})
        );
    }

    #[test]
    fn null_document_serializes_data_null() {
        let doc = CompoundDocument {
            data: PrimaryData::Single(None),
            included: Vec::new(),
            links: None,
        };
        assert_eq!(doc.to_value(), json!({"data": null}));
    }
}
