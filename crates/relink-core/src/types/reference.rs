//! Resource linkage types.

use serde::{Deserialize, Serialize};

/// A pointer to exactly one resource: `{ "type": ..., "id": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceObject {
    /// Plural wire type of the referenced resource.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Stringified id of the referenced resource.
    pub id: String,
}

impl ReferenceObject {
    /// Create a new reference.
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

/// Linkage for one relation: a single reference (or null) for to-one
/// relations, an ordered list for to-many relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RelationshipData {
    /// To-one linkage; `None` serializes as `null`.
    ToOne(Option<ReferenceObject>),
    /// To-many linkage; empty serializes as `[]`.
    ToMany(Vec<ReferenceObject>),
}

impl RelationshipData {
    /// All references in this linkage, in order.
    pub fn references(&self) -> Vec<&ReferenceObject> {
        match self {
            RelationshipData::ToOne(reference) => reference.iter().collect(),
            RelationshipData::ToMany(references) => references.iter().collect(),
        }
    }

    /// Returns true if this is to-many linkage.
    pub fn is_to_many(&self) -> bool {
        matches!(self, RelationshipData::ToMany(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_linkage_serializes_per_cardinality() {
        let to_one = serde_json::to_value(RelationshipData::ToOne(None)).unwrap();
        assert_eq!(to_one, json!(null));

        let to_many = serde_json::to_value(RelationshipData::ToMany(vec![])).unwrap();
        assert_eq!(to_many, json!([]));
    }

    #[test]
    fn reference_serializes_type_key() {
        let data = RelationshipData::ToOne(Some(ReferenceObject::new("people", "5")));
        assert_eq!(
            serde_json::to_value(data).unwrap(),
            json!({"type": "people", "id": "5"})
        );
    }
}
