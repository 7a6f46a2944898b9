//! Inbound documents.
//!
//! Requests carry either a resource (`POST /posts`, `PATCH /posts/1`) or
//! bare linkage (`PATCH /posts/1/relationships/tags`). Both are parsed
//! here; shape errors carry a JSON pointer to the offending member.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::Result;
use crate::error::Error;
use crate::schema::{RelationKind, Schema};
use crate::types::{FieldMap, ReferenceObject, RelationshipData, key_string};

/// A parsed inbound document.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingDocument {
    /// `{ "data": { "type", "id"?, "attributes"?, "relationships"? } }`
    Resource(IncomingResource),
    /// `{ "data": null | ref | [refs] }`
    Linkage(RelationshipData),
}

/// A resource object submitted by a client.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingResource {
    pub type_name: String,
    pub id: Option<String>,
    pub attributes: FieldMap,
    pub relationships: BTreeMap<String, RelationshipData>,
}

impl IncomingDocument {
    /// Parse a document value.
    ///
    /// An object under `data` with only `type` and `id` is linkage; one
    /// carrying `attributes` or `relationships` is a resource.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` naming the first malformed member.
    pub fn parse(value: &Value) -> Result<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| invalid("", "document must be an object"))?;
        let data = root
            .get("data")
            .ok_or_else(|| invalid("/data", "missing primary data"))?;

        match data {
            Value::Object(map) if map.contains_key("attributes") || map.contains_key("relationships") => {
                IncomingResource::parse(map, "/data").map(Self::Resource)
            }
            other => parse_linkage(other, "/data").map(Self::Linkage),
        }
    }

    /// The resource, if this is a resource document.
    pub fn into_resource(self) -> Result<IncomingResource> {
        match self {
            Self::Resource(resource) => Ok(resource),
            Self::Linkage(_) => Err(invalid("/data", "expected a resource object")),
        }
    }

    /// The linkage, if this is a relationship document.
    pub fn into_linkage(self) -> Result<RelationshipData> {
        match self {
            Self::Linkage(linkage) => Ok(linkage),
            Self::Resource(_) => Err(invalid("/data", "expected resource linkage")),
        }
    }
}

impl FromStr for IncomingDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s).map_err(|e| invalid("", &e.to_string()))?;
        Self::parse(&value)
    }
}

impl IncomingResource {
    fn parse(map: &Map<String, Value>, pointer: &str) -> Result<Self> {
        let type_name = map
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid(&format!("{}/type", pointer), "type must be a non-empty string"))?
            .to_string();

        let id = match map.get("id") {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_id(value, &format!("{}/id", pointer))?),
        };

        let attributes = match map.get("attributes") {
            None | Some(Value::Null) => FieldMap::new(),
            Some(Value::Object(attributes)) => attributes.clone(),
            Some(_) => {
                return Err(invalid(
                    &format!("{}/attributes", pointer),
                    "attributes must be an object",
                ));
            }
        };

        let mut relationships = BTreeMap::new();
        match map.get("relationships") {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => {
                for (name, entry) in entries {
                    let entry_pointer = format!("{}/relationships/{}", pointer, name);
                    let data = entry
                        .as_object()
                        .and_then(|e| e.get("data"))
                        .ok_or_else(|| invalid(&entry_pointer, "relationship must have data"))?;
                    let linkage = parse_linkage(data, &format!("{}/data", entry_pointer))?;
                    relationships.insert(name.clone(), linkage);
                }
            }
            Some(_) => {
                return Err(invalid(
                    &format!("{}/relationships", pointer),
                    "relationships must be an object",
                ));
            }
        }

        Ok(Self {
            type_name,
            id,
            attributes,
            relationships,
        })
    }

    /// Flatten into fields for create or update of `expected_type`.
    ///
    /// Attributes are merged with the foreign key (and discriminator) of
    /// every `belongsTo` relationship present. Ids are typed by the
    /// target model. Other relationships are left for the mutator.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` if the resource type is not `expected_type` or a
    /// linkage has the wrong cardinality, `UnknownRelation` for an
    /// undeclared relationship, `RelatedTypeMismatch` for a reference to
    /// the wrong model.
    pub fn into_fields(&self, schema: &Schema, expected_type: &str) -> Result<FieldMap> {
        let model = schema.model(expected_type)?;
        if schema.model_for_wire_type(&self.type_name).map(|m| m.name()) != Some(model.name()) {
            return Err(invalid(
                "/data/type",
                &format!("expected type '{}', got '{}'", model.plural(), self.type_name),
            ));
        }

        let mut fields = self.attributes.clone();
        if let Some(id) = &self.id {
            let value = model
                .id_value(id)
                .ok_or_else(|| invalid("/data/id", &format!("'{}' is not a valid id", id)))?;
            fields.insert(model.primary_key().to_string(), value);
        }

        for (name, linkage) in &self.relationships {
            let descriptor = schema.resolve(expected_type, name)?;
            let RelationKind::BelongsTo { foreign_key } = &descriptor.kind else {
                continue;
            };
            let pointer = format!("/data/relationships/{}/data", name);

            let reference = match linkage {
                RelationshipData::ToOne(reference) => reference.as_ref(),
                RelationshipData::ToMany(_) => {
                    return Err(invalid(&pointer, "to-one relationship requires an object or null"));
                }
            };

            let Some(reference) = reference else {
                fields.insert(foreign_key.clone(), Value::Null);
                if let Some(discriminator) = descriptor.discriminator() {
                    fields.insert(discriminator.to_string(), Value::Null);
                }
                continue;
            };

            let target = schema.model_for_wire_type(&reference.type_name).ok_or_else(|| {
                Error::RelatedTypeMismatch {
                    relation: name.clone(),
                    expected: expected_target(schema, descriptor.related_type.as_deref()),
                    found: reference.type_name.clone(),
                }
            })?;
            if let Some(related) = &descriptor.related_type {
                if related != target.name() {
                    return Err(Error::RelatedTypeMismatch {
                        relation: name.clone(),
                        expected: schema.wire_type(related),
                        found: reference.type_name.clone(),
                    });
                }
            }

            let id = target
                .id_value(&reference.id)
                .ok_or_else(|| invalid(&format!("{}/id", pointer), "invalid id"))?;
            fields.insert(foreign_key.clone(), id);
            if let Some(discriminator) = descriptor.discriminator() {
                fields.insert(
                    discriminator.to_string(),
                    Value::String(target.name().to_string()),
                );
            }
        }

        Ok(fields)
    }
}

fn expected_target(schema: &Schema, related: Option<&str>) -> String {
    match related {
        Some(related) => schema.wire_type(related),
        None => "any declared type".to_string(),
    }
}

fn parse_linkage(value: &Value, pointer: &str) -> Result<RelationshipData> {
    match value {
        Value::Null => Ok(RelationshipData::ToOne(None)),
        Value::Object(_) => parse_reference(value, pointer).map(|r| RelationshipData::ToOne(Some(r))),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_reference(item, &format!("{}/{}", pointer, i)))
            .collect::<Result<Vec<_>>>()
            .map(RelationshipData::ToMany),
        _ => Err(invalid(pointer, "linkage must be null, an object or an array")),
    }
}

fn parse_reference(value: &Value, pointer: &str) -> Result<ReferenceObject> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid(pointer, "reference must be an object"))?;
    let type_name = map
        .get("type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| invalid(&format!("{}/type", pointer), "type must be a non-empty string"))?;
    let id = map
        .get("id")
        .ok_or_else(|| invalid(&format!("{}/id", pointer), "missing id"))?;
    Ok(ReferenceObject::new(
        type_name,
        parse_id(id, &format!("{}/id", pointer))?,
    ))
}

fn parse_id(value: &Value, pointer: &str) -> Result<String> {
    match value {
        Value::String(_) | Value::Number(_) => {
            key_string(value).ok_or_else(|| invalid(pointer, "invalid id"))
        }
        _ => Err(invalid(pointer, "id must be a string or number")),
    }
}

fn invalid(pointer: &str, message: &str) -> Error {
    Error::InvalidDocument {
        pointer: pointer.to_string(),
        message: message.to_string(),
    }
}
