//! Resource composition.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use super::fetch::RelatedRecord;
use super::resource::{Links, RelationshipObject, ResourceObject};
use crate::Result;
use crate::error::Error;
use crate::schema::{RelationDescriptor, RelationKind, Schema, pluralize};
use crate::traits::UrlBuilder;
use crate::types::{Record, ReferenceObject, RelationshipData};

/// Per-record composition inputs.
#[derive(Debug, Clone, Default)]
pub struct ComposeContext {
    /// Relations whose `data` is emitted (the active include set).
    pub include: BTreeSet<String>,

    /// Pre-fetched related records for relations whose linkage is not
    /// stored on the record itself (`hasOne`, `hasMany`, through).
    pub related: HashMap<String, Vec<RelatedRecord>>,

    /// The record is requested primary data, never collapsed to a stub.
    pub top_level: bool,

    /// Emit `data` for every relation, as a relationship endpoint does.
    pub relationship_endpoint: bool,

    /// Foreign key partitioning the collection being returned. The
    /// matching `belongsTo` is stripped and not emitted as a relationship.
    pub partition_key: Option<String>,
}

impl ComposeContext {
    /// Context for requested primary data.
    pub fn top_level() -> Self {
        Self {
            top_level: true,
            ..Self::default()
        }
    }

    /// Context for a sideloaded resource.
    pub fn included() -> Self {
        Self::default()
    }

    /// Emit `data` for a relation, with its pre-fetched records.
    pub fn with_related(mut self, relation: &str, records: Vec<RelatedRecord>) -> Self {
        self.include.insert(relation.to_string());
        self.related.insert(relation.to_string(), records);
        self
    }

    /// Emit `data` for a relation stored on the record itself.
    pub fn with_include(mut self, relation: &str) -> Self {
        self.include.insert(relation.to_string());
        self
    }
}

/// Turns records into resource objects.
#[derive(Clone, Copy)]
pub struct ResourceComposer<'a> {
    schema: &'a Schema,
    links: &'a dyn UrlBuilder,
}

impl<'a> ResourceComposer<'a> {
    pub fn new(schema: &'a Schema, links: &'a dyn UrlBuilder) -> Self {
        Self { schema, links }
    }

    /// Compose one record into a resource object.
    ///
    /// The record is not modified. Returns `None` for a non-top-level
    /// record left with no attributes; callers omit it.
    ///
    /// # Errors
    ///
    /// `UnknownType` for an undeclared type, `MissingPrimaryKey` if the
    /// record has no key value.
    pub fn compose(
        &self,
        type_name: &str,
        record: &Record,
        ctx: &ComposeContext,
    ) -> Result<Option<ResourceObject>> {
        let model = self.schema.model(type_name)?;
        let id = record
            .key(model.primary_key())
            .ok_or_else(|| Error::MissingPrimaryKey {
                type_name: type_name.to_string(),
                primary_key: model.primary_key().to_string(),
            })?;
        let plural = model.plural();

        let mut attributes = record.fields().clone();
        attributes.remove(model.primary_key());

        let mut relationships = BTreeMap::new();
        for (name, descriptor) in model.relations() {
            for field in descriptor.owned_fields() {
                attributes.remove(field);
            }

            if descriptor.is_owning_side()
                && ctx.partition_key.is_some()
                && descriptor.foreign_key() == ctx.partition_key.as_deref()
            {
                continue;
            }

            let data = if ctx.relationship_endpoint || ctx.include.contains(name) {
                let related = ctx.related.get(name).map(Vec::as_slice);
                Some(self.linkage(descriptor, record, related)?)
            } else {
                None
            };

            relationships.insert(
                name.clone(),
                RelationshipObject {
                    links: Links {
                        self_link: None,
                        related: Some(self.links.build(plural, Some(&id), Some(name))),
                    },
                    data,
                },
            );
        }

        if attributes.is_empty() && !ctx.top_level {
            return Ok(None);
        }

        Ok(Some(ResourceObject {
            type_name: plural.to_string(),
            links: Some(Links {
                self_link: Some(self.links.build(plural, Some(&id), None)),
                related: None,
            }),
            id,
            attributes,
            relationships,
        }))
    }

    /// Linkage of one relation for a record.
    ///
    /// `belongsTo` linkage is read from the record's foreign key; every
    /// other kind is read from `related`, treated as empty when absent.
    pub fn linkage(
        &self,
        descriptor: &RelationDescriptor,
        record: &Record,
        related: Option<&[RelatedRecord]>,
    ) -> Result<RelationshipData> {
        let related = related.unwrap_or(&[]);
        match &descriptor.kind {
            RelationKind::BelongsTo { foreign_key } => {
                let Some(id) = record.key(foreign_key) else {
                    return Ok(RelationshipData::ToOne(None));
                };
                let target = match (&descriptor.related_type, descriptor.discriminator()) {
                    (Some(related_type), _) => related_type.clone(),
                    (None, Some(discriminator)) => match record.key(discriminator) {
                        Some(target) => target,
                        None => {
                            warn!(
                                relation = %descriptor.name,
                                "Polymorphic key set without discriminator"
                            );
                            return Ok(RelationshipData::ToOne(None));
                        }
                    },
                    (None, None) => return Ok(RelationshipData::ToOne(None)),
                };
                Ok(RelationshipData::ToOne(Some(ReferenceObject::new(
                    self.wire_type_of(&target),
                    id,
                ))))
            }
            RelationKind::HasOne { .. } => {
                let reference = match related.first() {
                    Some(first) => Some(self.reference(&first.type_name, &first.record)?),
                    None => None,
                };
                Ok(RelationshipData::ToOne(reference))
            }
            RelationKind::HasMany { .. } | RelationKind::HasManyThrough { .. } => {
                let references = related
                    .iter()
                    .map(|r| self.reference(&r.type_name, &r.record))
                    .collect::<Result<Vec<_>>>()?;
                Ok(RelationshipData::ToMany(references))
            }
        }
    }

    /// The `(type, id)` reference for a record of a model.
    pub fn reference(&self, type_name: &str, record: &Record) -> Result<ReferenceObject> {
        let model = self.schema.model(type_name)?;
        let id = record
            .key(model.primary_key())
            .ok_or_else(|| Error::MissingPrimaryKey {
                type_name: type_name.to_string(),
                primary_key: model.primary_key().to_string(),
            })?;
        Ok(ReferenceObject::new(model.plural(), id))
    }

    // Discriminators may hold a model name or a wire type.
    fn wire_type_of(&self, target: &str) -> String {
        self.schema
            .model_for_wire_type(target)
            .map(|model| model.plural().to_string())
            .unwrap_or_else(|| pluralize(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ModelBuilder, RelationDefinition};
    use crate::traits::LinkBuilder;
    use crate::types::BaseUrl;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder()
            .model(
                ModelBuilder::new("post")
                    .relation("author", RelationDefinition::belongs_to("person"))
                    .relation("comments", RelationDefinition::has_many("comment")),
            )
            .model(ModelBuilder::new("person"))
            .model(
                ModelBuilder::new("comment")
                    .relation("post", RelationDefinition::belongs_to("post"))
                    .relation(
                        "target",
                        RelationDefinition::polymorphic_belongs_to("target"),
                    ),
            )
            .build()
            .unwrap()
    }

    fn links() -> LinkBuilder {
        LinkBuilder::new(BaseUrl::new("http://localhost:3000").unwrap(), "/api")
    }

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn strips_keys_and_emits_links_only_without_include() {
        let schema = schema();
        let links = links();
        let composer = ResourceComposer::new(&schema, &links);
        let post = record(json!({"id": 1, "title": "t", "authorId": 5}));

        let resource = composer
            .compose("post", &post, &ComposeContext::top_level())
            .unwrap()
            .unwrap();

        assert_eq!(resource.type_name, "posts");
        assert_eq!(resource.id, "1");
        assert_eq!(serde_json::Value::Object(resource.attributes.clone()), json!({"title": "t"}));

        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(
            value["relationships"]["author"],
            json!({"links": {"related": "http://localhost:3000/api/posts/1/author"}})
        );
        assert_eq!(value["links"]["self"], "http://localhost:3000/api/posts/1");

        // The source record keeps its foreign key.
        assert_eq!(post.get("authorId"), Some(&json!(5)));
    }

    #[test]
    fn included_relations_carry_data() {
        let schema = schema();
        let links = links();
        let composer = ResourceComposer::new(&schema, &links);
        let post = record(json!({"id": 1, "title": "t", "authorId": 5}));

        let comments = vec![
            RelatedRecord::new("comment", record(json!({"id": 10, "body": "a", "postId": 1}))),
            RelatedRecord::new("comment", record(json!({"id": 11, "body": "b", "postId": 1}))),
        ];
        let ctx = ComposeContext::top_level()
            .with_include("author")
            .with_related("comments", comments);

        let resource = composer.compose("post", &post, &ctx).unwrap().unwrap();

        assert_eq!(
            resource.relationship_data("author"),
            Some(&RelationshipData::ToOne(Some(ReferenceObject::new("people", "5"))))
        );
        assert_eq!(
            resource.relationship_data("comments"),
            Some(&RelationshipData::ToMany(vec![
                ReferenceObject::new("comments", "10"),
                ReferenceObject::new("comments", "11"),
            ]))
        );
    }

    #[test]
    fn empty_linkage_per_cardinality() {
        let schema = schema();
        let links = links();
        let composer = ResourceComposer::new(&schema, &links);
        let post = record(json!({"id": 2, "title": "x", "authorId": null}));

        let ctx = ComposeContext {
            relationship_endpoint: true,
            top_level: true,
            ..ComposeContext::default()
        };
        let resource = composer.compose("post", &post, &ctx).unwrap().unwrap();
        let value = serde_json::to_value(&resource).unwrap();
        assert_eq!(value["relationships"]["author"]["data"], json!(null));
        assert_eq!(value["relationships"]["comments"]["data"], json!([]));
    }

    #[test]
    fn stub_without_attributes_is_omitted() {
        let schema = schema();
        let links = links();
        let composer = ResourceComposer::new(&schema, &links);
        let person = record(json!({"id": 5}));

        assert!(
            composer
                .compose("person", &person, &ComposeContext::included())
                .unwrap()
                .is_none()
        );

        let top = composer
            .compose("person", &person, &ComposeContext::top_level())
            .unwrap()
            .unwrap();
        assert!(top.attributes.is_empty());
    }

    #[test]
    fn partition_key_is_not_a_relationship() {
        let schema = schema();
        let links = links();
        let composer = ResourceComposer::new(&schema, &links);
        let comment = record(json!({"id": 10, "body": "a", "postId": 1}));

        let ctx = ComposeContext {
            partition_key: Some("postId".to_string()),
            ..ComposeContext::top_level()
        };
        let resource = composer.compose("comment", &comment, &ctx).unwrap().unwrap();
        assert!(!resource.attributes.contains_key("postId"));
        assert!(!resource.relationships.contains_key("post"));
        assert!(resource.relationships.contains_key("target"));
    }

    #[test]
    fn polymorphic_linkage_uses_discriminator() {
        let schema = schema();
        let links = links();
        let composer = ResourceComposer::new(&schema, &links);
        let comment = record(json!({
            "id": 10, "body": "a", "postId": 1,
            "targetId": 5, "targetType": "person"
        }));

        let ctx = ComposeContext::top_level().with_include("target");
        let resource = composer.compose("comment", &comment, &ctx).unwrap().unwrap();

        assert!(!resource.attributes.contains_key("targetType"));
        assert_eq!(
            resource.relationship_data("target"),
            Some(&RelationshipData::ToOne(Some(ReferenceObject::new("people", "5"))))
        );
    }

    #[test]
    fn missing_primary_key_is_an_error() {
        let schema = schema();
        let links = links();
        let composer = ResourceComposer::new(&schema, &links);
        let post = record(json!({"title": "no id"}));
        assert!(matches!(
            composer.compose("post", &post, &ComposeContext::top_level()),
            Err(Error::MissingPrimaryKey { .. })
        ));
    }
}
