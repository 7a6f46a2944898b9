//! Converging stored relationships to requested linkage.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::{debug, instrument};

use super::strategy::detect_strategy;
use crate::Result;
use crate::error::{Error, SchemaError};
use crate::schema::{ModelDef, RelationDescriptor, RelationKind, Schema};
use crate::traits::{Filter, Repository};
use crate::types::{FieldMap, Record, RelationshipData, key_string, keys_equal};

/// A validated reference: the target model and its typed id.
struct Target<'s> {
    model: &'s ModelDef,
    id: Value,
}

/// Applies relationship linkage through a repository.
///
/// Every reference is checked before the first write, so a rejected
/// request leaves the store untouched. Writes within one relation are
/// not atomic; see [`Repository`].
pub struct GraphMutator<'a, R: Repository + ?Sized> {
    schema: &'a Schema,
    repo: &'a R,
}

impl<'a, R: Repository + ?Sized> GraphMutator<'a, R> {
    pub fn new(schema: &'a Schema, repo: &'a R) -> Self {
        Self { schema, repo }
    }

    /// Replace the linkage of one relation of `self_type` record `self_id`.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` for linkage of the wrong cardinality,
    /// `RelatedTypeMismatch` for a reference to the wrong model, or any
    /// repository failure.
    pub async fn apply_relationship(
        &self,
        self_type: &str,
        self_id: &Value,
        descriptor: &RelationDescriptor,
        linkage: &RelationshipData,
    ) -> Result<()> {
        self.schema.model(self_type)?;
        let targets = self.targets(descriptor, linkage, "/data")?;
        self.write(self_type, self_id, descriptor, targets).await
    }

    /// Apply a whole `relationships` block, in relation name order.
    ///
    /// Every relation is resolved and every reference checked before the
    /// first write.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` if `self_id` is not a valid id for the type,
    /// `UnknownRelation` for an undeclared relation, otherwise as
    /// [`apply_relationship`](Self::apply_relationship).
    pub async fn link(
        &self,
        self_type: &str,
        self_id: &str,
        relationships: &BTreeMap<String, RelationshipData>,
    ) -> Result<()> {
        let model = self.schema.model(self_type)?;
        let id = model
            .id_value(self_id)
            .ok_or_else(|| Error::ResourceNotFound {
                type_name: self_type.to_string(),
                id: self_id.to_string(),
            })?;

        let mut plan = Vec::with_capacity(relationships.len());
        for (name, linkage) in relationships {
            let descriptor = self.schema.resolve(self_type, name)?;
            let pointer = format!("/data/relationships/{}/data", name);
            plan.push((descriptor, self.targets(descriptor, linkage, &pointer)?));
        }

        for (descriptor, targets) in plan {
            self.write(self_type, &id, descriptor, targets).await?;
        }
        Ok(())
    }

    fn targets(
        &self,
        descriptor: &RelationDescriptor,
        linkage: &RelationshipData,
        pointer: &str,
    ) -> Result<Vec<Target<'a>>> {
        if descriptor.is_to_many() != linkage.is_to_many() {
            let expected = if descriptor.is_to_many() {
                "to-many relationship requires an array"
            } else {
                "to-one relationship requires an object or null"
            };
            return Err(Error::InvalidDocument {
                pointer: pointer.to_string(),
                message: expected.to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for (index, reference) in linkage.references().into_iter().enumerate() {
            let mismatch = || Error::RelatedTypeMismatch {
                relation: descriptor.name.clone(),
                expected: match &descriptor.related_type {
                    Some(related) => self.schema.wire_type(related),
                    None => "any declared type".to_string(),
                },
                found: reference.type_name.clone(),
            };

            let model = self
                .schema
                .model_for_wire_type(&reference.type_name)
                .ok_or_else(mismatch)?;
            if descriptor
                .related_type
                .as_deref()
                .is_some_and(|related| related != model.name())
            {
                return Err(mismatch());
            }

            let id = model.id_value(&reference.id).ok_or_else(|| {
                let pointer = if linkage.is_to_many() {
                    format!("{}/{}/id", pointer, index)
                } else {
                    format!("{}/id", pointer)
                };
                Error::InvalidDocument {
                    pointer,
                    message: format!("'{}' is not a valid id", reference.id),
                }
            })?;

            if seen.insert(reference.id.clone()) {
                targets.push(Target { model, id });
            }
        }
        Ok(targets)
    }

    #[instrument(
        skip(self, self_id, descriptor, targets),
        fields(relation = %descriptor.name, strategy = %detect_strategy(descriptor))
    )]
    async fn write(
        &self,
        self_type: &str,
        self_id: &Value,
        descriptor: &RelationDescriptor,
        targets: Vec<Target<'a>>,
    ) -> Result<()> {
        match &descriptor.kind {
            RelationKind::BelongsTo { foreign_key } => {
                let mut fields = FieldMap::new();
                match targets.first() {
                    Some(target) => {
                        fields.insert(foreign_key.clone(), target.id.clone());
                        if let Some(discriminator) = descriptor.discriminator() {
                            fields.insert(
                                discriminator.to_string(),
                                Value::String(target.model.name().to_string()),
                            );
                        }
                    }
                    None => {
                        fields.insert(foreign_key.clone(), Value::Null);
                        if let Some(discriminator) = descriptor.discriminator() {
                            fields.insert(discriminator.to_string(), Value::Null);
                        }
                    }
                }
                self.repo.update(self_type, self_id, fields).await?;
                debug!("Updated owning foreign key");
            }
            RelationKind::HasOne { foreign_key } | RelationKind::HasMany { foreign_key } => {
                self.replace_owned(self_type, self_id, descriptor, foreign_key, &targets)
                    .await?;
            }
            RelationKind::HasManyThrough {
                through,
                key_through_self,
                key_through_related,
            } => {
                let mut scope = Filter::new().eq(key_through_self.as_str(), self_id.clone());
                if let Some(discriminator) = descriptor.discriminator() {
                    scope = scope.eq(discriminator, Value::String(self_type.to_string()));
                }
                let rows = self.repo.find(through, &scope).await?;

                let existing: HashSet<String> = rows
                    .iter()
                    .filter_map(|row| row.key(key_through_related))
                    .collect();
                let requested: HashSet<String> =
                    targets.iter().filter_map(|t| key_string(&t.id)).collect();

                let mut stale_keys = HashSet::new();
                let stale: Vec<Value> = rows
                    .iter()
                    .filter_map(|row| row.get(key_through_related))
                    .filter(|value| {
                        key_string(value)
                            .is_some_and(|key| !requested.contains(&key) && stale_keys.insert(key))
                    })
                    .cloned()
                    .collect();
                if !stale.is_empty() {
                    let filter = scope.clone().one_of(key_through_related.as_str(), stale);
                    self.repo.delete_where(through, &filter).await?;
                }

                let mut created = 0;
                for target in &targets {
                    if key_string(&target.id).is_some_and(|key| existing.contains(&key)) {
                        continue;
                    }
                    let mut fields = FieldMap::new();
                    fields.insert(key_through_self.clone(), self_id.clone());
                    fields.insert(key_through_related.clone(), target.id.clone());
                    if let Some(discriminator) = descriptor.discriminator() {
                        fields.insert(
                            discriminator.to_string(),
                            Value::String(self_type.to_string()),
                        );
                    }
                    self.repo.create(through, fields).await?;
                    created += 1;
                }

                debug!(removed = stale_keys.len(), created, "Synchronized through rows");
            }
        }
        Ok(())
    }

    // ToOneOwned and ToMany: the related records hold the foreign key.
    async fn replace_owned(
        &self,
        self_type: &str,
        self_id: &Value,
        descriptor: &RelationDescriptor,
        foreign_key: &str,
        targets: &[Target<'a>],
    ) -> Result<()> {
        let related_type = descriptor.related_type.as_deref().ok_or_else(|| {
            SchemaError::InvalidRelation {
                model: self_type.to_string(),
                relation: descriptor.name.clone(),
                reason: "an owned relation needs a target model".to_string(),
            }
        })?;
        let related = self.schema.model(related_type)?;
        let primary_key = related.primary_key();

        let mut scope = Filter::new().eq(foreign_key, self_id.clone());
        if let Some(discriminator) = descriptor.discriminator() {
            scope = scope.eq(discriminator, Value::String(self_type.to_string()));
        }
        let current = self.repo.find(related_type, &scope).await?;

        let requested = |record: &Record| {
            record
                .get(primary_key)
                .is_some_and(|id| targets.iter().any(|t| keys_equal(id, &t.id)))
        };

        let mut cleared = 0;
        for record in current.iter().filter(|r| !requested(r)) {
            let Some(id) = record.get(primary_key) else {
                continue;
            };
            let mut fields = FieldMap::new();
            fields.insert(foreign_key.to_string(), Value::Null);
            if let Some(discriminator) = descriptor.discriminator() {
                fields.insert(discriminator.to_string(), Value::Null);
            }
            self.repo.update(related_type, id, fields).await?;
            cleared += 1;
        }

        let mut linked = 0;
        for target in targets {
            let already = current
                .iter()
                .any(|r| r.get(primary_key).is_some_and(|id| keys_equal(id, &target.id)));
            if already {
                continue;
            }
            let mut fields = FieldMap::new();
            fields.insert(foreign_key.to_string(), self_id.clone());
            if let Some(discriminator) = descriptor.discriminator() {
                fields.insert(discriminator.to_string(), Value::String(self_type.to_string()));
            }
            self.repo.update(related_type, &target.id, fields).await?;
            linked += 1;
        }

        debug!(cleared, linked, "Moved owned foreign keys");
        Ok(())
    }
}
