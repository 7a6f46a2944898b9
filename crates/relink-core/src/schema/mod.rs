//! Relationship metadata.
//!
//! A [`Schema`] is built once, from a file or the builder API, and then
//! shared read-only. Every relation is normalized into a
//! [`RelationDescriptor`] at load time so lookups during a request are
//! plain map reads.

mod definition;
mod descriptor;
mod inflect;
mod model;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::debug;

pub use definition::{
    ModelBuilder, ModelDefinition, PolymorphicDefinition, RelationDefinition, RelationType,
    SchemaDefinition,
};
pub use descriptor::{Polymorphic, RelationDescriptor, RelationKind};
pub use inflect::{camel_case, pluralize, singularize};
pub use model::{IdType, ModelDef};

use crate::document::{IncludeChain, IncludeTree};
use crate::error::{Error, SchemaError};

/// Resolved models and relations.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: BTreeMap<String, ModelDef>,
    plurals: HashMap<String, String>,
}

/// Builder collecting [`ModelBuilder`]s into a [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    definition: SchemaDefinition,
}

impl SchemaBuilder {
    /// Add a model.
    pub fn model(mut self, model: ModelBuilder) -> Self {
        self.definition.models.insert(model.name, model.definition);
        self
    }

    /// Normalize and validate the collected models.
    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::from_definition(self.definition)
    }
}

impl Schema {
    /// Start building a schema in code.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse a schema from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let definition: SchemaDefinition =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse {
                message: e.to_string(),
            })?;
        Self::from_definition(definition)
    }

    /// Read and parse a schema file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Parse {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json(&content)
    }

    /// Normalize a definition, filling conventional key names.
    ///
    /// # Errors
    ///
    /// Fails if a relation targets an undeclared model, declares
    /// contradictory keys, or a default include does not resolve.
    pub fn from_definition(definition: SchemaDefinition) -> Result<Self, SchemaError> {
        let mut plurals: HashMap<String, String> = HashMap::new();
        let mut models = BTreeMap::new();

        for (name, model) in &definition.models {
            let plural = model.plural.clone().unwrap_or_else(|| pluralize(name));
            if let Some(first) = plurals.insert(plural.clone(), name.clone()) {
                return Err(SchemaError::DuplicatePlural {
                    first,
                    second: name.clone(),
                    plural,
                });
            }

            let mut relations = BTreeMap::new();
            for (relation_name, relation) in &model.relations {
                let descriptor = normalize_relation(name, relation_name, relation, &definition)?;
                relations.insert(relation_name.clone(), descriptor);
            }

            models.insert(
                name.clone(),
                ModelDef {
                    name: name.clone(),
                    plural,
                    primary_key: model.primary_key.clone().unwrap_or_else(|| "id".to_string()),
                    id_type: model.id_type,
                    default_include: Vec::new(),
                    relations,
                },
            );
        }

        let mut schema = Self { models, plurals };

        // Default includes can only be checked once every model is known.
        for (name, model) in &definition.models {
            let mut chains = Vec::new();
            for path in &model.default_include {
                let invalid = |e: Error| SchemaError::InvalidDefaultInclude {
                    model: name.clone(),
                    path: path.clone(),
                    reason: e.to_string(),
                };
                let parsed = IncludeChain::parse_list(path).map_err(invalid)?;
                IncludeTree::from_chains(&parsed)
                    .validate(&schema, name)
                    .map_err(invalid)?;
                chains.extend(parsed);
            }
            if let Some(model) = schema.models.get_mut(name) {
                model.default_include = chains;
            }
        }

        debug!(models = schema.models.len(), "Loaded schema");

        Ok(schema)
    }

    /// Look up a model by singular name.
    pub fn model(&self, type_name: &str) -> Result<&ModelDef, Error> {
        self.models.get(type_name).ok_or_else(|| Error::UnknownType {
            type_name: type_name.to_string(),
        })
    }

    /// All models in name order.
    pub fn models(&self) -> impl Iterator<Item = &ModelDef> {
        self.models.values()
    }

    /// Returns true if the model is declared.
    pub fn contains(&self, type_name: &str) -> bool {
        self.models.contains_key(type_name)
    }

    /// Resolve one relation of a type.
    ///
    /// # Errors
    ///
    /// `UnknownRelation` if the type declares no such relation,
    /// `UnknownType` if the type itself is undeclared.
    pub fn resolve(&self, type_name: &str, relation: &str) -> Result<&RelationDescriptor, Error> {
        self.model(type_name)?
            .relation(relation)
            .ok_or_else(|| Error::UnknownRelation {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
            })
    }

    /// Every relation declared on a type.
    pub fn all_relations(
        &self,
        type_name: &str,
    ) -> Result<&BTreeMap<String, RelationDescriptor>, Error> {
        Ok(self.model(type_name)?.relations())
    }

    /// The model addressed by a wire type (`posts`), its singular name
    /// (`post`), or an inflected form of either.
    pub fn model_for_wire_type(&self, wire_type: &str) -> Option<&ModelDef> {
        if let Some(name) = self.plurals.get(wire_type) {
            return self.models.get(name);
        }
        self.models
            .get(wire_type)
            .or_else(|| self.models.get(&singularize(wire_type)))
    }

    /// Plural wire type for a model name.
    pub fn wire_type(&self, type_name: &str) -> String {
        match self.models.get(type_name) {
            Some(model) => model.plural.clone(),
            None => pluralize(type_name),
        }
    }
}

fn normalize_relation(
    owner: &str,
    name: &str,
    relation: &RelationDefinition,
    definition: &SchemaDefinition,
) -> Result<RelationDescriptor, SchemaError> {
    let invalid = |reason: &str| SchemaError::InvalidRelation {
        model: owner.to_string(),
        relation: name.to_string(),
        reason: reason.to_string(),
    };
    let require_model = |target: &str| {
        if definition.models.contains_key(target) {
            Ok(())
        } else {
            Err(SchemaError::UnknownTarget {
                model: owner.to_string(),
                relation: name.to_string(),
                target: target.to_string(),
            })
        }
    };

    let fallback_base = match relation.relation_type {
        RelationType::BelongsTo => name.to_string(),
        RelationType::HasOne | RelationType::HasMany => camel_case(owner),
    };
    let (polymorphic_key, polymorphic) = match &relation.polymorphic {
        Some(poly) => {
            let (key, discriminator) = polymorphic_fields(poly, &fallback_base);
            (key, Some(Polymorphic { discriminator }))
        }
        None => (None, None),
    };
    let foreign_key = relation
        .foreign_key
        .clone()
        .or(polymorphic_key)
        .unwrap_or_else(|| format!("{}Id", fallback_base));

    if relation.through.is_some() && relation.relation_type != RelationType::HasMany {
        return Err(invalid("only hasMany relations may declare a through model"));
    }
    if relation.key_through.is_some() && relation.through.is_none() {
        return Err(invalid("keyThrough requires a through model"));
    }

    let (kind, related_type) = match relation.relation_type {
        RelationType::BelongsTo if polymorphic.is_some() => {
            if relation.model.is_some() {
                return Err(invalid("a polymorphic belongsTo must not declare a model"));
            }
            (RelationKind::BelongsTo { foreign_key }, None)
        }
        relation_type => {
            let target = relation
                .model
                .clone()
                .ok_or_else(|| invalid("missing target model"))?;
            require_model(&target)?;

            let kind = match (relation_type, &relation.through) {
                (RelationType::BelongsTo, _) => RelationKind::BelongsTo { foreign_key },
                (RelationType::HasOne, _) => RelationKind::HasOne { foreign_key },
                (RelationType::HasMany, None) => RelationKind::HasMany { foreign_key },
                (RelationType::HasMany, Some(through)) => {
                    require_model(through)?;
                    let key_through_related = relation
                        .key_through
                        .clone()
                        .unwrap_or_else(|| format!("{}Id", camel_case(&target)));
                    // Reflexive relations default both keys to the same field.
                    if key_through_related == foreign_key {
                        return Err(invalid(&format!(
                            "both through keys are '{}'; declare foreignKey or keyThrough",
                            foreign_key
                        )));
                    }
                    RelationKind::HasManyThrough {
                        through: through.clone(),
                        key_through_self: foreign_key,
                        key_through_related,
                    }
                }
            };
            (kind, Some(target))
        }
    };

    Ok(RelationDescriptor {
        name: name.to_string(),
        owner_type: owner.to_string(),
        kind,
        related_type,
        polymorphic,
    })
}

fn polymorphic_fields(poly: &PolymorphicDefinition, fallback_base: &str) -> (Option<String>, String) {
    match poly {
        PolymorphicDefinition::Name(base) => (Some(format!("{}Id", base)), format!("{}Type", base)),
        PolymorphicDefinition::Keys {
            foreign_key,
            discriminator,
        } => (
            foreign_key.clone(),
            discriminator
                .clone()
                .unwrap_or_else(|| format!("{}Type", fallback_base)),
        ),
    }
}
