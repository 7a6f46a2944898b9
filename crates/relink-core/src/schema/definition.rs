//! Declarative schema definitions.
//!
//! These are the shapes read from a schema file or assembled with the
//! builders below. [`Schema::from_definition`](super::Schema::from_definition)
//! normalizes them into [`RelationDescriptor`](super::RelationDescriptor)s,
//! filling in conventional key names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::IdType;

/// Root of a schema file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    /// Models keyed by singular name.
    #[serde(default)]
    pub models: BTreeMap<String, ModelDefinition>,
}

/// A model as declared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModelDefinition {
    /// Plural wire type; derived from the name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,

    /// Primary key field; `id` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,

    #[serde(default)]
    pub id_type: IdType,

    /// Include paths applied whenever this model is the primary data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_include: Vec<String>,

    #[serde(default)]
    pub relations: BTreeMap<String, RelationDefinition>,
}

/// Declared relation type. A `hasMany` with `through` is a through relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    BelongsTo,
    HasOne,
    HasMany,
}

/// A relation as declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RelationDefinition {
    #[serde(rename = "type")]
    pub relation_type: RelationType,

    /// Target model. Omitted for a polymorphic `belongsTo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Foreign key. For a through relation, the through record's key
    /// pointing back at the declaring model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    /// Through model for many-to-many relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,

    /// The through record's key pointing at the target model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_through: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polymorphic: Option<PolymorphicDefinition>,
}

/// Polymorphic declaration: a base name (`"commentable"` meaning
/// `commentableId` / `commentableType`) or explicit field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolymorphicDefinition {
    Name(String),
    #[serde(rename_all = "camelCase")]
    Keys {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        foreign_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        discriminator: Option<String>,
    },
}

impl RelationDefinition {
    fn new(relation_type: RelationType, model: Option<&str>) -> Self {
        Self {
            relation_type,
            model: model.map(str::to_string),
            foreign_key: None,
            through: None,
            key_through: None,
            polymorphic: None,
        }
    }

    /// `belongsTo` a fixed model.
    pub fn belongs_to(model: &str) -> Self {
        Self::new(RelationType::BelongsTo, Some(model))
    }

    /// `belongsTo` whose target type is read from a discriminator field.
    pub fn polymorphic_belongs_to(base: &str) -> Self {
        Self::new(RelationType::BelongsTo, None).polymorphic(base)
    }

    /// `hasOne` model.
    pub fn has_one(model: &str) -> Self {
        Self::new(RelationType::HasOne, Some(model))
    }

    /// `hasMany` model.
    pub fn has_many(model: &str) -> Self {
        Self::new(RelationType::HasMany, Some(model))
    }

    /// `hasMany` model through a join model.
    pub fn has_many_through(model: &str, through: &str) -> Self {
        let mut def = Self::new(RelationType::HasMany, Some(model));
        def.through = Some(through.to_string());
        def
    }

    /// Override the foreign key.
    pub fn foreign_key(mut self, field: &str) -> Self {
        self.foreign_key = Some(field.to_string());
        self
    }

    /// Override the through record's key pointing at the target.
    pub fn key_through(mut self, field: &str) -> Self {
        self.key_through = Some(field.to_string());
        self
    }

    /// Mark polymorphic with a base name.
    pub fn polymorphic(mut self, base: &str) -> Self {
        self.polymorphic = Some(PolymorphicDefinition::Name(base.to_string()));
        self
    }

    /// Mark polymorphic with explicit key and discriminator fields.
    pub fn polymorphic_keys(mut self, foreign_key: &str, discriminator: &str) -> Self {
        self.polymorphic = Some(PolymorphicDefinition::Keys {
            foreign_key: Some(foreign_key.to_string()),
            discriminator: Some(discriminator.to_string()),
        });
        self
    }
}

/// Fluent builder for one model.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    pub(crate) name: String,
    pub(crate) definition: ModelDefinition,
}

impl ModelBuilder {
    /// Start a model with the given singular name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            definition: ModelDefinition::default(),
        }
    }

    pub fn plural(mut self, plural: &str) -> Self {
        self.definition.plural = Some(plural.to_string());
        self
    }

    pub fn primary_key(mut self, field: &str) -> Self {
        self.definition.primary_key = Some(field.to_string());
        self
    }

    pub fn id_type(mut self, id_type: IdType) -> Self {
        self.definition.id_type = id_type;
        self
    }

    pub fn default_include(mut self, path: &str) -> Self {
        self.definition.default_include.push(path.to_string());
        self
    }

    pub fn relation(mut self, name: &str, relation: RelationDefinition) -> Self {
        self.definition.relations.insert(name.to_string(), relation);
        self
    }
}
