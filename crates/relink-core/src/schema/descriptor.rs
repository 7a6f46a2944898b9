//! Normalized relation descriptors.

use serde::Serialize;

/// How a relation is stored.
///
/// Each kind carries exactly the keys it needs, so a through relation can
/// never be asked for a single foreign key and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RelationKind {
    /// Self holds the foreign key (`comment belongsTo post`).
    #[serde(rename_all = "camelCase")]
    BelongsTo { foreign_key: String },

    /// The single related record holds the foreign key (`post hasOne cover`).
    #[serde(rename_all = "camelCase")]
    HasOne { foreign_key: String },

    /// Related records hold the foreign key (`post hasMany comments`).
    #[serde(rename_all = "camelCase")]
    HasMany { foreign_key: String },

    /// A through record holds both keys (`movie hasMany categories through
    /// movieCategoryAssoc`).
    #[serde(rename_all = "camelCase")]
    HasManyThrough {
        through: String,
        key_through_self: String,
        key_through_related: String,
    },
}

/// Discriminator field paired with a polymorphic foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Polymorphic {
    /// Field holding the model name the foreign key points at.
    pub discriminator: String,
}

/// A relation, normalized from the schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDescriptor {
    /// Relation name as it appears in `relationships`.
    pub name: String,

    /// Model declaring the relation.
    pub owner_type: String,

    /// Storage shape.
    #[serde(flatten)]
    pub kind: RelationKind,

    /// Target model. `None` only for a polymorphic `BelongsTo`, whose
    /// target is read per record from the discriminator.
    pub related_type: Option<String>,

    /// Discriminator for polymorphic relations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polymorphic: Option<Polymorphic>,
}

impl RelationDescriptor {
    /// The foreign key for every kind except `HasManyThrough`.
    pub fn foreign_key(&self) -> Option<&str> {
        match &self.kind {
            RelationKind::BelongsTo { foreign_key }
            | RelationKind::HasOne { foreign_key }
            | RelationKind::HasMany { foreign_key } => Some(foreign_key),
            RelationKind::HasManyThrough { .. } => None,
        }
    }

    /// The through model for `HasManyThrough`.
    pub fn through_type(&self) -> Option<&str> {
        match &self.kind {
            RelationKind::HasManyThrough { through, .. } => Some(through),
            _ => None,
        }
    }

    /// The discriminator field, if polymorphic.
    pub fn discriminator(&self) -> Option<&str> {
        self.polymorphic.as_ref().map(|p| p.discriminator.as_str())
    }

    /// Returns true if the declaring record holds the foreign key.
    pub fn is_owning_side(&self) -> bool {
        matches!(self.kind, RelationKind::BelongsTo { .. })
    }

    /// Returns true if the relation yields zero or more records.
    pub fn is_to_many(&self) -> bool {
        matches!(
            self.kind,
            RelationKind::HasMany { .. } | RelationKind::HasManyThrough { .. }
        )
    }

    /// Returns true if the target is resolved per record.
    pub fn is_polymorphic_target(&self) -> bool {
        self.related_type.is_none()
    }

    /// Fields stored on the declaring record that back this relation.
    ///
    /// These never appear in a composed resource's `attributes`.
    pub fn owned_fields(&self) -> Vec<&str> {
        match &self.kind {
            RelationKind::BelongsTo { foreign_key } => {
                let mut fields = vec![foreign_key.as_str()];
                fields.extend(self.discriminator());
                fields
            }
            _ => Vec::new(),
        }
    }
}
