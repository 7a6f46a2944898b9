//! Choosing how a relation is written.

use std::fmt;

use serde::Serialize;

use crate::schema::{RelationDescriptor, RelationKind};

/// Write pattern for replacing a relation's linkage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateStrategy {
    /// Update the foreign key on self.
    ToOneOwning,
    /// Move the foreign key on the single related record.
    ToOneOwned,
    /// Set-replace the foreign key across related records.
    ToMany,
    /// Diff rows of the through model.
    ToManyThrough,
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ToOneOwning => "to-one (owning)",
            Self::ToOneOwned => "to-one (owned)",
            Self::ToMany => "to-many",
            Self::ToManyThrough => "to-many (through)",
        };
        f.write_str(name)
    }
}

/// The strategy for a relation. Exactly one per kind.
pub fn detect_strategy(descriptor: &RelationDescriptor) -> UpdateStrategy {
    match descriptor.kind {
        RelationKind::BelongsTo { .. } => UpdateStrategy::ToOneOwning,
        RelationKind::HasOne { .. } => UpdateStrategy::ToOneOwned,
        RelationKind::HasMany { .. } => UpdateStrategy::ToMany,
        RelationKind::HasManyThrough { .. } => UpdateStrategy::ToManyThrough,
    }
}
