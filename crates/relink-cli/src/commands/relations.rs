//! Relations command implementation.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use relink_core::{RelationDescriptor, RelationKind, UpdateStrategy, detect_strategy};

use super::{load_schema, model_name};
use crate::output;

#[derive(Args, Debug)]
pub struct RelationsArgs {
    /// Schema definition file (JSON)
    #[arg(long, env = "RELINK_SCHEMA")]
    pub schema: PathBuf,

    /// Resource type (plural wire type or model name)
    #[arg(value_name = "TYPE")]
    pub type_name: String,

    /// Output descriptors as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RelationRow<'a> {
    #[serde(flatten)]
    descriptor: &'a RelationDescriptor,
    strategy: UpdateStrategy,
}

pub fn run(args: RelationsArgs) -> Result<()> {
    let schema = load_schema(&args.schema)?;
    let model = schema.model(&model_name(&schema, &args.type_name)?)?;

    if args.json {
        let rows: Vec<RelationRow<'_>> = model
            .relations()
            .values()
            .map(|descriptor| RelationRow {
                descriptor,
                strategy: detect_strategy(descriptor),
            })
            .collect();
        return output::json(&rows, true);
    }

    output::heading(&format!("{} ({})", model.name(), model.plural()));
    for (name, descriptor) in model.relations() {
        let target = descriptor
            .related_type
            .as_deref()
            .unwrap_or("<polymorphic>");
        let storage = match &descriptor.kind {
            RelationKind::BelongsTo { foreign_key } => {
                format!("belongsTo {} via {}", target, foreign_key)
            }
            RelationKind::HasOne { foreign_key } => {
                format!("hasOne {} via {}", target, foreign_key)
            }
            RelationKind::HasMany { foreign_key } => {
                format!("hasMany {} via {}", target, foreign_key)
            }
            RelationKind::HasManyThrough {
                through,
                key_through_self,
                key_through_related,
            } => format!(
                "hasMany {} through {} ({}, {})",
                target, through, key_through_self, key_through_related
            ),
        };
        let discriminator = descriptor
            .discriminator()
            .map(|d| format!(", discriminator {}", d))
            .unwrap_or_default();
        output::field(
            name,
            &format!("{}{} [{}]", storage, discriminator, detect_strategy(descriptor)),
        );
    }

    Ok(())
}
