//! Relationship command implementation.

use anyhow::Result;
use clap::Args;

use relink_core::Assembler;

use super::{LinkOptions, StoreArgs, model_name};
use crate::output;

#[derive(Args, Debug)]
pub struct RelationshipArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub links: LinkOptions,

    /// Resource type (plural wire type or model name)
    #[arg(value_name = "TYPE")]
    pub type_name: String,

    /// Resource id
    pub id: String,

    /// Relation name
    pub relation: String,

    /// Pretty-print the document
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: RelationshipArgs) -> Result<()> {
    let schema = args.store.load_schema()?;
    let repo = args.store.open(&schema)?;
    let links = args.links.build()?;
    let model = model_name(&schema, &args.type_name)?;

    let document = Assembler::new(&schema, &repo, &links)
        .relationship_document(&model, &args.id, &args.relation)
        .await?;

    output::json(&document, args.pretty)
}
