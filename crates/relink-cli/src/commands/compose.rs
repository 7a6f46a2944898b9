//! Compose command implementation.

use anyhow::Result;
use clap::Args;

use relink_core::{Assembler, Filter, IncludeChain};

use super::{LinkOptions, StoreArgs, model_name};
use crate::output;

#[derive(Args, Debug)]
pub struct ComposeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub links: LinkOptions,

    /// Resource type (plural wire type or model name)
    #[arg(value_name = "TYPE")]
    pub type_name: String,

    /// Resource id; omit for the whole collection
    pub id: Option<String>,

    /// Related resources to include (e.g. author,comments.author)
    #[arg(long)]
    pub include: Option<String>,

    /// Compose the resources related through this relation instead
    #[arg(long, requires = "id")]
    pub related: Option<String>,

    /// Pretty-print the document
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: ComposeArgs) -> Result<()> {
    let schema = args.store.load_schema()?;
    let repo = args.store.open(&schema)?;
    let links = args.links.build()?;
    let model = model_name(&schema, &args.type_name)?;

    let includes = match &args.include {
        Some(list) => IncludeChain::parse_list(list)?,
        None => Vec::new(),
    };

    let assembler = Assembler::new(&schema, &repo, &links);
    let document = match (&args.id, &args.related) {
        (Some(id), Some(relation)) => {
            assembler
                .related_document(&model, id, relation, &includes)
                .await?
        }
        (Some(id), None) => assembler.resource_document(&model, id, &includes).await?,
        (None, _) => {
            assembler
                .collection_document(&model, &Filter::new(), &includes)
                .await?
        }
    };

    tracing::info!(
        primary = document.primary().len(),
        included = document.included.len(),
        "Composed document"
    );

    output::json(&document, args.pretty)
}
