//! Link command implementation.

use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::Args;

use relink_core::{Error, GraphMutator, IncomingDocument, Repository};
use relink_memory::WriteOp;

use super::{StoreArgs, model_name};
use crate::output;

#[derive(Args, Debug)]
pub struct LinkArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Resource type (plural wire type or model name)
    #[arg(value_name = "TYPE")]
    pub type_name: String,

    /// Resource id
    pub id: String,

    /// JSON file with the document (use - or omit for stdin)
    #[arg(long)]
    pub json: Option<String>,

    /// Relation to replace when the document is bare linkage
    #[arg(long)]
    pub relation: Option<String>,

    /// Apply the changes without saving the data file
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(args: LinkArgs) -> Result<()> {
    let schema = args.store.load_schema()?;
    let repo = args.store.open(&schema)?;
    let name = model_name(&schema, &args.type_name)?;
    let model = schema.model(&name)?;

    let content = match args.json.as_deref() {
        None | Some("-") => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        }
        Some(path) => std::fs::read_to_string(path).context("Failed to read JSON file")?,
    };
    let document: IncomingDocument = content.parse()?;

    let self_id = model.id_value(&args.id).ok_or_else(|| Error::ResourceNotFound {
        type_name: name.clone(),
        id: args.id.clone(),
    })?;
    if repo.find_by_id(&name, &self_id).await?.is_none() {
        return Err(Error::ResourceNotFound {
            type_name: name,
            id: args.id,
        }
        .into());
    }

    let mutator = GraphMutator::new(&schema, &repo);
    let applied = match document {
        IncomingDocument::Resource(resource) => {
            let resource_model = schema.model_for_wire_type(&resource.type_name);
            if resource_model.map(|m| m.name()) != Some(model.name()) {
                return Err(Error::InvalidDocument {
                    pointer: "/data/type".to_string(),
                    message: format!(
                        "expected type '{}', got '{}'",
                        model.plural(),
                        resource.type_name
                    ),
                }
                .into());
            }
            if resource.id.as_deref().is_some_and(|id| id != args.id) {
                return Err(Error::InvalidDocument {
                    pointer: "/data/id".to_string(),
                    message: format!("expected id '{}'", args.id),
                }
                .into());
            }
            mutator
                .link(model.name(), &args.id, &resource.relationships)
                .await?;
            resource.relationships.len()
        }
        IncomingDocument::Linkage(linkage) => {
            let relation = args
                .relation
                .as_deref()
                .context("A relationship document needs --relation")?;
            let descriptor = schema.resolve(model.name(), relation)?;
            mutator
                .apply_relationship(model.name(), &self_id, descriptor, &linkage)
                .await?;
            1
        }
    };

    let journal = repo.journal().await;
    if !args.dry_run {
        repo.snapshot()
            .await
            .save(&args.store.data)
            .with_context(|| format!("Failed to save data file {}", args.store.data.display()))?;
    }

    output::success(&format!(
        "Applied {} relationship(s) to {} {}",
        applied,
        model.plural(),
        args.id
    ));
    output::heading(&format!("{} write(s)", journal.len()));
    for event in &journal {
        let op = match event.op {
            WriteOp::Create => "create",
            WriteOp::Update => "update",
            WriteOp::Delete => "delete",
        };
        let target = match &event.id {
            Some(id) => format!("{} {}", event.type_name, id),
            None => format!("{} ({} removed)", event.type_name, event.affected),
        };
        output::field(op, &target);
    }

    Ok(())
}
