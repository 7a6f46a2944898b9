//! Subcommand implementations.

pub mod compose;
pub mod link;
pub mod relations;
pub mod relationship;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use relink_core::{LinkBuilder, Schema};
use relink_memory::{MemoryRepository, Snapshot};

use crate::cli::Commands;
use crate::config::Config;

pub async fn handle(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Compose(args) => compose::run(args).await,
        Commands::Relationship(args) => relationship::run(args).await,
        Commands::Link(args) => link::run(args).await,
        Commands::Relations(args) => relations::run(args),
    }
}

/// Schema and data file options.
#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Schema definition file (JSON)
    #[arg(long, env = "RELINK_SCHEMA")]
    pub schema: PathBuf,

    /// Data snapshot file (JSON object of model name to records)
    #[arg(long, env = "RELINK_DATA")]
    pub data: PathBuf,
}

impl StoreArgs {
    pub fn load_schema(&self) -> Result<Schema> {
        load_schema(&self.schema)
    }

    pub fn open(&self, schema: &Schema) -> Result<MemoryRepository> {
        let snapshot = Snapshot::load(&self.data)
            .with_context(|| format!("Failed to load data file {}", self.data.display()))?;
        Ok(MemoryRepository::from_snapshot(schema, snapshot))
    }
}

/// Link generation options.
#[derive(Args, Debug)]
pub struct LinkOptions {
    /// Absolute host for links (e.g. http://localhost:3000)
    #[arg(long, env = "RELINK_HOST")]
    pub host: Option<String>,

    /// Path prefix for links (e.g. /api)
    #[arg(long, env = "RELINK_BASE_PATH")]
    pub base_path: Option<String>,
}

impl LinkOptions {
    pub fn build(self) -> Result<LinkBuilder> {
        Config::load()?.link_builder(self.host, self.base_path)
    }
}

pub fn load_schema(path: &Path) -> Result<Schema> {
    Schema::from_path(path).with_context(|| format!("Failed to load schema {}", path.display()))
}

/// The model addressed by a wire type or model name.
pub fn model_name(schema: &Schema, type_name: &str) -> Result<String> {
    Ok(schema
        .model_for_wire_type(type_name)
        .ok_or_else(|| relink_core::Error::UnknownType {
            type_name: type_name.to_string(),
        })?
        .name()
        .to_string())
}
