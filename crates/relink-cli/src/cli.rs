//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::compose::ComposeArgs;
use crate::commands::link::LinkArgs;
use crate::commands::relations::RelationsArgs;
use crate::commands::relationship::RelationshipArgs;

/// Compose JSON:API documents and apply relationship updates.
#[derive(Parser, Debug)]
#[command(name = "relink")]
#[command(author, version = env!("RELINK_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose a resource or collection document
    Compose(ComposeArgs),

    /// Show the linkage of one relationship
    Relationship(RelationshipArgs),

    /// Apply a relationship document and save the data file
    Link(LinkArgs),

    /// List the resolved relations of a type
    Relations(RelationsArgs),
}
