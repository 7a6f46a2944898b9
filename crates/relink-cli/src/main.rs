//! relink - CLI tool for JSON:API relationship documents.
//!
//! A thin wrapper over `relink-core` and `relink-memory`: composes
//! documents from a schema and a JSON snapshot of records, and applies
//! inbound relationship documents back to the snapshot.

mod cli;
mod commands;
mod config;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match commands::handle(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Library errors also go to stdout as a JSON:API errors document.
            if let Some(relink_err) = err.downcast_ref::<relink_core::Error>() {
                let _ = output::json(&relink_err.to_document(), false);
            }
            output::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
