//! Patrol CLI - review and submit inspection records from the terminal
//!
//! Runs the same dispatcher as the HTTP service against a local database.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::{open_dispatcher, resolve_db_path};
use crate::commands::history::run_history;
use crate::commands::list::run_list;
use crate::commands::request::run_request;
use crate::commands::update::run_update;
use crate::commands::upload::run_upload;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("patrol_cli=warn,patrol_core=warn")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let dispatcher = open_dispatcher(&db_path, Duration::from_secs(cli.lock_timeout))?;

    match cli.command {
        Commands::List { json } => run_list(&dispatcher, json).await,
        Commands::History { part_no, json } => run_history(&dispatcher, &part_no, json).await,
        Commands::Update(args) => run_update(&dispatcher, &args).await,
        Commands::Upload(args) => run_upload(&dispatcher, &args).await,
        Commands::Request { body } => run_request(&dispatcher, &body).await,
    }
}
