//! fieldsync CLI - inspect and sync the offline inspection store
//!
//! Lists what is cached and queued on this device and runs sync passes
//! against the remote inspection API.

mod cli;
mod commands;
mod error;

use clap::Parser;
use fieldsync_core::{shared_store, ClientConfig, InspectionId};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::clear_done::run_clear_done;
use crate::commands::common::default_db_path;
use crate::commands::delete::run_delete;
use crate::commands::finish::run_finish;
use crate::commands::inspections::run_inspections;
use crate::commands::queue::run_queue;
use crate::commands::sync::run_sync;
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
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fieldsync=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(db_path) = cli.db_path {
        config.db_path = Some(db_path);
    }
    if config.db_path.is_none() {
        config.db_path = Some(default_db_path()?);
    }
    tracing::debug!("Resolved client configuration: {config:?}");

    let store = shared_store(&config.store_config())?;

    match cli.command {
        Commands::Inspections { json } => run_inspections(store.as_ref(), json)?,
        Commands::Queue { inspection, json } => {
            run_queue(store.as_ref(), inspection.map(InspectionId::new), json)?;
        }
        Commands::Sync { id, finish } => {
            run_sync(&config, store, id.map(InspectionId::new), finish).await?;
        }
        Commands::Finish { id } => run_finish(store.as_ref(), InspectionId::new(id))?,
        Commands::Delete { id } => run_delete(store.as_ref(), InspectionId::new(id))?,
        Commands::ClearDone => run_clear_done(store.as_ref())?,
    }

    Ok(())
}
