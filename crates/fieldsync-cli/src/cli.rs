use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fieldsync")]
#[command(about = "Inspect and sync the offline inspection store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List cached inspections, newest first
    #[command(alias = "ls")]
    Inspections {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sync queue items in every state
    Queue {
        /// Only show items for this inspection
        #[arg(long, value_name = "ID")]
        inspection: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push pending changes for one inspection, or for every inspection with queued work
    Sync {
        /// Inspection ID
        id: Option<i64>,
        /// Advance the remote status once everything is pushed
        #[arg(long, requires = "id")]
        finish: bool,
    },
    /// Queue a finish request that the next sync pass carries out
    Finish {
        /// Inspection ID
        id: i64,
    },
    /// Delete an inspection and all of its offline data
    #[command(alias = "rm")]
    Delete {
        /// Inspection ID
        id: i64,
    },
    /// Remove finished items from the sync queue
    ClearDone,
}
