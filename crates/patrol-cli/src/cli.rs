use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "patrol")]
#[command(about = "Review and submit shop-floor inspection records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Seconds to wait for the request lock
    #[arg(long, global = true, value_name = "SECS", default_value = "10")]
    pub lock_timeout: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every inspection record
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the inspection history of one part number
    History {
        /// Part number to filter by
        part_no: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set review fields on an existing record
    Update(UpdateArgs),
    /// Submit a new inspection record
    Upload(UploadArgs),
    /// Send a raw JSON request to the dispatcher
    Request {
        /// JSON request body, or `-` to read it from stdin
        body: String,
    },
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Timestamp of the record(s) to update
    #[arg(long)]
    pub timestamp: String,
    /// Part number (required unless --all)
    #[arg(long)]
    pub part_no: Option<String>,
    /// New review status
    #[arg(long)]
    pub status: Option<String>,
    /// Manager comment
    #[arg(long)]
    pub comment: Option<String>,
    /// Change point description
    #[arg(long)]
    pub change_point: Option<String>,
    /// Update every record sharing the timestamp
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct UploadArgs {
    #[arg(long)]
    pub timestamp: String,
    #[arg(long)]
    pub part_no: String,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub part_name: Option<String>,
    #[arg(long)]
    pub inspection_type: Option<String>,
    /// Numeric values are stored as numbers
    #[arg(long)]
    pub weight: Option<String>,
    #[arg(long)]
    pub length: Option<String>,
    /// `true` / `false` are stored as booleans
    #[arg(long)]
    pub material_ok: Option<String>,
    #[arg(long)]
    pub change_point: Option<String>,
    #[arg(long)]
    pub action_taken: Option<String>,
    /// Initial review status (defaults to unreviewed)
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub result: Option<String>,
    /// Photo file to attach
    #[arg(long, value_name = "FILE")]
    pub photo: Option<PathBuf>,
    /// Photo folder id
    #[arg(long, value_name = "ID")]
    pub folder: Option<String>,
}
