use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cost_center_tool")]
#[command(about = "Manage GitHub Enterprise billing cost centers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file with GITHUB_ENTERPRISE, GITHUB_TOKEN, COST_CENTER_ID, ...
    #[arg(long = "env", value_name = "PATH", global = true)]
    pub env_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the enterprise's cost centers
    List {
        /// Only show cost centers in this state (active, deleted)
        #[arg(long)]
        state: Option<String>,

        /// Output format (table, detailed, json, csv)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Add the users listed in USERS_CSV_FILE to the cost center
    AddUsers(MutateArgs),

    /// Remove the users listed in REMOVE_USERS_CSV_FILE from the cost center
    RemoveUsers(MutateArgs),
}

#[derive(Args, Debug)]
pub struct MutateArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Treat the first row as data even if it starts with "user"
    #[arg(long)]
    pub no_header_detection: bool,
}
