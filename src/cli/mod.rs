pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "truthfeed")]
#[command(about = "Follow a live post feed from the terminal", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/truthfeed/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overrides [api] base_url
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the latest posts and keep printing new ones as they arrive
    Watch {
        /// Start from an empty feed instead of fetching the snapshot
        #[arg(long)]
        no_snapshot: bool,
    },
    /// Print the latest posts once
    Snapshot {
        /// Print raw JSON records instead of text
        #[arg(long)]
        json: bool,
    },
    /// Normalize a post body (from the argument or stdin)
    Render {
        /// HTML body; read from stdin when omitted
        body: Option<String>,

        /// Print plain text instead of JSON segments
        #[arg(long)]
        text: bool,
    },
}
