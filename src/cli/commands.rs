//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Firestore tap CLI
#[derive(Parser, Debug)]
#[command(name = "tap-firestore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog file (JSON), used by `read` instead of discovery
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List collections to prove the store is reachable
    Check,

    /// Print the catalog of available streams
    Discover,

    /// Read every document of the selected streams
    Read {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,
    },
}

impl Commands {
    /// Stream names selected for `read`, if any
    pub fn selected_streams(&self) -> Vec<String> {
        match self {
            Self::Read {
                streams: Some(list),
            } => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}
