use clap::{Parser, Subcommand};
use mediadex_common::ContentHint;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediadex")]
#[command(author, version, about = "Media catalog that watches folders and enriches files from TMDB")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch registered folders and ingest new files until interrupted
    Watch,

    /// Force-scan a folder, or a single file inside it
    Scan {
        /// Folder to scan
        #[arg(required = true)]
        folder: PathBuf,

        /// Scan only this file (absolute, or relative to the folder)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Rescan every registered folder
    Rescan,

    /// Re-resolve items without catalog metadata and merge duplicate shows
    Refresh,

    /// Manage the watched folder registry
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },

    /// Show how a file name is classified
    Classify {
        file_name: String,
    },

    /// Show the search title and year extracted from a file name
    CleanTitle {
        file_name: String,
    },

    /// Show catalog row counts
    Stats,
}

#[derive(Subcommand)]
pub enum FolderAction {
    /// Register a folder
    Add {
        path: PathBuf,

        /// What the folder holds: movies, tv or mixed
        #[arg(long, default_value_t = ContentHint::Mixed)]
        content: ContentHint,
    },

    /// List registered folders
    List,

    /// Unregister a folder
    Remove {
        path: PathBuf,
    },
}
