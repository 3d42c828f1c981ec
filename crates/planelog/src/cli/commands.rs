//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::snapshot::LoadOrder;

/// Ingest command arguments.
#[derive(Debug, Args)]
pub struct IngestCommand {
    /// Directory holding decoder snapshot files
    #[arg(short, long, value_name = "DIR")]
    pub snapshots: Option<PathBuf>,

    /// Path to the observation store
    #[arg(short, long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Glob matched against snapshot file names
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Order in which snapshots are processed
    #[arg(long, value_enum)]
    pub order: Option<LoadOrderArg>,

    /// Build the merged observations without writing to the store
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Abort on the first malformed snapshot instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Output the run summary as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Path to the observation store
    #[arg(short, long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Query command arguments.
#[derive(Debug, Args)]
pub struct QueryCommand {
    /// Start of the time window (Unix seconds, inclusive)
    #[arg(long)]
    pub since: i64,

    /// End of the time window (Unix seconds, inclusive)
    #[arg(long)]
    pub until: i64,

    /// Only show this aircraft
    #[arg(long)]
    pub hex: Option<String>,

    /// Maximum number of rows
    #[arg(short, long, default_value = "100")]
    pub limit: usize,

    /// Path to the observation store
    #[arg(short, long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Snapshot processing order argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoadOrderArg {
    /// By embedded capture time
    CaptureTime,
    /// By file modification time
    Mtime,
    /// By file name
    Name,
}

impl From<LoadOrderArg> for LoadOrder {
    fn from(arg: LoadOrderArg) -> Self {
        match arg {
            LoadOrderArg::CaptureTime => Self::CaptureTime,
            LoadOrderArg::Mtime => Self::Mtime,
            LoadOrderArg::Name => Self::Name,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
