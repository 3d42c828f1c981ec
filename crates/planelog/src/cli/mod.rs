//! Command-line interface for planelog.
//!
//! This module provides the CLI structure for the `planelog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, IngestCommand, LoadOrderArg, OutputFormat, QueryCommand, StatusCommand,
};

use crate::logging::Verbosity;

/// planelog - Keep a history of every aircraft your receiver has seen
///
/// Reads ADS-B decoder snapshot files, rebuilds each aircraft's track and
/// appends observations newer than anything already stored.
#[derive(Debug, Parser)]
#[command(name = "planelog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load snapshots and append new observations to the store
    Ingest(IngestCommand),

    /// Show store statistics
    Status(StatusCommand),

    /// List stored observations in a time window
    Query(QueryCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "planelog");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["planelog", "-q", "status"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["planelog", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["planelog", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["planelog", "-vv", "status"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_ingest_defaults() {
        let cli = parse(&["planelog", "ingest"]);
        let Command::Ingest(cmd) = cli.command else {
            panic!("expected ingest");
        };
        assert!(cmd.snapshots.is_none());
        assert!(!cmd.dry_run);
        assert!(!cmd.strict);
    }

    #[test]
    fn test_parse_ingest_flags() {
        let cli = parse(&[
            "planelog",
            "ingest",
            "--snapshots",
            "/var/run/dump1090-fa",
            "--database",
            "planes.db",
            "--dry-run",
            "--strict",
            "--order",
            "mtime",
        ]);
        let Command::Ingest(cmd) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(cmd.snapshots, Some(PathBuf::from("/var/run/dump1090-fa")));
        assert_eq!(cmd.database, Some(PathBuf::from("planes.db")));
        assert!(cmd.dry_run);
        assert!(cmd.strict);
        assert_eq!(cmd.order, Some(LoadOrderArg::Mtime));
    }

    #[test]
    fn test_parse_query() {
        let cli = parse(&[
            "planelog", "query", "--since", "100", "--until", "200", "--hex", "a1b2c3", "-f",
            "json",
        ]);
        let Command::Query(cmd) = cli.command else {
            panic!("expected query");
        };
        assert_eq!(cmd.since, 100);
        assert_eq!(cmd.until, 200);
        assert_eq!(cmd.hex.as_deref(), Some("a1b2c3"));
        assert_eq!(cmd.format, OutputFormat::Json);
        assert_eq!(cmd.limit, 100);
    }

    #[test]
    fn test_parse_query_requires_window() {
        assert!(Cli::try_parse_from(["planelog", "query", "--since", "100"]).is_err());
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["planelog", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = parse(&["planelog", "config", "validate", "--file", "x.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { .. })
        ));
    }
}
