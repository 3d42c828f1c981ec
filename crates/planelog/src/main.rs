//! `planelog` - CLI for the planelog ingester
//!
//! This binary ingests decoder snapshot directories into the observation
//! store and offers a few read-only views of what has been stored.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use planelog::cli::{Cli, Command, ConfigCommand, IngestCommand, OutputFormat, QueryCommand};
use planelog::{init_logging, Config, RunMode, RunOptions, Store};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Ingest(cmd) => handle_ingest(&config, cmd),
        Command::Status(cmd) => handle_status(&config, cmd.database, cmd.json),
        Command::Query(cmd) => handle_query(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn handle_ingest(config: &Config, cmd: IngestCommand) -> anyhow::Result<()> {
    let mut load = config.load_options();
    if let Some(pattern) = cmd.pattern {
        load.pattern = pattern;
    }
    if let Some(order) = cmd.order {
        load.order = order.into();
    }
    load.strict |= cmd.strict;

    let options = RunOptions {
        snapshot_dir: cmd
            .snapshots
            .unwrap_or_else(|| config.ingest.snapshot_dir.clone()),
        database_path: cmd.database.unwrap_or_else(|| config.database_path()),
        load,
        mode: if cmd.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Commit
        },
    };

    let outcome = planelog::run(&options)
        .with_context(|| format!("ingesting {}", options.snapshot_dir.display()))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "Loaded {} snapshots ({} skipped), {} aircraft, {} observations",
        outcome.snapshots_loaded,
        outcome.warnings.len(),
        outcome.aircraft,
        outcome.merged_rows()
    );
    for warning in &outcome.warnings {
        println!("  skipped {}: {}", warning.path.display(), warning.message);
    }
    match outcome.append {
        Some(report) => println!(
            "Inserting {} rows for {} time observations.",
            report.rows_inserted, report.distinct_times
        ),
        None => println!("Dry run: store not modified."),
    }
    Ok(())
}

fn handle_status(config: &Config, database: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let path = database.unwrap_or_else(|| config.database_path());
    if !path.exists() {
        anyhow::bail!("no store at {}", path.display());
    }
    let store = Store::open_read_only(&path)?;
    let stats = store.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("planelog status");
        println!("---------------");
        println!("Store:          {}", path.display());
        println!("Observations:   {}", stats.total_rows);
        println!("Aircraft:       {}", stats.aircraft);
        if let Some(first) = stats.first_time {
            println!("Time range:     {} .. {}", first, stats.high_water_mark);
        }
        println!("High-water:     {}", stats.high_water_mark);
        if let Some(at) = stats.last_ingested_at {
            println!("Last ingest:    {}", at.to_rfc3339());
        }
        println!("Size (bytes):   {}", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_query(config: &Config, cmd: &QueryCommand) -> anyhow::Result<()> {
    let path = cmd
        .database
        .clone()
        .unwrap_or_else(|| config.database_path());
    if !path.exists() {
        anyhow::bail!("no store at {}", path.display());
    }
    let store = Store::open_read_only(&path)?;

    let rows: Vec<_> = store
        .observations_between(cmd.since, cmd.until)?
        .into_iter()
        .filter(|r| cmd.hex.as_deref().map_or(true, |h| r.hex_code == h))
        .take(cmd.limit)
        .collect();

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for r in &rows {
                println!(
                    "{:>10}  {:<6}  {:<8}  {:>9.4}  {:>10.4}  {:>6}",
                    r.time,
                    r.hex_code,
                    r.flight,
                    r.lat,
                    r.lon,
                    r.alt_baro.map_or_else(|| "-".to_string(), |a| a.to_string()),
                );
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Ingest]");
                println!("  Snapshot dir:   {}", config.ingest.snapshot_dir.display());
                println!("  File pattern:   {}", config.ingest.file_pattern);
                println!("  Strict:         {}", config.ingest.strict);
                println!("  Load order:     {}", config.ingest.load_order);
                println!();
                println!("[Storage]");
                println!("  Database path:  {}", config.database_path().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
