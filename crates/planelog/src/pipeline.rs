//! One ingest run: load, reconstruct, merge and persist.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::merge::{merge_tracks, ObservationRow};
use crate::snapshot::{load_dir, LoadOptions, LoadWarning};
use crate::storage::{AppendReport, Store};
use crate::track::TrackSet;

/// Whether a run writes to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Append new rows to the store.
    #[default]
    Commit,
    /// Build the merged rows without touching the store.
    DryRun,
}

/// Inputs of an ingest run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding snapshot files.
    pub snapshot_dir: PathBuf,
    /// Path of the observation store.
    pub database_path: PathBuf,
    /// Snapshot loading options.
    pub load: LoadOptions,
    /// Commit or dry run.
    pub mode: RunMode,
}

/// Result of an ingest run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Number of snapshot files parsed.
    pub snapshots_loaded: usize,
    /// Snapshot files that were skipped.
    pub warnings: Vec<LoadWarning>,
    /// Number of aircraft with at least one positioned observation.
    pub aircraft: usize,
    /// The full merged observation sequence, ordered by (time, identifier).
    #[serde(skip)]
    pub rows: Vec<ObservationRow>,
    /// Store outcome; `None` for a dry run.
    pub append: Option<AppendReport>,
}

impl RunOutcome {
    /// Number of merged rows, stored or not.
    #[must_use]
    pub fn merged_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Load and merge snapshots without touching any store.
///
/// # Errors
///
/// Returns loader errors (missing directory, bad pattern, or a malformed
/// file in strict mode) and integrity errors from track sorting.
pub fn prepare(options: &RunOptions) -> Result<RunOutcome> {
    let report = load_dir(&options.snapshot_dir, &options.load)?;
    let tracks = TrackSet::reconstruct(&report.snapshots)?;
    let rows = merge_tracks(&tracks);

    info!(
        "Merged {} observations of {} aircraft from {} snapshots",
        rows.len(),
        tracks.len(),
        report.snapshots.len()
    );

    Ok(RunOutcome {
        snapshots_loaded: report.snapshots.len(),
        warnings: report.warnings,
        aircraft: tracks.len(),
        rows,
        append: None,
    })
}

/// Run the full pipeline, persisting into `store` unless this is a dry run.
///
/// # Errors
///
/// Returns any error from [`prepare`] or from the store append.
pub fn run_with_store(options: &RunOptions, store: &mut Store) -> Result<RunOutcome> {
    let mut outcome = prepare(options)?;
    if options.mode == RunMode::Commit {
        outcome.append = Some(store.persist_new(&outcome.rows)?);
    }
    Ok(outcome)
}

/// Run the full pipeline, opening the store at `options.database_path`.
///
/// In dry-run mode the store is never opened or created.
///
/// # Errors
///
/// Returns any error from [`prepare`], from opening the store, or from
/// the append.
pub fn run(options: &RunOptions) -> Result<RunOutcome> {
    match options.mode {
        RunMode::DryRun => {
            info!("Dry run: store at {} left untouched", options.database_path.display());
            prepare(options)
        }
        RunMode::Commit => {
            let mut outcome = prepare(options)?;
            let mut store = Store::open(&options.database_path)?;
            outcome.append = Some(store.persist_new(&outcome.rows)?);
            Ok(outcome)
        }
    }
}
