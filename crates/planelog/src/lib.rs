//! `planelog` - Incremental history of ADS-B receiver snapshots
//!
//! This library loads decoder snapshot files, rebuilds a chronological
//! track per aircraft, merges the tracks into one ordered stream of
//! observations and appends the new ones to a `SQLite` store.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod snapshot;
pub mod storage;
pub mod track;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use merge::{merge_tracks, ObservationRow};
pub use pipeline::{run, RunMode, RunOptions, RunOutcome};
pub use snapshot::{load_dir, AircraftRecord, LoadOptions, LoadOrder, LoadReport, Snapshot};
pub use storage::{AppendReport, Store, StoreStats};
pub use track::{AircraftTrack, TrackPoint, TrackSet};
