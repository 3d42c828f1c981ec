//! Snapshot loading for planelog.
//!
//! A snapshot is one capture of every aircraft the receiver decoder is
//! currently tracking, written as a JSON file such as
//! `/var/run/dump1090-fa/history_12.json`:
//!
//! ```json
//! { "now": 1700000000.8, "messages": 1234,
//!   "aircraft": [ { "hex": "a1b2c3", "flight": "UAL12  ", "lat": 40.6, "lon": -73.8,
//!                   "alt_baro": 3500, "alt_geom": 3650 } ] }
//! ```
//!
//! Files are parsed in parallel and then ordered by their embedded capture
//! time, so results do not depend on file modification times.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default filename pattern for decoder history files.
pub const DEFAULT_FILE_PATTERN: &str = "history_*.json";

/// One aircraft entry inside a snapshot.
///
/// Every field is optional in decoder output. Fields other than the ones
/// below are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftRecord {
    /// ICAO hex identifier. Records without one are never ingested.
    #[serde(default)]
    pub hex: Option<String>,
    /// Flight callsign, usually space padded.
    #[serde(default)]
    pub flight: Option<String>,
    /// Latitude in degrees.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude in degrees.
    #[serde(default)]
    pub lon: Option<f64>,
    /// Barometric altitude in feet.
    ///
    /// Decoders report `"ground"` here for aircraft on the ground; any
    /// non-numeric value is read as absent.
    #[serde(default, deserialize_with = "numeric_or_absent")]
    pub alt_baro: Option<f64>,
    /// Geometric altitude in feet.
    #[serde(default, deserialize_with = "numeric_or_absent")]
    pub alt_geom: Option<f64>,
}

impl AircraftRecord {
    /// The position of this record, if both coordinates are present.
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }
}

fn numeric_or_absent<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

/// A single capture of all visible aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Filename stem of the file this snapshot was read from.
    #[serde(skip)]
    pub name: String,
    /// Capture time in (possibly fractional) Unix seconds.
    pub now: f64,
    /// Aircraft visible at capture time.
    pub aircraft: Vec<AircraftRecord>,
}

impl Snapshot {
    /// Parse a snapshot from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the text is not a valid snapshot.
    pub fn from_json(name: impl Into<String>, json: &str) -> serde_json::Result<Self> {
        let mut snapshot: Snapshot = serde_json::from_str(json)?;
        snapshot.name = name.into();
        Ok(snapshot)
    }

    /// Read and parse a snapshot file, naming it after the file stem.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SnapshotRead`] if the file can't be read and
    /// [`Error::SnapshotParse`] if it isn't a valid snapshot.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::SnapshotRead {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_json(name, &text).map_err(|source| Error::SnapshotParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Order in which loaded snapshots are handed to track reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOrder {
    /// By embedded capture time, ties broken by file name.
    #[default]
    CaptureTime,
    /// By file modification time, ties broken by file name.
    Mtime,
    /// By file name.
    Name,
}

impl std::fmt::Display for LoadOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CaptureTime => write!(f, "capture_time"),
            Self::Mtime => write!(f, "mtime"),
            Self::Name => write!(f, "name"),
        }
    }
}

/// Options for [`load_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Glob matched against file names in the snapshot directory.
    pub pattern: String,
    /// Abort on the first malformed file instead of skipping it.
    pub strict: bool,
    /// Processing order of the loaded snapshots.
    pub order: LoadOrder,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_FILE_PATTERN.to_string(),
            strict: false,
            order: LoadOrder::default(),
        }
    }
}

/// A snapshot file that was skipped during a lenient load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadWarning {
    /// The skipped file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub message: String,
}

/// Result of loading a snapshot directory.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Successfully parsed snapshots, in processing order.
    pub snapshots: Vec<Snapshot>,
    /// Files that were skipped.
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    /// Number of snapshot files that were matched, including skipped ones.
    #[must_use]
    pub fn files_seen(&self) -> usize {
        self.snapshots.len() + self.warnings.len()
    }
}

struct Loaded {
    snapshot: Snapshot,
    modified: Option<SystemTime>,
}

/// Load every snapshot file in `dir` whose name matches `options.pattern`.
///
/// # Errors
///
/// Returns [`Error::SnapshotDirMissing`] if `dir` is not a directory,
/// [`Error::InvalidPattern`] for a bad glob, and in strict mode the parse
/// error of the first malformed file (by file name).
pub fn load_dir(dir: &Path, options: &LoadOptions) -> Result<LoadReport> {
    if !dir.is_dir() {
        return Err(Error::SnapshotDirMissing {
            path: dir.to_path_buf(),
        });
    }

    let paths = matching_files(dir, &options.pattern)?;
    debug!(
        "Found {} snapshot files matching '{}' in {}",
        paths.len(),
        options.pattern,
        dir.display()
    );

    let parsed: Vec<(PathBuf, Result<Loaded>)> = paths
        .into_par_iter()
        .map(|path| {
            let loaded = Snapshot::read(&path).map(|snapshot| Loaded {
                snapshot,
                modified: fs::metadata(&path).and_then(|m| m.modified()).ok(),
            });
            (path, loaded)
        })
        .collect();

    let mut loaded = Vec::with_capacity(parsed.len());
    let mut warnings = Vec::new();
    for (path, result) in parsed {
        match result {
            Ok(l) => loaded.push(l),
            Err(e) if options.strict => return Err(e),
            Err(e) => {
                warn!("Skipping snapshot {}: {}", path.display(), e);
                warnings.push(LoadWarning {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    match options.order {
        LoadOrder::CaptureTime => loaded.sort_by(|a, b| {
            a.snapshot
                .now
                .total_cmp(&b.snapshot.now)
                .then_with(|| a.snapshot.name.cmp(&b.snapshot.name))
        }),
        LoadOrder::Mtime => loaded.sort_by(|a, b| match (a.modified, b.modified) {
            (Some(x), Some(y)) => x.cmp(&y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        LoadOrder::Name => {}
    }

    let snapshots: Vec<Snapshot> = loaded.into_iter().map(|l| l.snapshot).collect();
    info!(
        "Loaded {} snapshots from {} ({} skipped)",
        snapshots.len(),
        dir.display(),
        warnings.len()
    );
    Ok(LoadReport {
        snapshots,
        warnings,
    })
}

/// Regular files in `dir` whose file name matches `pattern`, sorted by name.
fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = glob::Pattern::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| matcher.matches(n));
        if matches {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn snapshot_json(now: f64) -> String {
        format!(r#"{{"now": {now}, "aircraft": [{{"hex": "a1", "lat": 1.0, "lon": 2.0}}]}}"#)
    }

    #[test]
    fn test_parse_full_record() {
        let json = r#"{
            "now": 1700000000.8,
            "messages": 99,
            "aircraft": [
                {"hex": "a1b2c3", "flight": "UAL12   ", "lat": 40.6, "lon": -73.8,
                 "alt_baro": 3500, "alt_geom": 3650.5, "rssi": -20.1}
            ]
        }"#;
        let snapshot = Snapshot::from_json("history_0", json).unwrap();

        assert_eq!(snapshot.name, "history_0");
        assert!((snapshot.now - 1_700_000_000.8).abs() < 1e-6);
        let record = &snapshot.aircraft[0];
        assert_eq!(record.hex.as_deref(), Some("a1b2c3"));
        assert_eq!(record.flight.as_deref(), Some("UAL12   "));
        assert_eq!(record.position(), Some((40.6, -73.8)));
        assert_eq!(record.alt_baro, Some(3500.0));
        assert_eq!(record.alt_geom, Some(3650.5));
    }

    #[test]
    fn test_parse_sparse_record() {
        let json = r#"{"now": 10, "aircraft": [{"hex": "abc"}, {}]}"#;
        let snapshot = Snapshot::from_json("s", json).unwrap();

        assert_eq!(snapshot.aircraft.len(), 2);
        assert_eq!(snapshot.aircraft[0].position(), None);
        assert!(snapshot.aircraft[1].hex.is_none());
    }

    #[test]
    fn test_ground_altitude_is_absent() {
        let json = r#"{"now": 10, "aircraft": [{"hex": "abc", "alt_baro": "ground", "alt_geom": null}]}"#;
        let snapshot = Snapshot::from_json("s", json).unwrap();

        assert_eq!(snapshot.aircraft[0].alt_baro, None);
        assert_eq!(snapshot.aircraft[0].alt_geom, None);
    }

    #[test]
    fn test_missing_now_is_error() {
        assert!(Snapshot::from_json("s", r#"{"aircraft": []}"#).is_err());
    }

    #[test]
    fn test_missing_aircraft_is_error() {
        assert!(Snapshot::from_json("s", r#"{"now": 1.0}"#).is_err());
    }

    #[test]
    fn test_read_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "history_7.json", &snapshot_json(5.0));

        let snapshot = Snapshot::read(&dir.path().join("history_7.json")).unwrap();
        assert_eq!(snapshot.name, "history_7");
    }

    #[test]
    fn test_read_malformed_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "history_1.json", "{ not json");

        let err = Snapshot::read(&dir.path().join("history_1.json")).unwrap_err();
        assert!(matches!(err, Error::SnapshotParse { .. }));
    }

    #[test]
    fn test_load_dir_missing() {
        let err = load_dir(Path::new("/nonexistent/dump1090"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::SnapshotDirMissing { .. }));
    }

    #[test]
    fn test_load_dir_invalid_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let options = LoadOptions {
            pattern: "history_[.json".to_string(),
            ..LoadOptions::default()
        };
        let err = load_dir(dir.path(), &options).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_load_dir_filters_by_pattern() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "history_0.json", &snapshot_json(1.0));
        write(dir.path(), "receiver.json", &snapshot_json(2.0));
        write(dir.path(), "history_1.txt", &snapshot_json(3.0));
        fs::create_dir(dir.path().join("history_dir.json")).unwrap();

        let report = load_dir(dir.path(), &LoadOptions::default()).unwrap();
        assert_eq!(report.snapshots.len(), 1);
        assert_eq!(report.snapshots[0].name, "history_0");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_load_dir_orders_by_capture_time() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "history_0.json", &snapshot_json(300.0));
        write(dir.path(), "history_1.json", &snapshot_json(100.0));
        write(dir.path(), "history_2.json", &snapshot_json(200.0));

        let report = load_dir(dir.path(), &LoadOptions::default()).unwrap();
        let names: Vec<&str> = report.snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["history_1", "history_2", "history_0"]);
    }

    #[test]
    fn test_load_dir_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "history_b.json", &snapshot_json(100.0));
        write(dir.path(), "history_a.json", &snapshot_json(200.0));

        let options = LoadOptions {
            order: LoadOrder::Name,
            ..LoadOptions::default()
        };
        let report = load_dir(dir.path(), &options).unwrap();
        let names: Vec<&str> = report.snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["history_a", "history_b"]);
    }

    #[test]
    fn test_load_dir_lenient_skips_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "history_0.json", &snapshot_json(1.0));
        write(dir.path(), "history_1.json", "{ truncated");
        write(dir.path(), "history_2.json", &snapshot_json(2.0));

        let report = load_dir(dir.path(), &LoadOptions::default()).unwrap();
        assert_eq!(report.snapshots.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].path.ends_with("history_1.json"));
        assert_eq!(report.files_seen(), 3);
    }

    #[test]
    fn test_load_dir_strict_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "history_0.json", &snapshot_json(1.0));
        write(dir.path(), "history_1.json", "{ truncated");

        let options = LoadOptions {
            strict: true,
            ..LoadOptions::default()
        };
        let err = load_dir(dir.path(), &options).unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_load_order_display() {
        assert_eq!(LoadOrder::CaptureTime.to_string(), "capture_time");
        assert_eq!(LoadOrder::Mtime.to_string(), "mtime");
        assert_eq!(LoadOrder::Name.to_string(), "name");
    }

    #[test]
    fn test_load_options_default() {
        let options = LoadOptions::default();
        assert_eq!(options.pattern, "history_*.json");
        assert!(!options.strict);
        assert_eq!(options.order, LoadOrder::CaptureTime);
    }
}
