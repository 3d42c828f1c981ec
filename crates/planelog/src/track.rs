//! Per-aircraft flight tracks.
//!
//! Tracks are rebuilt from scratch on every run: [`TrackSet::reconstruct`]
//! folds all loaded snapshots into one [`AircraftTrack`] per identifier,
//! sorts each track by time and then hands out read-only access.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::snapshot::{AircraftRecord, Snapshot};

/// One positioned observation of an aircraft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPoint {
    /// Capture time in (possibly fractional) Unix seconds.
    pub time: f64,
    /// Trimmed callsign, empty when not reported.
    pub flight: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Barometric altitude in feet.
    pub alt_baro: Option<f64>,
    /// Geometric altitude in feet.
    pub alt_geom: Option<f64>,
}

impl TrackPoint {
    /// Build a point from a record captured at `time`.
    ///
    /// Returns `None` unless the record carries both latitude and longitude.
    #[must_use]
    pub fn from_record(time: f64, record: &AircraftRecord) -> Option<Self> {
        let (lat, lon) = record.position()?;
        Some(Self {
            time,
            flight: record
                .flight
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            lat,
            lon,
            alt_baro: record.alt_baro,
            alt_geom: record.alt_geom,
        })
    }
}

/// Column-wise view of a track, derived from its points.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackColumns {
    /// Capture times.
    pub time: Vec<f64>,
    /// Callsigns.
    pub flight: Vec<String>,
    /// Latitudes.
    pub lat: Vec<f64>,
    /// Longitudes.
    pub lon: Vec<f64>,
    /// Barometric altitudes.
    pub alt_baro: Vec<Option<f64>>,
    /// Geometric altitudes.
    pub alt_geom: Vec<Option<f64>>,
}

/// The chronological sequence of observations for one aircraft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftTrack {
    hex: String,
    points: Vec<TrackPoint>,
}

impl AircraftTrack {
    /// Create an empty track.
    #[must_use]
    pub fn new(hex: impl Into<String>) -> Self {
        Self {
            hex: hex.into(),
            points: Vec::new(),
        }
    }

    /// The aircraft identifier.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Points in their current order.
    #[must_use]
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the track has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append the record as a new point if it has a position.
    ///
    /// Returns whether a point was added.
    pub fn push_record(&mut self, time: f64, record: &AircraftRecord) -> bool {
        match TrackPoint::from_record(time, record) {
            Some(point) => {
                self.points.push(point);
                true
            }
            None => false,
        }
    }

    /// Stable sort by time; points with equal time keep insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrackOutOfOrder`] if the result is not chronological.
    pub fn sort_chronologically(&mut self) -> Result<()> {
        self.points.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.verify_order()
    }

    /// Check that times never decrease.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrackOutOfOrder`] naming the first offending point.
    pub fn verify_order(&self) -> Result<()> {
        match self
            .points
            .windows(2)
            .position(|w| w[1].time.total_cmp(&w[0].time).is_lt())
        {
            Some(i) => Err(Error::TrackOutOfOrder {
                hex: self.hex.clone(),
                index: i + 1,
            }),
            None => Ok(()),
        }
    }

    /// Project the points into per-field columns.
    #[must_use]
    pub fn columns(&self) -> TrackColumns {
        let mut columns = TrackColumns::default();
        for p in &self.points {
            columns.time.push(p.time);
            columns.flight.push(p.flight.clone());
            columns.lat.push(p.lat);
            columns.lon.push(p.lon);
            columns.alt_baro.push(p.alt_baro);
            columns.alt_geom.push(p.alt_geom);
        }
        columns
    }
}

/// All reconstructed tracks, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSet {
    tracks: BTreeMap<String, AircraftTrack>,
}

impl TrackSet {
    /// Fold snapshots, in the given order, into sorted per-aircraft tracks.
    ///
    /// Records without an identifier, or without both latitude and
    /// longitude, are dropped. Identifiers that never had a position do
    /// not get a track.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrackOutOfOrder`] if a track fails its post-sort check.
    pub fn reconstruct(snapshots: &[Snapshot]) -> Result<Self> {
        let mut tracks: BTreeMap<String, AircraftTrack> = BTreeMap::new();
        let mut discarded = 0_usize;

        for snapshot in snapshots {
            for record in &snapshot.aircraft {
                let Some(hex) = record.hex.as_deref() else {
                    continue;
                };
                if record.position().is_none() {
                    discarded += 1;
                    continue;
                }
                tracks
                    .entry(hex.to_string())
                    .or_insert_with(|| AircraftTrack::new(hex))
                    .push_record(snapshot.now, record);
            }
        }

        for track in tracks.values_mut() {
            track.sort_chronologically()?;
        }

        debug!(
            "Reconstructed {} tracks from {} snapshots ({} position-less records dropped)",
            tracks.len(),
            snapshots.len(),
            discarded
        );
        Ok(Self { tracks })
    }

    /// Look up one aircraft's track.
    #[must_use]
    pub fn get(&self, hex: &str) -> Option<&AircraftTrack> {
        self.tracks.get(hex)
    }

    /// Iterate tracks in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &AircraftTrack> {
        self.tracks.values()
    }

    /// Identifiers in sorted order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.tracks.keys().map(String::as_str)
    }

    /// Number of tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether there are no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total number of points across all tracks.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.tracks.values().map(AircraftTrack::len).sum()
    }

    /// Columnar projection of one aircraft's track.
    #[must_use]
    pub fn columns(&self, hex: &str) -> Option<TrackColumns> {
        self.get(hex).map(AircraftTrack::columns)
    }
}
