//! Flattening tracks into storage-ready observation rows.

use serde::{Deserialize, Serialize};

use crate::track::{AircraftTrack, TrackPoint, TrackSet};

/// One aircraft's state at one instant, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    /// Aircraft identifier.
    pub hex_code: String,
    /// Trimmed callsign, possibly empty.
    pub flight: String,
    /// Capture time floored to whole Unix seconds.
    pub time: i64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Barometric altitude in feet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_baro: Option<f64>,
    /// Geometric altitude in feet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_geom: Option<f64>,
}

impl ObservationRow {
    /// Build a row for `hex` from a track point.
    #[must_use]
    pub fn from_point(hex: &str, point: &TrackPoint) -> Self {
        Self {
            hex_code: hex.to_string(),
            flight: point.flight.clone(),
            time: floor_seconds(point.time),
            lat: point.lat,
            lon: point.lon,
            alt_baro: point.alt_baro,
            alt_geom: point.alt_geom,
        }
    }
}

/// Floor fractional seconds to a whole second.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn floor_seconds(time: f64) -> i64 {
    time.floor() as i64
}

/// Rows for a single track, in track order.
#[must_use]
pub fn flatten_track(track: &AircraftTrack) -> Vec<ObservationRow> {
    track
        .points()
        .iter()
        .map(|p| ObservationRow::from_point(track.hex(), p))
        .collect()
}

/// Flatten every track into one sequence ordered by (time, `hex_code`).
///
/// The sort is stable, so rows of one aircraft sharing a second keep their
/// track order.
#[must_use]
pub fn merge_tracks(tracks: &TrackSet) -> Vec<ObservationRow> {
    let mut rows: Vec<ObservationRow> = tracks.iter().flat_map(flatten_track).collect();
    rows.sort_by(|a, b| {
        a.time
            .cmp(&b.time)
            .then_with(|| a.hex_code.cmp(&b.hex_code))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{AircraftRecord, Snapshot};
    use std::collections::BTreeSet;

    fn positioned(hex: &str) -> AircraftRecord {
        AircraftRecord {
            hex: Some(hex.to_string()),
            lat: Some(40.0),
            lon: Some(-74.0),
            ..AircraftRecord::default()
        }
    }

    fn snapshot(now: f64, hexes: &[&str]) -> Snapshot {
        Snapshot {
            name: format!("history_{now}"),
            now,
            aircraft: hexes.iter().map(|h| positioned(h)).collect(),
        }
    }

    #[test]
    fn test_floor_seconds() {
        assert_eq!(floor_seconds(1_700_000_000.8), 1_700_000_000);
        assert_eq!(floor_seconds(1_700_000_000.2), 1_700_000_000);
        assert_eq!(floor_seconds(42.0), 42);
        assert_eq!(floor_seconds(-0.5), -1);
    }

    #[test]
    fn test_merge_orders_by_time_then_hex() {
        let snapshots = vec![
            snapshot(110.0, &["b2", "a1"]),
            snapshot(100.0, &["c3", "a1"]),
        ];
        let tracks = TrackSet::reconstruct(&snapshots).unwrap();
        let rows = merge_tracks(&tracks);

        let keys: Vec<(i64, &str)> = rows.iter().map(|r| (r.time, r.hex_code.as_str())).collect();
        assert_eq!(
            keys,
            vec![(100, "a1"), (100, "c3"), (110, "a1"), (110, "b2")]
        );
    }

    #[test]
    fn test_merge_floors_capture_time() {
        let tracks = TrackSet::reconstruct(&[snapshot(1_700_000_000.8, &["a1"])]).unwrap();
        let rows = merge_tracks(&tracks);
        assert_eq!(rows[0].time, 1_700_000_000);
    }

    #[test]
    fn test_merge_same_second_keeps_track_order() {
        let mut first = positioned("a1");
        first.flight = Some("FIRST".to_string());
        let mut second = positioned("a1");
        second.flight = Some("SECOND".to_string());
        let snapshots = vec![
            Snapshot {
                name: "s0".to_string(),
                now: 100.2,
                aircraft: vec![first],
            },
            Snapshot {
                name: "s1".to_string(),
                now: 100.7,
                aircraft: vec![second],
            },
        ];
        let rows = merge_tracks(&TrackSet::reconstruct(&snapshots).unwrap());

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].flight, "FIRST");
        assert_eq!(rows[1].flight, "SECOND");
        assert_eq!(rows[0].time, rows[1].time);
    }

    #[test]
    fn test_identifier_set_matches_positioned_records() {
        let mut no_position = positioned("z9");
        no_position.lat = None;
        let snapshots = vec![
            Snapshot {
                name: "s0".to_string(),
                now: 1.0,
                aircraft: vec![positioned("a1"), no_position],
            },
            snapshot(2.0, &["b2"]),
        ];
        let rows = merge_tracks(&TrackSet::reconstruct(&snapshots).unwrap());
        let ids: BTreeSet<&str> = rows.iter().map(|r| r.hex_code.as_str()).collect();
        assert_eq!(ids, BTreeSet::from(["a1", "b2"]));
    }

    #[test]
    fn test_merge_floors_into_shared_seconds() {
        let tracks = TrackSet::reconstruct(&[
            snapshot(100.0, &["a1", "a2"]),
            snapshot(105.5, &["a1"]),
            snapshot(105.9, &["a2"]),
        ])
        .unwrap();
        let rows = merge_tracks(&tracks);
        assert_eq!(rows.len(), 4);
        let times: Vec<i64> = rows.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![100, 100, 105, 105]);
    }

    #[test]
    fn test_row_serialization_omits_absent_altitude() {
        let row = ObservationRow {
            hex_code: "a1".to_string(),
            flight: String::new(),
            time: 1,
            lat: 1.0,
            lon: 2.0,
            alt_baro: None,
            alt_geom: Some(100.0),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("alt_baro"));
        assert!(json.contains("alt_geom"));
    }
}
