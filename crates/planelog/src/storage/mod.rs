//! Storage layer for planelog.
//!
//! This module provides the `SQLite`-backed observation store. The store is
//! append-only: rows are only ever added, and only when they are newer than
//! everything already stored (the high-water mark). That rule is what makes
//! re-running an ingest over overlapping snapshot files safe.

pub mod migrations;
pub mod schema;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::merge::ObservationRow;

use schema::INSERT_OBSERVATION;

const SELECT_OBSERVATION_COLUMNS: &str =
    "SELECT hex_code, flight, time, lat, lon, alt_baro, alt_geom FROM plane_observations";

/// Persistent store of observation rows.
#[derive(Debug)]
pub struct Store {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection, held for the lifetime of the store.
    conn: Connection,
}

/// Outcome of an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AppendReport {
    /// Number of rows written.
    pub rows_inserted: usize,
    /// Number of distinct time values among the written rows.
    pub distinct_times: usize,
    /// High-water mark before the append.
    pub previous_high_water_mark: i64,
    /// High-water mark after the append.
    pub high_water_mark: i64,
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Total number of stored rows.
    pub total_rows: i64,
    /// Number of distinct aircraft.
    pub aircraft: i64,
    /// Earliest stored observation time.
    pub first_time: Option<i64>,
    /// Latest stored observation time (0 when empty).
    pub high_water_mark: i64,
    /// When rows were last ingested.
    pub last_ingested_at: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

impl Store {
    /// Open or create a store at the given path.
    ///
    /// Creates parent directories and the database file if they don't
    /// exist, along with the observations table and its indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, or if an existing
    /// database has an incompatible layout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!("Journal mode {}", journal_mode);

        migrations::initialize_schema(&conn)?;

        info!("Store opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Open an existing store for inspection only.
    ///
    /// Nothing is created or written: no journal mode change, no schema
    /// bootstrap. The layout is still checked so that reads fail early on an
    /// incompatible store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, or if it lacks a
    /// compatible observations table.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        debug!("Opening store at {} read-only", path.display());
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        migrations::verify_schema(&conn)?;

        Ok(Self { path, conn })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The latest stored observation time, or 0 for an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn high_water_mark(&self) -> Result<i64> {
        read_high_water_mark(&self.conn)
    }

    /// Append the rows that are newer than the high-water mark.
    ///
    /// Rows at or below the mark are skipped; the rest are written in
    /// their given order within a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails, in which case nothing is stored.
    pub fn persist_new(&mut self, rows: &[ObservationRow]) -> Result<AppendReport> {
        let tx = self.conn.transaction()?;
        let mark = read_high_water_mark(&tx)?;
        let fresh = rows.iter().filter(|r| r.time > mark);
        let report = insert_rows(&tx, mark, fresh)?;
        tx.commit()?;

        info!(
            "Inserted {} rows for {} time observations (high-water mark {} -> {})",
            report.rows_inserted,
            report.distinct_times,
            report.previous_high_water_mark,
            report.high_water_mark
        );
        Ok(report)
    }

    /// Append all rows, which must all be newer than the high-water mark.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleObservation`] if any row is at or below the
    /// mark; the whole append is rolled back.
    pub fn append(&mut self, rows: &[ObservationRow]) -> Result<AppendReport> {
        let tx = self.conn.transaction()?;
        let mark = read_high_water_mark(&tx)?;
        let report = insert_rows(&tx, mark, rows)?;
        tx.commit()?;
        debug!("Appended {} rows", report.rows_inserted);
        Ok(report)
    }

    /// Count stored rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM plane_observations", [], |row| {
                    row.get(0)
                })?;
        Ok(count)
    }

    /// Rows with `start <= time <= end`, ordered by time then identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn observations_between(&self, start: i64, end: i64) -> Result<Vec<ObservationRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_OBSERVATION_COLUMNS} WHERE time >= ?1 AND time <= ?2 ORDER BY time, hex_code, id"
        ))?;
        let rows = stmt
            .query_map(params![start, end], Self::row_to_observation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Distinct observation times with `start <= time <= end`, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn distinct_times_between(&self, start: i64, end: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT DISTINCT time FROM plane_observations
            WHERE time >= ?1 AND time <= ?2 ORDER BY time
            ",
        )?;
        let times = stmt
            .query_map(params![start, end], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(times)
    }

    /// All rows for one aircraft, ordered by time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn observations_for(&self, hex_code: &str) -> Result<Vec<ObservationRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_OBSERVATION_COLUMNS} WHERE hex_code = ?1 ORDER BY time, id"
        ))?;
        let rows = stmt
            .query_map([hex_code], Self::row_to_observation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let (total_rows, aircraft, first_time): (i64, i64, Option<i64>) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT hex_code), MIN(time) FROM plane_observations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let high_water_mark = self.high_water_mark()?;

        let last_added: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(added) FROM plane_observations",
                [],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        let last_ingested_at = last_added.and_then(|secs| DateTime::from_timestamp(secs, 0));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            total_rows,
            aircraft,
            first_time,
            high_water_mark,
            last_ingested_at,
            db_size_bytes,
        })
    }

    /// Convert a database row to an observation.
    fn row_to_observation(row: &rusqlite::Row) -> rusqlite::Result<ObservationRow> {
        let hex_code: Option<String> = row.get(0)?;
        let flight: Option<String> = row.get(1)?;
        Ok(ObservationRow {
            hex_code: hex_code.unwrap_or_default(),
            flight: flight.unwrap_or_default(),
            time: row.get(2)?,
            lat: row.get(3)?,
            lon: row.get(4)?,
            alt_baro: numeric_or_absent(row.get_ref(5)?),
            alt_geom: numeric_or_absent(row.get_ref(6)?),
        })
    }
}

/// Stores written before planelog may hold decoder strings such as
/// `'ground'` in altitude columns; those read back as absent.
#[allow(clippy::cast_precision_loss)]
fn numeric_or_absent(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Null | ValueRef::Text(_) | ValueRef::Blob(_) => None,
    }
}

fn read_high_water_mark(conn: &Connection) -> Result<i64> {
    let mark: i64 = conn.query_row(
        "SELECT COALESCE(MAX(time), 0) FROM plane_observations",
        [],
        |row| row.get(0),
    )?;
    Ok(mark)
}

/// Insert rows inside an open transaction, refusing any row at or below `mark`.
fn insert_rows<'a>(
    conn: &Connection,
    mark: i64,
    rows: impl IntoIterator<Item = &'a ObservationRow>,
) -> Result<AppendReport> {
    let mut stmt = conn.prepare(INSERT_OBSERVATION)?;
    let mut rows_inserted = 0;
    let mut times = BTreeSet::new();

    for row in rows {
        if row.time <= mark {
            return Err(Error::StaleObservation {
                time: row.time,
                high_water_mark: mark,
            });
        }
        stmt.execute(params![
            row.hex_code,
            row.flight,
            row.time,
            row.lat,
            row.lon,
            row.alt_baro,
            row.alt_geom,
        ])?;
        rows_inserted += 1;
        times.insert(row.time);
    }

    Ok(AppendReport {
        rows_inserted,
        distinct_times: times.len(),
        previous_high_water_mark: mark,
        high_water_mark: times.last().copied().map_or(mark, |t| t.max(mark)),
    })
}
