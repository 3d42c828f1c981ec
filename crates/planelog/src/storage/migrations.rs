//! Database schema bootstrap and versioning for planelog.
//!
//! Creates the observations table and its indexes when absent, refuses
//! stores whose existing table lacks a required column, and tracks the
//! schema version in the `metadata` table.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Error, Result};

use super::schema::{
    METADATA_TABLE, OBSERVATIONS_TABLE, REQUIRED_AFFINITIES, REQUIRED_COLUMNS, SCHEMA_STATEMENTS,
};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Checks any existing observations table for compatibility, creates all
/// tables and indexes that don't exist yet, then runs pending migrations.
///
/// # Errors
///
/// Returns [`Error::SchemaMismatch`] if an existing table is incompatible
/// or the store was written by a newer schema version, and a database
/// error if creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    check_existing_layout(conn)?;

    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::schema_mismatch(format!(
            "store has schema version {version}, newest supported is {CURRENT_VERSION}"
        )));
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Check an existing store without writing to it.
///
/// Used for read-only opens: the observations table must exist with a
/// compatible layout, and a recorded schema version must not be newer than
/// [`CURRENT_VERSION`]. Unversioned stores are accepted.
///
/// # Errors
///
/// Returns [`Error::SchemaMismatch`] if the store cannot be read safely.
pub fn verify_schema(conn: &Connection) -> Result<()> {
    if table_columns(conn, OBSERVATIONS_TABLE)?.is_empty() {
        return Err(Error::schema_mismatch(format!(
            "no {OBSERVATIONS_TABLE} table in store"
        )));
    }
    check_existing_layout(conn)?;

    if !table_columns(conn, METADATA_TABLE)?.is_empty() {
        let version = get_schema_version(conn)?;
        if version > CURRENT_VERSION {
            return Err(Error::schema_mismatch(format!(
                "store has schema version {version}, newest supported is {CURRENT_VERSION}"
            )));
        }
    }
    Ok(())
}

/// Name and declared type of each column of `table`, empty if the table
/// does not exist.
fn table_columns(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Type affinity `SQLite` gives a column declared as `declared`.
///
/// Follows the rules of section 3.1 of the `SQLite` datatype documentation,
/// applied in the same order.
fn affinity(declared: &str) -> &'static str {
    let declared = declared.to_ascii_uppercase();
    if declared.contains("INT") {
        "INTEGER"
    } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| declared.contains(t)) {
        "TEXT"
    } else if declared.is_empty() || declared.contains("BLOB") {
        "BLOB"
    } else if ["REAL", "FLOA", "DOUB"].iter().any(|t| declared.contains(t)) {
        "REAL"
    } else {
        "NUMERIC"
    }
}

/// Fail if an observations table exists without the columns we write, or
/// with a key column declared under the wrong type.
fn check_existing_layout(conn: &Connection) -> Result<()> {
    let columns = table_columns(conn, OBSERVATIONS_TABLE)?;
    if columns.is_empty() {
        return Ok(());
    }
    let declared_type = |name: &str| {
        columns
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(name))
            .map(|(_, declared)| declared.as_str())
    };

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|&required| declared_type(required).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(Error::schema_mismatch(format!(
            "table {OBSERVATIONS_TABLE} is missing columns: {}",
            missing.join(", ")
        )));
    }

    for &(column, expected) in REQUIRED_AFFINITIES {
        let declared = declared_type(column).unwrap_or_default();
        if affinity(declared) != expected {
            return Err(Error::schema_mismatch(format!(
                "column {OBSERVATIONS_TABLE}.{column} is declared '{declared}', expected {expected}"
            )));
        }
    }

    debug!("Existing {} table is compatible", OBSERVATIONS_TABLE);
    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database or one created before
/// versioning).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        debug!("Migrating store schema to version {}", current);
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Version 1 is the base layout created by `SCHEMA_STATEMENTS`; unversioned
/// stores with a compatible table are adopted as-is.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)?;
    Ok(())
}
