//! `SQLite` schema definitions for planelog.
//!
//! Table and index names match stores written by earlier versions of the
//! ingest scripts, so existing databases are picked up unchanged.

/// Name of the observations table.
pub const OBSERVATIONS_TABLE: &str = "plane_observations";

/// Name of the key-value metadata table.
pub const METADATA_TABLE: &str = "metadata";

/// SQL statement to create the observations table.
pub const CREATE_OBSERVATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS plane_observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hex_code TEXT,
    flight TEXT,
    time INTEGER,
    lat REAL,
    lon REAL,
    alt_baro REAL,
    alt_geom REAL,
    added INTEGER DEFAULT (strftime('%s', 'now'))
)
";

/// SQL statement to create an index on time for the high-water mark and range scans.
pub const CREATE_TIME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS time_idx ON plane_observations (time)
";

/// SQL statement to create an index on `hex_code` for per-aircraft lookups.
pub const CREATE_HEX_CODE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS hex_code_idx ON plane_observations (hex_code)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to append one observation.
pub const INSERT_OBSERVATION: &str = r"
INSERT INTO plane_observations (hex_code, flight, time, lat, lon, alt_baro, alt_geom)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
";

/// Columns an existing observations table must have to be appended to.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "id", "hex_code", "flight", "time", "lat", "lon", "alt_baro", "alt_geom",
];

/// Columns whose declared type must have a given `SQLite` affinity.
///
/// The high-water mark compares `time` as an integer, and positions are
/// read back as floats.
pub const REQUIRED_AFFINITIES: &[(&str, &str)] =
    &[("time", "INTEGER"), ("lat", "REAL"), ("lon", "REAL")];

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_OBSERVATIONS_TABLE,
    CREATE_TIME_INDEX,
    CREATE_HEX_CODE_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_observations_table_contains_required_columns() {
        for column in REQUIRED_COLUMNS {
            assert!(
                CREATE_OBSERVATIONS_TABLE.contains(column),
                "missing column {column}"
            );
        }
        assert!(CREATE_OBSERVATIONS_TABLE.contains("added INTEGER DEFAULT"));
    }

    #[test]
    fn test_indexes_target_observations_table() {
        assert!(CREATE_TIME_INDEX.contains(OBSERVATIONS_TABLE));
        assert!(CREATE_HEX_CODE_INDEX.contains(OBSERVATIONS_TABLE));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
