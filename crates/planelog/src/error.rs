//! Error types for planelog.
//!
//! This module defines all error types used throughout the planelog crate.
//! Variants are grouped by the stage of the ingest pipeline that raises them.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for planelog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Snapshot Errors ===
    /// A snapshot file could not be parsed.
    #[error("failed to parse snapshot {path}: {source}")]
    SnapshotParse {
        /// Path to the snapshot file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A snapshot file could not be read.
    #[error("failed to read snapshot {path}: {source}")]
    SnapshotRead {
        /// Path to the snapshot file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot directory does not exist or is not a directory.
    #[error("snapshot directory not found: {path}")]
    SnapshotDirMissing {
        /// Path that was expected to be a directory.
        path: PathBuf,
    },

    /// The snapshot file pattern is not a valid glob.
    #[error("invalid snapshot file pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying error.
        #[source]
        source: glob::PatternError,
    },

    // === Integrity Errors ===
    /// A track is not in chronological order after sorting.
    #[error("track {hex} out of order at point {index}")]
    TrackOutOfOrder {
        /// Aircraft identifier.
        hex: String,
        /// Index of the first point earlier than its predecessor.
        index: usize,
    },

    /// A row at or below the store's high-water mark was about to be written.
    #[error("refusing to store observation at time {time}: high-water mark is {high_water_mark}")]
    StaleObservation {
        /// Time of the rejected row.
        time: i64,
        /// The store's high-water mark.
        high_water_mark: i64,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// An existing store does not have the expected layout.
    #[error("incompatible store schema: {message}")]
    SchemaMismatch {
        /// Description of the mismatch.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for planelog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a schema mismatch error.
    #[must_use]
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }

    /// Check if this error came from a malformed or unreadable snapshot file.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::SnapshotParse { .. } | Self::SnapshotRead { .. })
    }

    /// Check if this error reports violated ordering of tracks or stored rows.
    #[must_use]
    pub fn is_integrity_anomaly(&self) -> bool {
        matches!(
            self,
            Self::TrackOutOfOrder { .. } | Self::StaleObservation { .. }
        )
    }

    /// Check if this error reports an unusable store layout.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. } | Self::DatabaseMigration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<i32>("not valid json").unwrap_err()
    }

    #[test]
    fn test_snapshot_parse_display() {
        let err = Error::SnapshotParse {
            path: PathBuf::from("/var/run/dump1090-fa/history_3.json"),
            source: json_error(),
        };
        let msg = err.to_string();
        assert!(msg.contains("history_3.json"));
        assert!(err.is_parse_error());
        assert!(!err.is_integrity_anomaly());
    }

    #[test]
    fn test_snapshot_read_is_parse_error() {
        let err = Error::SnapshotRead {
            path: PathBuf::from("history_0.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_snapshot_dir_missing_display() {
        let err = Error::SnapshotDirMissing {
            path: PathBuf::from("/nonexistent/dump1090"),
        };
        assert!(err.to_string().contains("/nonexistent/dump1090"));
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_track_out_of_order() {
        let err = Error::TrackOutOfOrder {
            hex: "a1b2c3".to_string(),
            index: 4,
        };
        assert_eq!(err.to_string(), "track a1b2c3 out of order at point 4");
        assert!(err.is_integrity_anomaly());
    }

    #[test]
    fn test_stale_observation() {
        let err = Error::StaleObservation {
            time: 100,
            high_water_mark: 110,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("110"));
        assert!(err.is_integrity_anomaly());
        assert!(!err.is_schema_error());
    }

    #[test]
    fn test_schema_mismatch() {
        let err = Error::schema_mismatch("missing column lat");
        assert_eq!(
            err.to_string(),
            "incompatible store schema: missing column lat"
        );
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_database_migration_is_schema_error() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_invalid_pattern_display() {
        let source = glob::Pattern::new("history_[.json").unwrap_err();
        let err = Error::InvalidPattern {
            pattern: "history_[.json".to_string(),
            source,
        };
        assert!(err.to_string().contains("history_[.json"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "file_pattern must not be empty".to_string(),
        };
        assert!(err.to_string().contains("file_pattern"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
