//! Logging setup for planelog.
//!
//! Ingest progress (files skipped, rows merged, rows inserted) is logged
//! through `tracing` to stderr. Reports printed by the commands go to
//! stdout, so `planelog ingest --json` output stays parseable while logs
//! are on.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much the ingester logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// Errors only; skipped snapshot warnings are hidden too.
    Quiet,
    /// Per-run summaries and skipped snapshot warnings.
    #[default]
    Normal,
    /// Store opens, schema checks and per-file detail.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Verbosity selected by `-q` and a count of `-v` flags. `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter used when `RUST_LOG` is unset: planelog at the chosen level,
    /// other crates at warn.
    #[must_use]
    pub fn filter_directive(&self) -> String {
        format!("warn,planelog={}", self.to_level_filter())
    }

    /// Module targets are only printed from `-v` up.
    #[must_use]
    pub fn shows_targets(&self) -> bool {
        *self >= Self::Verbose
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `verbosity` when set; a second call is a no-op.
///
/// # Examples
///
/// ```no_run
/// use planelog::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity.shows_targets())
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}

/// Route warnings to the test harness's captured output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
