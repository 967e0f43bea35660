//! Error types for configuration, run execution and preset lookup.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Startup failures. Any of these stops the process before it binds a socket.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found or unreadable: {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("missing config value `{key}` in sections {sections:?}")]
    MissingValue {
        key: String,
        sections: Vec<String>,
    },

    #[error("invalid value for `{key}`: {message}")]
    InvalidValue { key: String, message: String },

    #[error("report generator not found: {0}")]
    ExeNotFound(PathBuf),

    #[error("cannot create reports directory {path}: {source}")]
    ReportsBase {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot resolve path {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Request-level failures of a run. A generator that exits non-zero is not an
/// error; it produces a failed `AnalysisResult`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Competitor is required.")]
    MissingCompetitor,

    #[error("Execution timed out after {}.", humantime::format_duration(*.0))]
    TimedOut(Duration),

    #[error("Failed to execute {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    /// True for errors caused by user input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, AnalysisError::MissingCompetitor)
    }
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("preset lookup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
