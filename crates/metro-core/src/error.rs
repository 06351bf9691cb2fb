use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the metro status bot.
#[derive(Error, Debug)]
pub enum MetroError {
    /// A required setting was not supplied on the command line or environment.
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A configuration value is present but invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A line name did not match any known metro line.
    #[error("Unknown line: {0}")]
    UnknownLine(String),

    /// The status page could not be downloaded.
    #[error("Failed to fetch status page {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The status page was downloaded but did not have the expected shape.
    #[error("Failed to parse status page: {0}")]
    Parse(String),

    /// The persisted state file exists but could not be read.
    #[error("Failed to read state file {path}: {source}")]
    StateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted state file could not be written.
    #[error("Failed to write state file {path}: {source}")]
    StateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted state file is not a valid snapshot document.
    #[error("Malformed state file {path}: {source}")]
    StateFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the metro crates.
pub type Result<T> = std::result::Result<T, MetroError>;
