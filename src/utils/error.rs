//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort loading a trace
///
/// No engine is ever returned alongside one of these.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON deserialization failed: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Trace must be a JSON object")]
    NotAnObject,

    #[error("Missing required section: {0}")]
    MissingSection(&'static str),

    #[error("Malformed section '{section}': {source}")]
    MalformedSection {
        section: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid globals: {0}")]
    InvalidGlobals(String),
}

/// Errors that can occur while querying a loaded trace
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to write CSV: {0}")]
    CsvFailed(#[from] csv::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
