//! Output writers for trace data.
//!
//! This module handles writing data to disk in various formats:
//! - CSV dumps of the timeline, global peak and leaks
//! - JSON summaries

pub mod csv;
pub mod json;

// Re-export main functions
pub use self::csv::{dump_all, dump_global_peak, dump_leaks, dump_timeline, CsvPaths};
pub use self::json::{read_summary, write_summary};

use crate::utils::error::OutputError;
use std::path::Path;

/// Common path validation for output files
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}
