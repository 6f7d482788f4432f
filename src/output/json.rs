//! JSON summary output writer.
//!
//! Writes TraceSummary structs to JSON files with proper formatting.

use super::validate_path;
use crate::engine::TraceSummary;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a summary to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_summary(summary: &TraceSummary, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing summary to: {}", output_path.display());
    validate_path(output_path)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!("Cannot create directory {}: {}", parent.display(), e))
            })?;
        }
    }

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.flush()?;

    info!(
        "Summary written successfully ({} bytes)",
        std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0)
    );

    Ok(())
}

/// Read a summary back from a JSON file
pub fn read_summary(input_path: impl AsRef<Path>) -> Result<TraceSummary, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading summary from: {}", input_path.display());

    let file = File::open(input_path)?;
    let summary: TraceSummary = serde_json::from_reader(file)?;

    debug!("Summary loaded: version {}", summary.version);
    Ok(summary)
}
