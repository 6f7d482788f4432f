//! Loader for MALT JSON trace documents.
//!
//! Reads the whole document into memory, checks that every required
//! top-level section is present and then deserializes each section into
//! its raw schema type. Any failure aborts the load.

use super::schema::{RawGlobals, RawLeak, RawSites, RawStacks, RawTimeline};
use crate::utils::config::REQUIRED_SECTIONS;
use crate::utils::error::LoadError;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;

/// All sections of a trace, deserialized but not yet indexed
#[derive(Debug, Clone)]
pub struct RawTrace {
    pub globals: RawGlobals,
    pub sites: RawSites,
    pub stacks: RawStacks,
    pub timeline: RawTimeline,
    pub leaks: Vec<RawLeak>,
}

/// Read and parse a trace file
///
/// The file is read completely before parsing starts.
///
/// # Errors
/// * `LoadError::ReadFailed` - the file cannot be read
/// * any error from [`parse_trace_str`]
pub fn read_trace_file(path: impl AsRef<Path>) -> Result<RawTrace, LoadError> {
    let path = path.as_ref();
    info!("Reading {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Read {} bytes from {}", content.len(), path.display());
    parse_trace_str(&content)
}

/// Parse a trace from JSON text
pub fn parse_trace_str(content: &str) -> Result<RawTrace, LoadError> {
    let value: Value = serde_json::from_str(content)?;
    parse_trace(value)
}

/// Parse a trace from an already decoded JSON value
///
/// # Errors
/// * `LoadError::NotAnObject` - the document root is not an object
/// * `LoadError::MissingSection` - a required section is absent
/// * `LoadError::MalformedSection` - a section does not match its schema
/// * `LoadError::InvalidGlobals` - `ticksPerSecond` is not a positive number
pub fn parse_trace(value: Value) -> Result<RawTrace, LoadError> {
    let Value::Object(mut root) = value else {
        return Err(LoadError::NotAnObject);
    };

    check_sections(&root)?;

    let globals: RawGlobals = take_section(&mut root, "globals")?;
    if !(globals.ticks_per_second.is_finite() && globals.ticks_per_second > 0.0) {
        return Err(LoadError::InvalidGlobals(format!(
            "ticksPerSecond must be positive, found {}",
            globals.ticks_per_second
        )));
    }

    let trace = RawTrace {
        globals,
        sites: take_section(&mut root, "sites")?,
        stacks: take_section(&mut root, "stacks")?,
        timeline: take_section(&mut root, "timeline")?,
        leaks: take_section(&mut root, "leaks")?,
    };

    debug!(
        "Parsed trace: {} strings, {} call sites, {} stacks, {} samples, {} leaks",
        trace.sites.strings.len(),
        trace.sites.instr.len(),
        trace.stacks.stats.len(),
        trace.timeline.memory_timeline.values.len(),
        trace.leaks.len()
    );

    Ok(trace)
}

/// Check the document shape without deserializing any section
///
/// **Public** - used by the validate command for a quick pre-check
pub fn validate_trace_format(value: &Value) -> Result<(), LoadError> {
    match value {
        Value::Object(root) => check_sections(root),
        _ => Err(LoadError::NotAnObject),
    }
}

fn check_sections(root: &Map<String, Value>) -> Result<(), LoadError> {
    match REQUIRED_SECTIONS.iter().find(|name| !root.contains_key(**name)) {
        Some(missing) => Err(LoadError::MissingSection(*missing)),
        None => Ok(()),
    }
}

/// Remove a section from the root and deserialize it
fn take_section<T: DeserializeOwned>(
    root: &mut Map<String, Value>,
    section: &'static str,
) -> Result<T, LoadError> {
    let value = root
        .remove(section)
        .ok_or(LoadError::MissingSection(section))?;

    serde_json::from_value(value).map_err(|source| LoadError::MalformedSection { section, source })
}
