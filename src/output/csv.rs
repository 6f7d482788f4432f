//! CSV export of the timeline, global peak and leaks.
//!
//! Each dump writes a header row and one row per entity. The location
//! column holds the flattened stack. Passing `None` as the destination
//! streams the CSV to standard output instead of a file.

use super::validate_path;
use crate::engine::MaltTrace;
use crate::utils::config::BYTES_PER_MB;
use crate::utils::error::OutputError;
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Paths written by [`dump_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPaths {
    pub timeline: PathBuf,
    pub global_peak: PathBuf,
    pub leaks: PathBuf,
}

impl CsvPaths {
    /// `<base>_timeline.csv`, `<base>_globalPeak.csv`, `<base>_leaks.csv`
    pub fn for_base(base: &Path) -> Self {
        let with_suffix = |suffix: &str| {
            let mut name = base.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };
        Self {
            timeline: with_suffix("_timeline.csv"),
            global_peak: with_suffix("_globalPeak.csv"),
            leaks: with_suffix("_leaks.csv"),
        }
    }

    /// Paths next to a trace file, with its extension stripped
    pub fn for_trace(trace_path: &Path) -> Self {
        Self::for_base(&trace_path.with_extension(""))
    }
}

/// Write all three CSV dumps
pub fn dump_all(trace: &MaltTrace, paths: &CsvPaths) -> Result<(), OutputError> {
    dump_timeline(trace, Some(paths.timeline.as_path()))?;
    dump_global_peak(trace, Some(paths.global_peak.as_path()))?;
    dump_leaks(trace, Some(paths.leaks.as_path()))?;
    Ok(())
}

/// Dump the timeline with time in seconds and the active stack
pub fn dump_timeline(trace: &MaltTrace, path: Option<&Path>) -> Result<(), OutputError> {
    write_to(path, |w| write_timeline(trace, w))
}

/// Dump every stack that held memory at the global peak
pub fn dump_global_peak(trace: &MaltTrace, path: Option<&Path>) -> Result<(), OutputError> {
    write_to(path, |w| write_global_peak(trace, w))
}

/// Dump every leak with its stack
pub fn dump_leaks(trace: &MaltTrace, path: Option<&Path>) -> Result<(), OutputError> {
    write_to(path, |w| write_leaks(trace, w))
}

/// Timeline rows: `time(s), request, <fields...>, location`
///
/// `request` is the change of the first field since the previous sample.
pub fn write_timeline<W: Write>(trace: &MaltTrace, writer: W) -> Result<(), OutputError> {
    let mut csv = csv_writer(writer);
    let timeline = trace.timeline();

    let mut header = vec!["time(s)".to_string(), "request".to_string()];
    header.extend(timeline.fields().iter().cloned());
    header.push("location".to_string());
    csv.write_record(&header)?;

    let mut last_value = 0.0;
    for sample in timeline.samples() {
        let location = match &sample.stack_id {
            Some(id) => trace.flatten_stack_by_id(id),
            None => String::new(),
        };

        let mut row = Vec::with_capacity(sample.values.len() + 3);
        row.push(sample.t.to_string());
        row.push((sample.first_value() - last_value).to_string());
        row.extend(sample.values.iter().map(f64::to_string));
        row.push(location);
        csv.write_record(&row)?;

        last_value = sample.first_value();
    }

    csv.flush()?;
    Ok(())
}

/// Global peak rows: `Memory(MB), location`
pub fn write_global_peak<W: Write>(trace: &MaltTrace, writer: W) -> Result<(), OutputError> {
    let mut csv = csv_writer(writer);
    csv.write_record(["Memory(MB)", "location"])?;

    for stat in trace.stats().iter().filter(|s| s.global_peak > 0) {
        csv.write_record([
            megabytes(stat.global_peak),
            trace.flatten_stack(&stat.stack),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Leak rows: `Memory(MB), count, location`
pub fn write_leaks<W: Write>(trace: &MaltTrace, writer: W) -> Result<(), OutputError> {
    let mut csv = csv_writer(writer);
    csv.write_record(["Memory(MB)", "count", "location"])?;

    for leak in trace.leaks() {
        csv.write_record([
            megabytes(leak.memory),
            leak.count.to_string(),
            trace.flatten_stack(&leak.stack),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

/// Text columns are quoted, numeric ones are not
fn csv_writer<W: Write>(writer: W) -> Writer<W> {
    WriterBuilder::new()
        .quote_style(QuoteStyle::NonNumeric)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer)
}

fn megabytes(bytes: u64) -> String {
    format!("{:.3}", bytes as f64 / BYTES_PER_MB)
}

/// Run `write` against a file, or against stdout when `path` is `None`
fn write_to<F>(path: Option<&Path>, write: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), OutputError>,
{
    match path {
        Some(path) => {
            validate_path(path)?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.exists() {
                    debug!("Creating parent directories: {}", parent.display());
                    std::fs::create_dir_all(parent)?;
                }
            }

            let mut writer = BufWriter::new(File::create(path)?);
            write(&mut writer)?;
            writer.flush()?;
            info!("✓ Written: {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)?;
            lock.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_for_trace() {
        let paths = CsvPaths::for_trace(Path::new("/tmp/run/malt-app-1234.json"));
        assert_eq!(paths.timeline, PathBuf::from("/tmp/run/malt-app-1234_timeline.csv"));
        assert_eq!(paths.global_peak, PathBuf::from("/tmp/run/malt-app-1234_globalPeak.csv"));
        assert_eq!(paths.leaks, PathBuf::from("/tmp/run/malt-app-1234_leaks.csv"));
    }

    #[test]
    fn test_megabytes() {
        assert_eq!(megabytes(1_048_576), "1.000");
        assert_eq!(megabytes(524_288), "0.500");
        assert_eq!(megabytes(0), "0.000");
    }
}
