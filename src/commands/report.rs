//! Report command implementation.
//!
//! For every input trace the report command:
//! 1. Loads and indexes the trace
//! 2. Prints the top allocations matching a name pattern, or the top
//!    global-peak holders
//! 3. Writes the timeline, global-peak and leak CSV dumps
//! 4. Optionally writes a JSON summary

use super::models::{elide_name, format_bytes, format_count, ReportArgs};
use crate::engine::MaltTrace;
use crate::output::{dump_all, write_summary, CsvPaths};
use crate::utils::config::EngineConfig;
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;
use std::time::Instant;

/// Execute the report command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Trace load failures (missing or malformed sections)
/// * Invalid name pattern
/// * File write errors
pub fn execute_report(args: ReportArgs) -> Result<()> {
    let config = EngineConfig {
        filter_by: args.filter.clone(),
    };

    for file in &args.files {
        report_file(file, &args, &config)
            .with_context(|| format!("Failed to report on {}", file.display()))?;
    }

    Ok(())
}

fn report_file(file: &Path, args: &ReportArgs, config: &EngineConfig) -> Result<()> {
    let start_time = Instant::now();

    info!("Step 1/3: Loading {}...", file.display());
    let trace = MaltTrace::load(file, config).context("Failed to load trace")?;
    debug!(
        "Loaded trace: {} functions, {} samples, {} leaks",
        trace.index().function_count(),
        trace.timeline().len(),
        trace.leaks().len()
    );

    info!("Step 2/3: Ranking...");
    let lines = if args.global_peaks {
        peak_lines(&trace, args.exclusive, args.top_n)
    } else {
        let pattern = args.name.as_deref().unwrap_or(".");
        allocation_lines(&trace, pattern, args.exclusive, args.top_n)?
    };
    for line in lines {
        println!("{}", line);
    }

    if args.write_csv {
        info!("Step 3/3: Writing CSV dumps...");
        dump_all(&trace, &CsvPaths::for_trace(file)).context("Failed to write CSV dumps")?;
    } else {
        info!("Step 3/3: Skipping CSV dumps (not requested)");
    }

    if let Some(json_path) = &args.json {
        write_summary(&trace.summary(args.top_n), json_path)
            .context("Failed to write JSON summary")?;
    }

    info!("Report completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Report lines for the largest matching allocators, largest first
///
/// **Public** - also used by tests
pub fn allocation_lines(
    trace: &MaltTrace,
    pattern: &str,
    exclusive: bool,
    top_n: usize,
) -> Result<Vec<String>> {
    let mut matches: Vec<_> = trace
        .allocations_by_name(pattern, exclusive)?
        .into_iter()
        .filter(|(_, alloc)| alloc.bytes > 0)
        .collect();
    matches.sort_by(|a, b| b.1.bytes.cmp(&a.1.bytes).then_with(|| a.0.cmp(&b.0)));

    Ok(matches
        .into_iter()
        .take(top_n)
        .map(|(name, alloc)| {
            format!(
                "    {} {} {}",
                format_bytes(alloc.bytes as f64, "B"),
                format_count(alloc.count as f64),
                elide_name(&name)
            )
        })
        .collect())
}

/// Report lines for the largest global-peak holders, largest first
pub fn peak_lines(trace: &MaltTrace, exclusive: bool, top_n: usize) -> Vec<String> {
    let mut peaks: Vec<(String, u64)> = trace
        .global_peaks()
        .into_iter()
        .map(|p| (p.function, if exclusive { p.exclusive } else { p.inclusive }))
        .filter(|(_, bytes)| *bytes > 0)
        .collect();
    peaks.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    peaks
        .into_iter()
        .take(top_n)
        .map(|(name, bytes)| format!("    {} {}", format_bytes(bytes as f64, "B"), elide_name(&name)))
        .collect()
}

/// Validate report arguments
///
/// **Public** - can be called before execute_report for early validation
pub fn validate_args(args: &ReportArgs) -> Result<()> {
    if args.files.is_empty() {
        anyhow::bail!("At least one trace file is required");
    }

    if args.global_peaks && args.name.is_some() {
        anyhow::bail!("Only one of --name or --global-peaks may be specified");
    }

    if args.top_n == 0 {
        anyhow::bail!("top must be greater than 0");
    }

    if args.json.is_some() && args.files.len() > 1 {
        anyhow::bail!("--json accepts a single trace file");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> ReportArgs {
        ReportArgs {
            files: vec![PathBuf::from("trace.json")],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_args(&args()).is_ok());
    }

    #[test]
    fn test_validate_args_no_files() {
        let args = ReportArgs::default();
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_name_and_peaks() {
        let args = ReportArgs {
            name: Some("foo".to_string()),
            global_peaks: true,
            ..args()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_zero() {
        let args = ReportArgs { top_n: 0, ..args() };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_json_with_many_files() {
        let args = ReportArgs {
            files: vec![PathBuf::from("a.json"), PathBuf::from("b.json")],
            json: Some(PathBuf::from("summary.json")),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }
}
