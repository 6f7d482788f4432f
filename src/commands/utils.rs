use anyhow::{Context, Result};
use std::path::Path;
use crate::engine::MaltTrace;
use crate::utils::config::{EngineConfig, SUMMARY_VERSION};

/// Load a trace file and print what it contains
pub fn validate_trace_file(file_path: &Path) -> Result<()> {
    println!("Validating trace: {}", file_path.display());

    let trace = MaltTrace::load(file_path, &EngineConfig::new())
        .with_context(|| format!("{} is not a valid MALT trace", file_path.display()))?;

    println!("✓ Valid MALT trace");
    println!("  Symbols: {}", trace.instr_map().symbols().len());
    println!("  Call sites: {}", trace.instr_map().len());
    println!("  Stacks: {}", trace.stats().len());
    println!("  Functions: {}", trace.index().function_count());
    println!("  Timeline samples: {}", trace.timeline().len());
    println!("  Leaks: {}", trace.leaks().len());
    println!("  Annotated files: {}", trace.annotated_files().files().count());
    println!("  Ticks per second: {}", trace.ticks_per_second());

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("MALT Trace v{}", env!("CARGO_PKG_VERSION"));
    println!("Summary Schema: v{}", SUMMARY_VERSION);
    println!();
    println!("Reduces MALT memory-profiling traces into per-function, timeline and leak views.");
}
