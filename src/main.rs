//! MALT Trace CLI
//!
//! Reduces MALT memory-profiling traces into per-function rankings,
//! timeline, global-peak and leak dumps.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use malt_trace::commands::{
    display_version, execute_report, validate_args, validate_trace_file, ReportArgs,
};

/// MALT Trace - memory profile reduction for MALT traces
#[derive(Parser, Debug)]
#[command(name = "malt-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank allocations and write CSV dumps for one or more traces
    Report {
        /// MALT JSON trace files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Regex selecting function names
        #[arg(short, long)]
        name: Option<String>,

        /// Report exclusive instead of inclusive bytes
        #[arg(short, long)]
        exclusive: bool,

        /// Rank functions by memory held at the global peak
        #[arg(short, long)]
        global_peaks: bool,

        /// Keep only call sites whose file path contains this string
        #[arg(short, long, env = "MALT_TRACE_FILTER")]
        filter: Option<String>,

        /// Number of entries to print
        #[arg(long = "top", default_value = "10")]
        top_n: usize,

        /// Output path for a JSON summary (single trace only)
        #[arg(long)]
        json: Option<PathBuf>,

        /// Skip the timeline, global-peak and leak CSV dumps
        #[arg(long)]
        no_csv: bool,
    },

    /// Validate a MALT trace file
    Validate {
        /// Path to MALT JSON trace
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Report {
            files,
            name,
            exclusive,
            global_peaks,
            filter,
            top_n,
            json,
            no_csv,
        } => {
            let args = ReportArgs {
                files,
                name,
                exclusive,
                global_peaks,
                filter,
                top_n,
                json,
                write_csv: !no_csv,
            };

            validate_args(&args)?;
            execute_report(args)?;
        }

        Commands::Validate { file } => {
            validate_trace_file(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
