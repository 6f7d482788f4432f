use std::path::PathBuf;
use crate::utils::config::DEFAULT_TOP_N;

/// Arguments for the report command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ReportArgs {
    /// Trace files to report on
    pub files: Vec<PathBuf>,

    /// Regex selecting functions (None = every function)
    pub name: Option<String>,

    /// Report exclusive instead of inclusive bytes
    pub exclusive: bool,

    /// Rank global-peak holders instead of allocations
    pub global_peaks: bool,

    /// Keep only call sites from files containing this string
    pub filter: Option<String>,

    /// Number of entries to print
    pub top_n: usize,

    /// Write a JSON summary next to the report (single input only)
    pub json: Option<PathBuf>,

    /// Write the three CSV dumps next to each input
    pub write_csv: bool,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            name: None,
            exclusive: false,
            global_peaks: false,
            filter: None,
            top_n: DEFAULT_TOP_N,
            json: None,
            write_csv: true,
        }
    }
}

/// Byte count scaled with binary k/M/G steps, e.g. `   1.5kB`
pub fn format_bytes(value: f64, suffix: &str) -> String {
    const K: f64 = 1024.0;
    if value < K {
        format!("{:>6.0} {}", value, suffix)
    } else if value < K * K {
        format!("{:>6.1}k{}", value / K, suffix)
    } else if value < K * K * K {
        format!("{:>6.1}M{}", value / K / K, suffix)
    } else {
        format!("{:>6.1}G{}", value / K / K / K, suffix)
    }
}

/// Count scaled with decimal k/M/G steps
pub fn format_count(value: f64) -> String {
    const K: f64 = 1000.0;
    if value < K {
        format!("{:>6.0} ", value)
    } else if value < K * K {
        format!("{:>6.1}k", value / K)
    } else if value < K * K * K {
        format!("{:>6.1}M", value / K / K)
    } else {
        format!("{:>6.1}G", value / K / K / K)
    }
}

/// Shorten names longer than 77 characters to `first20...last57`
pub fn elide_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= 77 {
        return name.to_string();
    }
    let head: String = chars[..20].iter().collect();
    let tail: String = chars[chars.len() - 57..].iter().collect();
    format!("{}...{}", head, tail)
}
