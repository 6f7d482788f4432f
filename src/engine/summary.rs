//! Versioned JSON summary of a loaded trace.

use super::MaltTrace;
use crate::utils::config::SUMMARY_VERSION;
use serde::{Deserialize, Serialize};

/// Top-level summary structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Schema version for compatibility checking
    pub version: String,

    /// Trace file the summary was computed from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    /// Distinct functions carrying allocations
    pub function_count: usize,

    /// Bytes allocated, each byte attributed once
    pub total_allocated: u64,

    /// Memory held by all stacks at the global peak
    pub global_peak: u64,

    /// Bytes never freed
    pub leaked: u64,

    pub leak_count: usize,

    pub timeline_samples: usize,

    /// Largest exclusive allocators
    pub top_allocations: Vec<FunctionSummary>,

    /// Largest holders at the global peak
    pub top_peaks: Vec<PeakSummary>,

    /// Timestamp when the summary was generated
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub function: String,
    pub bytes: u64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakSummary {
    pub function: String,
    pub inclusive: u64,
    pub exclusive: u64,
}

impl MaltTrace {
    /// Summarise the trace, keeping the `top_n` largest entries per list
    pub fn summary(&self, top_n: usize) -> TraceSummary {
        use chrono::Utc;

        let mut allocations: Vec<FunctionSummary> = self
            .index
            .functions()
            .filter(|(_, totals)| totals.exclusive_bytes > 0)
            .map(|(name, totals)| FunctionSummary {
                function: name.to_string(),
                bytes: totals.exclusive_bytes,
                count: totals.count,
            })
            .collect();
        allocations.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.function.cmp(&b.function)));
        allocations.truncate(top_n);

        let top_peaks = self
            .global_peaks()
            .into_iter()
            .take(top_n)
            .map(|p| PeakSummary {
                function: p.function,
                inclusive: p.inclusive,
                exclusive: p.exclusive,
            })
            .collect();

        TraceSummary {
            version: SUMMARY_VERSION.to_string(),
            source_file: self.source.as_ref().map(|p| p.display().to_string()),
            function_count: self.index.function_count(),
            total_allocated: self.index.total_exclusive(),
            global_peak: self.total_global_peak(),
            leaked: self.total_leaked(),
            leak_count: self.leaks.len(),
            timeline_samples: self.timeline.len(),
            top_allocations: allocations,
            top_peaks,
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}
