//! Configuration and constants for the trace engine and CLI.

/// Current summary schema version
pub const SUMMARY_VERSION: &str = "1.0.0";

/// Top-level sections every MALT trace must carry
pub const REQUIRED_SECTIONS: &[&str] = &["globals", "sites", "stacks", "timeline", "leaks"];

// Allocator entry points whose cost belongs to the caller
pub const SHIM_FUNCTIONS: &[&str] = &[
    "calloc",
    "malloc",
    "posix_memalign",
    "realloc",
    "operator new(unsigned long)",
];
pub const SHIM_FUNCTION_PREFIX: &str = "__gnu_cxx::";
pub const SHIM_FILE_FRAGMENT: &str = "/libstdc++/";

// Sentinels used when a lookup misses
pub const UNRESOLVED: &str = "??";
pub const UNRESOLVED_LINE: i64 = -1;
pub const UNKNOWN_FILE: &str = "Unknown";
pub const UNKNOWN_STACK: &str = "UNKNOWN";

/// Bucket receiving peak credit from records that have no surviving frame
pub const NO_STACK_FUNCTION: &str = "<no stack>";

pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Number of entries printed by the report command
pub const DEFAULT_TOP_N: usize = 10;

/// Options applied while loading a single trace.
///
/// Passed explicitly to the loader so that two traces loaded in the same
/// process never share filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Keep only call sites whose file name contains this string
    pub filter_by: Option<String>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_by = Some(filter.into());
        self
    }

    /// The substring filter, if one is set and non-empty
    pub fn active_filter(&self) -> Option<&str> {
        self.filter_by.as_deref().filter(|f| !f.is_empty())
    }
}
