//! MALT Trace
//!
//! Trace-reduction engine for MALT memory-profiling traces.
//!
//! Loads the JSON trace written by the MALT instrumentation tool,
//! resolves call sites, filters allocator frames and aggregates memory
//! per function (inclusive, exclusive and at the global peak). The
//! loaded [`engine::MaltTrace`] is immutable and answers read-only
//! queries; [`output`] dumps the timeline, global peak and leaks as CSV.
//!
//! ```ignore
//! use malt_trace::{EngineConfig, MaltTrace};
//!
//! let trace = MaltTrace::load("malt-app-1234.json", &EngineConfig::new())?;
//! for (name, alloc) in trace.allocations_by_name("^parse", true)? {
//!     println!("{name}: {} bytes in {} allocations", alloc.bytes, alloc.count);
//! }
//! ```

pub mod aggregator;
pub mod commands;
pub mod engine;
pub mod output;
pub mod parser;
pub mod utils;

pub use engine::MaltTrace;
pub use utils::config::EngineConfig;
