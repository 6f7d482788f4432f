//! Trace parsing and call-site resolution.
//!
//! This module handles:
//! - Loading the MALT JSON document and checking its sections
//! - The raw serde schema of each section
//! - Symbol table, instruction map and name index
//! - Domain records (allocation stats, leaks, stack table)

pub mod instr_map;
pub mod malt_json;
pub mod records;
pub mod schema;

// Re-export main types
pub use instr_map::{InstrMap, InstrRecord, NameIndex, ResolvedFrame, SymbolTable};
pub use malt_json::{parse_trace, parse_trace_str, read_trace_file, validate_trace_format, RawTrace};
pub use records::{AllocationStat, LeakRecord, Stack, StackTable};
pub use schema::{CallSiteId, StackId};
