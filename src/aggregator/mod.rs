//! Reduction of parsed trace data into queryable views.
//!
//! This module transforms parsed allocation records into:
//! - Filtered stacks (file substring and allocator-shim passes)
//! - Per-function inclusive/exclusive totals and global-peak shares
//! - A timed memory timeline with resolved stacks
//! - Per-line source annotations

pub mod file_alloc;
pub mod index;
pub mod stack_filter;
pub mod timeline;

// Re-export main types
pub use file_alloc::{FileAllocations, LineCost};
pub use index::{AggregationIndex, FunctionAggregate, FunctionTotals, PeakShare};
pub use stack_filter::{dedup_stack, is_allocator_shim, StackFilter};
pub use timeline::{Timeline, TimelineSample};
