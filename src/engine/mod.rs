//! The loaded, reduced view of one MALT trace.
//!
//! `MaltTrace` runs the whole load pipeline once:
//! 1. Parse the document and check its sections
//! 2. Build the symbol table, instruction map and name index
//! 3. Filter every allocation stack (substring, then allocator shims)
//! 4. Index the filtered stacks by function
//! 5. Build the timeline, leak list and per-line annotations
//!
//! After construction the trace is immutable; all query methods take
//! `&self`, so a trace can be shared between threads freely.

pub mod query;
pub mod summary;

pub use query::{Allocation, PeakRanking, PeakStack};
pub use summary::{FunctionSummary, PeakSummary, TraceSummary};

use crate::aggregator::{AggregationIndex, FileAllocations, LineCost, StackFilter, Timeline, TimelineSample};
use crate::parser::{
    parse_trace, parse_trace_str, read_trace_file, AllocationStat, InstrMap, LeakRecord, RawTrace,
    Stack, StackId, StackTable,
};
use crate::utils::config::EngineConfig;
use crate::utils::error::LoadError;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A fully indexed memory trace
#[derive(Debug, Clone)]
pub struct MaltTrace {
    source: Option<PathBuf>,
    instr: InstrMap,
    stats: Vec<AllocationStat>,
    stacks: StackTable,
    index: AggregationIndex,
    timeline: Timeline,
    leaks: Vec<LeakRecord>,
    file_allocations: FileAllocations,
    ticks_per_second: f64,
}

impl MaltTrace {
    /// Load and index a trace file
    ///
    /// **Public** - main entry point for consumers
    ///
    /// # Errors
    /// Any [`LoadError`]; no partially built trace is ever returned.
    pub fn load(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = read_trace_file(path)?;
        let mut trace = Self::from_raw(raw, config);
        trace.source = Some(path.to_path_buf());
        Ok(trace)
    }

    /// Load a trace from JSON text
    pub fn from_json_str(content: &str, config: &EngineConfig) -> Result<Self, LoadError> {
        Ok(Self::from_raw(parse_trace_str(content)?, config))
    }

    /// Load a trace from a decoded JSON value
    pub fn from_value(value: serde_json::Value, config: &EngineConfig) -> Result<Self, LoadError> {
        Ok(Self::from_raw(parse_trace(value)?, config))
    }

    /// Index already parsed sections
    pub fn from_raw(raw: RawTrace, config: &EngineConfig) -> Self {
        let ticks_per_second = raw.globals.ticks_per_second;
        let instr = InstrMap::build(raw.sites);

        let mut stats: Vec<AllocationStat> =
            raw.stacks.stats.into_iter().map(AllocationStat::from).collect();
        StackFilter::new(&instr).apply(&mut stats, config);

        let index = AggregationIndex::build(&stats, &instr);
        info!("Indexing done: {} functions", index.function_count());

        let stacks = StackTable::from_stats(&stats);
        let timeline = Timeline::build(
            &raw.timeline.memory_timeline,
            ticks_per_second,
            &stacks,
            &instr,
        );
        let leaks: Vec<LeakRecord> = raw.leaks.into_iter().map(LeakRecord::from).collect();
        let file_allocations = FileAllocations::build(&stats, &leaks, &instr);

        debug!(
            "Trace ready: {} stacks, {} samples, {} leaks",
            stacks.len(),
            timeline.len(),
            leaks.len()
        );

        Self {
            source: None,
            instr,
            stats,
            stacks,
            index,
            timeline,
            leaks,
            file_allocations,
            ticks_per_second,
        }
    }

    /// File the trace was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn instr_map(&self) -> &InstrMap {
        &self.instr
    }

    /// Allocation records with their filtered stacks
    pub fn stats(&self) -> &[AllocationStat] {
        &self.stats
    }

    /// Filtered stack recorded under `id`
    pub fn callsite(&self, id: &StackId) -> Option<&Stack> {
        self.stacks.get(id)
    }

    pub fn stacks(&self) -> &StackTable {
        &self.stacks
    }

    pub fn index(&self) -> &AggregationIndex {
        &self.index
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Timeline samples with time in seconds and resolved stacks
    pub fn annotated_timeline(&self) -> &[TimelineSample] {
        self.timeline.samples()
    }

    pub fn leaks(&self) -> &[LeakRecord] {
        &self.leaks
    }

    /// Per-line memory of one source file
    pub fn file_allocations(&self, file: &str) -> Option<&BTreeMap<i64, LineCost>> {
        self.file_allocations.for_file(file)
    }

    /// Per-line annotations of every source file
    pub fn annotated_files(&self) -> &FileAllocations {
        &self.file_allocations
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }
}
