//! Per-function aggregation of allocation stacks.
//!
//! Every recorded stack is walked once, innermost frame first:
//! - every frame's function gains the record's count and inclusive bytes
//! - only the first (innermost) frame gains exclusive bytes
//! - global-peak bytes always accumulate inclusively, and exclusively only
//!   on the frame that received exclusive bytes
//!
//! Functions are keyed by name, so several call sites in the same function
//! collapse into one entry.

use crate::parser::{AllocationStat, InstrMap, StackId};
use crate::utils::config::{NO_STACK_FUNCTION, UNRESOLVED};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

/// Byte and count totals of one function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FunctionTotals {
    pub count: u64,
    pub inclusive_bytes: u64,
    pub exclusive_bytes: u64,
}

/// Memory a function held at the global peak
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeakShare {
    pub inclusive: u64,
    pub exclusive: u64,

    /// Stack whose record contributed the largest share
    pub top_stack: Option<StackId>,

    /// Size of that largest share
    pub top_share: u64,
}

/// Combined view of a function's allocation and peak accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FunctionAggregate {
    pub count: u64,
    pub inclusive_bytes: u64,
    pub exclusive_bytes: u64,
    pub global_peak_inclusive: u64,
    pub global_peak_exclusive: u64,
}

/// Aggregated allocation data keyed by function name
///
/// Peak entries live in their own map: records without any surviving
/// frame still report their peak memory under [`NO_STACK_FUNCTION`], but
/// never appear among the byte totals.
#[derive(Debug, Clone, Default)]
pub struct AggregationIndex {
    functions: HashMap<String, FunctionTotals>,
    peaks: HashMap<String, PeakShare>,
    indexed_records: usize,
    skipped_records: usize,
}

impl AggregationIndex {
    /// Fold every allocation record into per-function totals
    ///
    /// **Public** - main entry point, expects already filtered stacks
    ///
    /// # Arguments
    /// * `stats` - Allocation records after stack filtering
    /// * `instr` - Call-site resolver
    pub fn build(stats: &[AllocationStat], instr: &InstrMap) -> Self {
        let mut index = Self::default();

        for stat in stats {
            if stat.is_dead() {
                index.skipped_records += 1;
                continue;
            }
            index.indexed_records += 1;

            if stat.stack.is_empty() {
                index.add_peak(NO_STACK_FUNCTION, stat.global_peak, stat.alloc_sum, &stat.stack_id);
                continue;
            }

            let mut exclusive = stat.alloc_sum;
            for id in &stat.stack {
                let name = instr.function_name(id).unwrap_or(UNRESOLVED);
                index.add(name, stat, exclusive);
                // Outer frames only receive inclusive credit
                exclusive = 0;
            }
        }

        debug!(
            "Indexed {} records into {} functions ({} skipped, {} with peak memory)",
            index.indexed_records,
            index.functions.len(),
            index.skipped_records,
            index.peaks.len()
        );

        index
    }

    fn add(&mut self, name: &str, stat: &AllocationStat, exclusive: u64) {
        let totals = self.functions.entry(name.to_string()).or_default();
        totals.count = totals.count.saturating_add(stat.count);
        totals.inclusive_bytes = totals.inclusive_bytes.saturating_add(stat.alloc_sum);
        totals.exclusive_bytes = totals.exclusive_bytes.saturating_add(exclusive);

        self.add_peak(name, stat.global_peak, exclusive, &stat.stack_id);
    }

    fn add_peak(&mut self, name: &str, global_peak: u64, exclusive: u64, stack_id: &StackId) {
        if global_peak == 0 {
            return;
        }

        let share = self.peaks.entry(name.to_string()).or_default();
        share.inclusive = share.inclusive.saturating_add(global_peak);
        if exclusive > 0 {
            share.exclusive = share.exclusive.saturating_add(global_peak);
        }
        if global_peak > share.top_share {
            share.top_share = global_peak;
            share.top_stack = Some(stack_id.clone());
        }
    }

    /// Allocation totals of a function
    pub fn totals(&self, function: &str) -> Option<&FunctionTotals> {
        self.functions.get(function)
    }

    /// Peak share of a function (or of [`NO_STACK_FUNCTION`])
    pub fn peak(&self, function: &str) -> Option<&PeakShare> {
        self.peaks.get(function)
    }

    /// Merged allocation and peak view of a function
    pub fn aggregate(&self, function: &str) -> Option<FunctionAggregate> {
        let totals = self.functions.get(function);
        let peak = self.peaks.get(function);
        if totals.is_none() && peak.is_none() {
            return None;
        }

        let totals = totals.copied().unwrap_or_default();
        Some(FunctionAggregate {
            count: totals.count,
            inclusive_bytes: totals.inclusive_bytes,
            exclusive_bytes: totals.exclusive_bytes,
            global_peak_inclusive: peak.map_or(0, |p| p.inclusive),
            global_peak_exclusive: peak.map_or(0, |p| p.exclusive),
        })
    }

    pub fn inclusive(&self, function: &str) -> u64 {
        self.totals(function).map_or(0, |t| t.inclusive_bytes)
    }

    pub fn exclusive(&self, function: &str) -> u64 {
        self.totals(function).map_or(0, |t| t.exclusive_bytes)
    }

    pub fn count(&self, function: &str) -> u64 {
        self.totals(function).map_or(0, |t| t.count)
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &FunctionTotals)> {
        self.functions.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn peaks(&self) -> impl Iterator<Item = (&str, &PeakShare)> {
        self.peaks.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn contains(&self, function: &str) -> bool {
        self.functions.contains_key(function) || self.peaks.contains_key(function)
    }

    /// Sum of exclusive bytes; every indexed byte is counted exactly once
    ///
    /// All totals saturate at `u64::MAX` instead of wrapping.
    pub fn total_exclusive(&self) -> u64 {
        self.functions
            .values()
            .map(|t| t.exclusive_bytes)
            .fold(0, u64::saturating_add)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn indexed_records(&self) -> usize {
        self.indexed_records
    }

    pub fn skipped_records(&self) -> usize {
        self.skipped_records
    }
}
