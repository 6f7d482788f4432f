//! Domain records built from the raw trace sections.

use super::schema::{CallSiteId, RawLeak, RawStackStat, StackId};
use serde::Serialize;
use std::collections::HashMap;

/// Call chain of one allocation event, innermost frame first
pub type Stack = Vec<CallSiteId>;

/// Allocation statistics of one unique stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationStat {
    pub stack_id: StackId,
    pub stack: Stack,
    pub count: u64,
    /// Bytes allocated through this stack
    pub alloc_sum: u64,
    /// Bytes still held by this stack at the global memory peak
    pub global_peak: u64,
}

impl AllocationStat {
    /// Dead records hold no peak memory and have no allocation to charge
    pub fn is_dead(&self) -> bool {
        (self.alloc_sum == 0 || self.stack.is_empty()) && self.global_peak == 0
    }
}

impl From<RawStackStat> for AllocationStat {
    fn from(raw: RawStackStat) -> Self {
        Self {
            stack_id: raw.stack_id,
            stack: raw.stack,
            count: raw.infos.alloc.count,
            alloc_sum: raw.infos.alloc.sum,
            global_peak: raw.infos.global_peak,
        }
    }
}

/// Memory never freed before the traced program exited
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeakRecord {
    pub memory: u64,
    pub count: u64,
    pub stack: Stack,
}

impl From<RawLeak> for LeakRecord {
    fn from(raw: RawLeak) -> Self {
        Self {
            memory: raw.memory,
            count: raw.count,
            stack: raw.stack,
        }
    }
}

/// Lookup from stack id to its (filtered) stack
#[derive(Debug, Clone, Default)]
pub struct StackTable {
    stacks: HashMap<StackId, Stack>,
}

impl StackTable {
    /// Index every record; the first record wins when an id repeats
    pub fn from_stats(stats: &[AllocationStat]) -> Self {
        let mut stacks = HashMap::with_capacity(stats.len());
        for stat in stats {
            stacks
                .entry(stat.stack_id.clone())
                .or_insert_with(|| stat.stack.clone());
        }
        Self { stacks }
    }

    pub fn get(&self, id: &StackId) -> Option<&Stack> {
        self.stacks.get(id)
    }

    pub fn contains(&self, id: &StackId) -> bool {
        self.stacks.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StackId, &Stack)> {
        self.stacks.iter()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
