//! Per-line memory annotations for source files.
//!
//! Attributes global-peak memory and leaked memory to every `(file, line)`
//! that appears on the responsible stack, so a source viewer can show how
//! much memory each line was holding.

use crate::parser::{AllocationStat, CallSiteId, InstrMap, LeakRecord};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Memory attributed to one source line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineCost {
    /// Bytes held at the global peak by stacks through this line
    pub global_peak: u64,
    /// Bytes leaked by stacks through this line
    pub leaked: u64,
}

/// Line costs keyed by file name, then line number
#[derive(Debug, Clone, Default)]
pub struct FileAllocations {
    files: HashMap<String, BTreeMap<i64, LineCost>>,
}

impl FileAllocations {
    pub fn build(stats: &[AllocationStat], leaks: &[LeakRecord], instr: &InstrMap) -> Self {
        let mut allocations = Self::default();

        for stat in stats.iter().filter(|s| s.global_peak > 0) {
            allocations.charge(&stat.stack, instr, |cost| {
                cost.global_peak = cost.global_peak.saturating_add(stat.global_peak)
            });
        }
        for leak in leaks.iter().filter(|l| l.memory > 0) {
            allocations.charge(&leak.stack, instr, |cost| {
                cost.leaked = cost.leaked.saturating_add(leak.memory)
            });
        }

        debug!("Annotated {} source files", allocations.files.len());
        allocations
    }

    /// Apply `update` once to every distinct line on the stack
    fn charge(&mut self, stack: &[CallSiteId], instr: &InstrMap, update: impl Fn(&mut LineCost)) {
        let mut seen = HashSet::new();
        for site in stack {
            let (Some(file), Some(line)) = (instr.file_name(site), instr.line(site)) else {
                continue;
            };
            if !seen.insert((file, line)) {
                continue;
            }
            let cost = self
                .files
                .entry(file.to_string())
                .or_default()
                .entry(line)
                .or_default();
            update(cost);
        }
    }

    /// Line costs of one file, ordered by line
    pub fn for_file(&self, file: &str) -> Option<&BTreeMap<i64, LineCost>> {
        self.files.get(file)
    }

    /// Cost of a single line; zero when nothing was attributed to it
    pub fn line(&self, file: &str, line: i64) -> LineCost {
        self.for_file(file)
            .and_then(|lines| lines.get(&line))
            .copied()
            .unwrap_or_default()
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
