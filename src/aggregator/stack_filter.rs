//! Stack filtering ahead of aggregation.
//!
//! Two passes rewrite every recorded stack in place:
//! 1. Substring filter - drops call sites whose file does not contain a
//!    caller supplied string (only when a filter is configured)
//! 2. Allocator-shim filter - drops malloc/new style entry points so their
//!    bytes land on the nearest caller
//!
//! Both passes first collapse repeated call sites within a stack to their
//! first occurrence. The substring pass always runs before the shim pass.
//! Neither pass is meant to run twice on the same stacks.

use crate::parser::{AllocationStat, CallSiteId, InstrMap, Stack};
use crate::utils::config::{
    EngineConfig, SHIM_FILE_FRAGMENT, SHIM_FUNCTIONS, SHIM_FUNCTION_PREFIX,
};
use log::{debug, info};
use std::collections::HashSet;

/// Whether a frame belongs to an allocator entry point
pub fn is_allocator_shim(function: &str, file: &str) -> bool {
    SHIM_FUNCTIONS.contains(&function)
        || function.starts_with(SHIM_FUNCTION_PREFIX)
        || file.contains(SHIM_FILE_FRAGMENT)
}

/// Collapse repeated call sites, keeping the first occurrence of each
pub fn dedup_stack(stack: &[CallSiteId]) -> Stack {
    let mut seen = HashSet::with_capacity(stack.len());
    stack
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

/// Deduplicate a stack then drop every call site in `removers`
///
/// Returns the number of frames that disappeared.
pub fn remove_call_sites(stack: &mut Stack, removers: &HashSet<CallSiteId>) -> usize {
    let before = stack.len();
    let mut kept = dedup_stack(stack);
    kept.retain(|id| !removers.contains(id));
    *stack = kept;
    before - stack.len()
}

/// Applies the configured filters to allocation stacks
pub struct StackFilter<'a> {
    instr: &'a InstrMap,
}

impl<'a> StackFilter<'a> {
    pub fn new(instr: &'a InstrMap) -> Self {
        Self { instr }
    }

    /// Run the substring pass (if configured) then the shim pass
    ///
    /// **Public** - main entry point, called once per loaded trace
    pub fn apply(&self, stats: &mut [AllocationStat], config: &EngineConfig) {
        if let Some(filter) = config.active_filter() {
            let removed = self.filter_by_file(stats, filter);
            info!("Filtering by '{}' done ({} frames removed)", filter, removed);
        }

        let removed = self.filter_allocators(stats);
        info!("Filtering allocators done ({} frames removed)", removed);
    }

    /// Keep only call sites whose file name contains `filter`
    pub fn filter_by_file(&self, stats: &mut [AllocationStat], filter: &str) -> usize {
        let removers = self.file_mismatches(filter);
        debug!(
            "{} of {} call sites live outside files matching '{}'",
            removers.len(),
            self.instr.len(),
            filter
        );
        strip(stats, &removers)
    }

    /// Drop allocator entry points from every stack
    pub fn filter_allocators(&self, stats: &mut [AllocationStat]) -> usize {
        let removers = self.allocator_shims();
        debug!("{} call sites belong to allocator shims", removers.len());
        strip(stats, &removers)
    }

    /// Call sites whose file does not contain `filter`
    pub fn file_mismatches(&self, filter: &str) -> HashSet<CallSiteId> {
        self.instr
            .iter()
            .map(|(id, _)| id)
            .filter(|id| {
                self.instr
                    .file_name(id)
                    .is_some_and(|file| !file.contains(filter))
            })
            .cloned()
            .collect()
    }

    /// Call sites inside allocator shims
    ///
    /// Function names are matched through the name index, file paths by
    /// scanning the call-site records.
    pub fn allocator_shims(&self) -> HashSet<CallSiteId> {
        let mut removers: HashSet<CallSiteId> = self
            .instr
            .names()
            .iter()
            .filter(|(name, _)| is_allocator_shim(name, ""))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect();

        removers.extend(
            self.instr
                .iter()
                .map(|(id, _)| id)
                .filter(|id| {
                    self.instr
                        .file_name(id)
                        .is_some_and(|file| file.contains(SHIM_FILE_FRAGMENT))
                })
                .cloned(),
        );

        removers
    }
}

fn strip(stats: &mut [AllocationStat], removers: &HashSet<CallSiteId>) -> usize {
    stats
        .iter_mut()
        .map(|stat| remove_call_sites(&mut stat.stack, removers))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::RawSites;
    use crate::parser::StackId;
    use serde_json::json;

    fn instr() -> InstrMap {
        let sites: RawSites = serde_json::from_value(json!({
            "strings": [
                "malloc", "work", "main", "src/app.c", "/usr/lib/libc.c",
                "__gnu_cxx::new_allocator<int>::allocate",
                "std::vector<int>::push_back",
                "/build/gcc/libstdc++/include/vector"
            ],
            "instr": {
                "m": {"file": 4, "function": 0, "line": 1},
                "w": {"file": 3, "function": 1, "line": 10},
                "x": {"file": 3, "function": 2, "line": 20},
                "g": {"file": 7, "function": 5, "line": 3},
                "v": {"file": 7, "function": 6, "line": 9}
            }
        }))
        .unwrap();
        InstrMap::build(sites)
    }

    fn stat(stack: &[&str]) -> AllocationStat {
        AllocationStat {
            stack_id: StackId::from("1"),
            stack: stack.iter().map(|s| CallSiteId::from(*s)).collect(),
            count: 1,
            alloc_sum: 16,
            global_peak: 0,
        }
    }

    fn ids(stack: &Stack) -> Vec<&str> {
        stack.iter().map(CallSiteId::as_str).collect()
    }

    #[test]
    fn test_is_allocator_shim() {
        assert!(is_allocator_shim("malloc", "x.c"));
        assert!(is_allocator_shim("operator new(unsigned long)", ""));
        assert!(is_allocator_shim("__gnu_cxx::anything", ""));
        assert!(is_allocator_shim("std::foo", "/a/libstdc++/b.h"));
        assert!(!is_allocator_shim("mallocator", "src/app.c"));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let stack: Stack = ["a", "b", "a", "c", "b"].iter().map(|s| CallSiteId::from(*s)).collect();
        assert_eq!(ids(&dedup_stack(&stack)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_shim_filter_removes_allocators() {
        let map = instr();
        let mut stats = vec![stat(&["m", "g", "v", "w", "x"])];
        let removed = StackFilter::new(&map).filter_allocators(&mut stats);
        assert_eq!(removed, 3);
        assert_eq!(ids(&stats[0].stack), vec!["w", "x"]);
    }

    #[test]
    fn test_substring_filter() {
        let map = instr();
        let mut stats = vec![stat(&["m", "w", "x"])];
        StackFilter::new(&map).filter_by_file(&mut stats, "src/");
        assert_eq!(ids(&stats[0].stack), vec!["w", "x"]);
    }

    #[test]
    fn test_unknown_call_sites_survive() {
        let map = instr();
        let mut stats = vec![stat(&["zz", "w"])];
        StackFilter::new(&map).apply(&mut stats, &EngineConfig::new().with_filter("src/"));
        assert_eq!(ids(&stats[0].stack), vec!["zz", "w"]);
    }

    #[test]
    fn test_apply_without_filter_still_dedups() {
        let map = instr();
        let mut stats = vec![stat(&["w", "w", "x"])];
        StackFilter::new(&map).apply(&mut stats, &EngineConfig::new());
        assert_eq!(ids(&stats[0].stack), vec!["w", "x"]);
    }
}
