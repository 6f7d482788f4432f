//! Read-only queries over a loaded trace.

use super::MaltTrace;
use crate::parser::{CallSiteId, LeakRecord, StackId};
use crate::utils::config::{NO_STACK_FUNCTION, UNKNOWN_STACK};
use crate::utils::error::QueryError;
use regex::RegexBuilder;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Bytes and allocation count of one function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub bytes: u64,
    pub count: u64,
}

/// A function's share of memory at the global peak
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakRanking {
    pub function: String,
    pub inclusive: u64,
    pub exclusive: u64,
    /// Record that contributed the largest part of `inclusive`
    pub top_stack: Option<StackId>,
}

/// One allocation record that still held memory at the global peak
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakStack {
    pub stack_id: StackId,
    pub memory: u64,
    /// Innermost function of the stack
    pub top: String,
}

impl MaltTrace {
    /// Allocations of every function whose name matches `pattern`
    ///
    /// Matching is a case-insensitive regex search anywhere in the name.
    ///
    /// # Errors
    /// * `QueryError::InvalidPattern` - `pattern` is not a valid regex
    pub fn allocations_by_name(
        &self,
        pattern: &str,
        exclusive: bool,
    ) -> Result<BTreeMap<String, Allocation>, QueryError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| QueryError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(self
            .index
            .functions()
            .filter(|(name, _)| re.is_match(name))
            .map(|(name, totals)| {
                let bytes = if exclusive {
                    totals.exclusive_bytes
                } else {
                    totals.inclusive_bytes
                };
                (
                    name.to_string(),
                    Allocation {
                        bytes,
                        count: totals.count,
                    },
                )
            })
            .collect())
    }

    /// Functions holding memory at the global peak, largest inclusive first
    pub fn global_peaks(&self) -> Vec<PeakRanking> {
        let mut ranking: Vec<PeakRanking> = self
            .index
            .peaks()
            .filter(|(_, share)| share.inclusive > 0)
            .map(|(name, share)| PeakRanking {
                function: name.to_string(),
                inclusive: share.inclusive,
                exclusive: share.exclusive,
                top_stack: share.top_stack.clone(),
            })
            .collect();

        ranking.sort_by(|a, b| {
            b.inclusive
                .cmp(&a.inclusive)
                .then_with(|| a.function.cmp(&b.function))
        });
        ranking
    }

    /// Records with non-zero peak memory, largest first
    pub fn peak_stacks(&self) -> Vec<PeakStack> {
        let mut peaks: Vec<PeakStack> = self
            .stats
            .iter()
            .filter(|stat| stat.global_peak > 0)
            .map(|stat| PeakStack {
                stack_id: stat.stack_id.clone(),
                memory: stat.global_peak,
                top: self.stack_label(&stat.stack),
            })
            .collect();

        peaks.sort_by_key(|p| (Reverse(p.memory), p.stack_id.clone()));
        peaks
    }

    /// Render a stack as `< line:function < line:function ...`
    ///
    /// Call sites without a record render as `< ??:<id>`.
    pub fn flatten_stack(&self, stack: &[CallSiteId]) -> String {
        stack
            .iter()
            .map(|site| match (self.instr.line(site), self.instr.function_name(site)) {
                (Some(line), Some(function)) => format!("< {}:{}", line, function),
                _ => format!("< ??:{}", site),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Flattened stack recorded under `id`, or `UNKNOWN`
    pub fn flatten_stack_by_id(&self, id: &StackId) -> String {
        match self.stacks.get(id) {
            Some(stack) => self.flatten_stack(stack),
            None => UNKNOWN_STACK.to_string(),
        }
    }

    /// Innermost function of a stack, or the no-stack sentinel
    ///
    /// Unknown call sites are labelled with their raw id.
    pub fn stack_label(&self, stack: &[CallSiteId]) -> String {
        match stack.first() {
            None => NO_STACK_FUNCTION.to_string(),
            Some(site) => self
                .instr
                .function_name(site)
                .map_or_else(|| site.to_string(), str::to_string),
        }
    }

    /// Label shown for a leak
    pub fn leak_label(&self, leak: &LeakRecord) -> String {
        self.stack_label(&leak.stack)
    }

    pub fn total_leaked(&self) -> u64 {
        self.leaks.iter().map(|l| l.memory).fold(0, u64::saturating_add)
    }

    /// Sum of peak memory over all records
    pub fn total_global_peak(&self) -> u64 {
        self.stats.iter().map(|s| s.global_peak).fold(0, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::EngineConfig;
    use serde_json::json;

    fn trace() -> MaltTrace {
        MaltTrace::from_value(
            json!({
                "globals": {"ticksPerSecond": 100},
                "sites": {
                    "strings": ["Foo", "bar", "a.c"],
                    "instr": {
                        "f1": {"file": 2, "function": 0, "line": 3},
                        "f2": {"file": 2, "function": 1, "line": 7}
                    }
                },
                "stacks": {"stats": [
                    {"stack": ["f1", "f2"], "stackId": "s1",
                     "infos": {"alloc": {"count": 2, "sum": 40}, "globalPeak": 16}}
                ]},
                "timeline": {"memoryTimeline": {
                    "perPoints": 1, "fields": [], "values": [], "callsite": []
                }},
                "leaks": []
            }),
            &EngineConfig::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_flatten_stack_format() {
        let trace = trace();
        let stack = vec![CallSiteId::from("f1"), CallSiteId::from("0xbad")];
        assert_eq!(trace.flatten_stack(&stack), "< 3:Foo < ??:0xbad");
        assert_eq!(trace.flatten_stack(&[]), "");
    }

    #[test]
    fn test_flatten_by_id() {
        let trace = trace();
        assert_eq!(trace.flatten_stack_by_id(&StackId::from("s1")), "< 3:Foo < 7:bar");
        assert_eq!(trace.flatten_stack_by_id(&StackId::from("s9")), "UNKNOWN");
    }

    #[test]
    fn test_case_insensitive_search() {
        let trace = trace();
        let found = trace.allocations_by_name("^foo", true).unwrap();
        assert_eq!(found.get("Foo"), Some(&Allocation { bytes: 40, count: 2 }));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            trace().allocations_by_name("(", false),
            Err(QueryError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_stack_label() {
        let trace = trace();
        assert_eq!(trace.stack_label(&[]), NO_STACK_FUNCTION);
        assert_eq!(trace.stack_label(&[CallSiteId::from("x")]), "x");
        assert_eq!(trace.peak_stacks()[0].top, "Foo");
    }
}
