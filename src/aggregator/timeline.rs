//! Memory timeline with resolved call stacks.
//!
//! The trace stores one row of memory counters per sample plus the id of
//! the stack that was active at that moment. Sample `i` happened at
//! `(i + 1) * perPoints / ticksPerSecond` seconds.

use crate::parser::schema::RawMemoryTimeline;
use crate::parser::{CallSiteId, InstrMap, ResolvedFrame, StackId, StackTable};
use log::{debug, warn};
use serde::Serialize;

pub const REQUESTED_FIELD: &str = "requestedMem";
pub const PHYSICAL_FIELD: &str = "physicalMem";
pub const VIRTUAL_FIELD: &str = "virtualMem";

/// One sample of the memory timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSample {
    /// Seconds since the start of the run
    pub t: f64,
    pub requested_mem: u64,
    pub physical_mem: u64,
    pub virtual_mem: u64,

    /// Raw counters, in the order of [`Timeline::fields`]
    pub values: Vec<f64>,

    /// Stack id recorded for the sample, if the trace had one
    pub stack_id: Option<StackId>,

    /// Resolved frames, innermost first
    pub stack: Vec<ResolvedFrame>,
}

impl TimelineSample {
    /// First counter of the sample, used for the request delta
    pub fn first_value(&self) -> f64 {
        self.values.first().copied().unwrap_or(0.0)
    }
}

/// Time-ordered samples, addressed by ordinal
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    fields: Vec<String>,
    samples: Vec<TimelineSample>,
    sampling_period: f64,
}

impl Timeline {
    /// Convert the raw series into timed samples with resolved stacks
    ///
    /// **Public** - main entry point for timeline construction
    ///
    /// # Arguments
    /// * `raw` - `timeline.memoryTimeline` section
    /// * `ticks_per_second` - from the trace globals
    /// * `stacks` - stack table built from the filtered allocation records
    /// * `instr` - call-site resolver
    pub fn build(
        raw: &RawMemoryTimeline,
        ticks_per_second: f64,
        stacks: &StackTable,
        instr: &InstrMap,
    ) -> Self {
        let sampling_period = raw.per_points / ticks_per_second;
        let requested = field_position(&raw.fields, REQUESTED_FIELD);
        let physical = field_position(&raw.fields, PHYSICAL_FIELD);
        let virt = field_position(&raw.fields, VIRTUAL_FIELD);

        if raw.callsite.len() < raw.values.len() {
            warn!(
                "Timeline has {} samples but only {} callsite entries",
                raw.values.len(),
                raw.callsite.len()
            );
        }

        let samples: Vec<TimelineSample> = raw
            .values
            .iter()
            .enumerate()
            .map(|(ordinal, values)| {
                let stack_id = raw.callsite.get(ordinal).cloned();
                let stack = match &stack_id {
                    Some(id) => resolve_sample_stack(id, stacks, instr),
                    None => Vec::new(),
                };

                TimelineSample {
                    t: (ordinal + 1) as f64 * raw.per_points / ticks_per_second,
                    requested_mem: counter(values, requested),
                    physical_mem: counter(values, physical),
                    virtual_mem: counter(values, virt),
                    values: values.clone(),
                    stack_id,
                    stack,
                }
            })
            .collect();

        debug!(
            "Timeline: {} samples, {} fields, period {}s",
            samples.len(),
            raw.fields.len(),
            sampling_period
        );

        Self {
            fields: raw.fields.clone(),
            samples,
            sampling_period,
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn samples(&self) -> &[TimelineSample] {
        &self.samples
    }

    pub fn get(&self, ordinal: usize) -> Option<&TimelineSample> {
        self.samples.get(ordinal)
    }

    /// Value of a named counter in the sample at `ordinal`
    pub fn value(&self, ordinal: usize, field: &str) -> Option<f64> {
        let position = field_position(&self.fields, field)?;
        self.samples.get(ordinal)?.values.get(position).copied()
    }

    /// Seconds between two samples
    pub fn sampling_period(&self) -> f64 {
        self.sampling_period
    }

    /// Sample whose time is nearest to `t`; ties go to the earlier sample
    pub fn closest(&self, t: f64) -> Option<&TimelineSample> {
        self.samples
            .iter()
            .min_by(|a, b| (a.t - t).abs().total_cmp(&(b.t - t).abs()))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Frames of the stack active at a sample
///
/// Unknown stack ids fall back to a single pseudo frame made from the raw
/// token, resolved like any other call site.
fn resolve_sample_stack(id: &StackId, stacks: &StackTable, instr: &InstrMap) -> Vec<ResolvedFrame> {
    match stacks.get(id) {
        Some(stack) => stack.iter().map(|site| instr.resolve(site)).collect(),
        None => vec![instr.resolve(&CallSiteId::new(id.as_str()))],
    }
}

fn field_position(fields: &[String], name: &str) -> Option<usize> {
    fields.iter().position(|f| f == name)
}

fn counter(values: &[f64], position: Option<usize>) -> u64 {
    position
        .and_then(|p| values.get(p))
        .map_or(0, |v| v.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::schema::RawSites;
    use crate::parser::AllocationStat;
    use serde_json::json;

    fn raw(per_points: f64, callsite: serde_json::Value) -> RawMemoryTimeline {
        serde_json::from_value(json!({
            "perPoints": per_points,
            "fields": ["requestedMem", "physicalMem", "virtualMem"],
            "values": [[100, 200, 300], [150, 250, 350]],
            "callsite": callsite
        }))
        .unwrap()
    }

    fn fixtures() -> (StackTable, InstrMap) {
        let sites: RawSites = serde_json::from_value(json!({
            "strings": ["foo", "a.c"],
            "instr": {"f1": {"file": 1, "function": 0, "line": 5}}
        }))
        .unwrap();
        let stats = vec![AllocationStat {
            stack_id: StackId::from("s1"),
            stack: vec![CallSiteId::from("f1")],
            count: 1,
            alloc_sum: 1,
            global_peak: 0,
        }];
        (StackTable::from_stats(&stats), InstrMap::build(sites))
    }

    #[test]
    fn test_time_of_first_sample() {
        let (stacks, instr) = fixtures();
        let timeline = Timeline::build(&raw(1000.0, json!(["s1", "s1"])), 1_000_000.0, &stacks, &instr);
        assert_eq!(timeline.samples()[0].t, 0.001);
        assert_eq!(timeline.samples()[1].t, 0.002);
        assert_eq!(timeline.sampling_period(), 0.001);
    }

    #[test]
    fn test_named_counters() {
        let (stacks, instr) = fixtures();
        let timeline = Timeline::build(&raw(10.0, json!(["s1", "s1"])), 10.0, &stacks, &instr);
        let sample = timeline.get(1).unwrap();
        assert_eq!(sample.requested_mem, 150);
        assert_eq!(sample.physical_mem, 250);
        assert_eq!(sample.virtual_mem, 350);
        assert_eq!(timeline.value(0, "virtualMem"), Some(300.0));
        assert_eq!(timeline.value(0, "segments"), None);
    }

    #[test]
    fn test_stack_resolution_and_fallback() {
        let (stacks, instr) = fixtures();
        let timeline = Timeline::build(&raw(10.0, json!(["s1", "f1"])), 10.0, &stacks, &instr);
        assert_eq!(timeline.samples()[0].stack[0].function, "foo");
        // "f1" is not a stack id; the raw token is resolved as a call site
        assert_eq!(timeline.samples()[1].stack[0].line, 5);
    }

    #[test]
    fn test_unknown_token_resolves_to_sentinel() {
        let (stacks, instr) = fixtures();
        let timeline = Timeline::build(&raw(10.0, json!(["zz"])), 10.0, &stacks, &instr);
        assert!(timeline.samples()[0].stack[0].is_unresolved());
        assert!(timeline.samples()[1].stack.is_empty());
        assert_eq!(timeline.samples()[1].stack_id, None);
    }

    #[test]
    fn test_closest() {
        let (stacks, instr) = fixtures();
        let timeline = Timeline::build(&raw(1.0, json!(["s1", "s1"])), 1.0, &stacks, &instr);
        assert_eq!(timeline.closest(1.9).unwrap().t, 2.0);
        assert_eq!(timeline.closest(-5.0).unwrap().t, 1.0);
        assert!(Timeline::default().closest(1.0).is_none());
    }
}
