//! Raw JSON schema of a MALT trace.
//!
//! These structs mirror the sections of the document written by the
//! instrumentation tool. Only the fields the engine consumes are modelled;
//! everything else in the document is ignored by serde.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier tokens appear either as strings or as bare integers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawToken {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawToken> for String {
    fn from(token: RawToken) -> Self {
        match token {
            RawToken::Text(s) => s,
            RawToken::Signed(n) => n.to_string(),
            RawToken::Unsigned(n) => n.to_string(),
        }
    }
}

/// Opaque identifier of a single instrumented call site
///
/// Integer tokens are normalised to their decimal text so that a stack
/// entry `17` and an `instr` key `"17"` name the same call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawToken", into = "String")]
pub struct CallSiteId(String);

impl CallSiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RawToken> for CallSiteId {
    fn from(token: RawToken) -> Self {
        Self(token.into())
    }
}

impl From<CallSiteId> for String {
    fn from(id: CallSiteId) -> Self {
        id.0
    }
}

impl From<&str> for CallSiteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for CallSiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a recorded stack in `stacks.stats`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawToken", into = "String")]
pub struct StackId(String);

impl StackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RawToken> for StackId {
    fn from(token: RawToken) -> Self {
        Self(token.into())
    }
}

impl From<StackId> for String {
    fn from(id: StackId) -> Self {
        id.0
    }
}

impl From<&str> for StackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `globals` section
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGlobals {
    pub ticks_per_second: f64,
}

/// `sites` section: symbol strings plus the call-site table
#[derive(Debug, Clone, Deserialize)]
pub struct RawSites {
    pub strings: Vec<String>,

    /// JSON object keys are always strings, so ids are kept as text here
    pub instr: HashMap<String, RawInstr>,
}

/// One entry of `sites.instr`; all values are indices into `sites.strings`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawInstr {
    #[serde(default)]
    pub file: Option<usize>,

    pub function: usize,

    #[serde(default)]
    pub line: Option<i64>,
}

/// `stacks` section
#[derive(Debug, Clone, Deserialize)]
pub struct RawStacks {
    pub stats: Vec<RawStackStat>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStackStat {
    pub stack: Vec<CallSiteId>,
    pub stack_id: StackId,
    pub infos: RawInfos,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInfos {
    pub alloc: RawAllocInfo,
    pub global_peak: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawAllocInfo {
    pub count: u64,
    pub sum: u64,
}

/// `timeline` section
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTimeline {
    pub memory_timeline: RawMemoryTimeline,
}

/// Sampled memory usage; one `values` row and one `callsite` per sample
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMemoryTimeline {
    /// Instrumentation ticks between two samples
    pub per_points: f64,
    pub fields: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub callsite: Vec<StackId>,
}

/// One entry of the `leaks` section
#[derive(Debug, Clone, Deserialize)]
pub struct RawLeak {
    pub memory: u64,
    pub count: u64,
    pub stack: Vec<CallSiteId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_and_string_tokens_normalise() {
        let ids: Vec<CallSiteId> = serde_json::from_value(json!(["0x4005d0", 17])).unwrap();
        assert_eq!(ids[0], CallSiteId::from("0x4005d0"));
        assert_eq!(ids[1], CallSiteId::from("17"));
    }

    #[test]
    fn test_instr_optional_fields() {
        let instr: RawInstr = serde_json::from_value(json!({"function": 3})).unwrap();
        assert_eq!(instr.function, 3);
        assert!(instr.file.is_none());
        assert!(instr.line.is_none());
    }

    #[test]
    fn test_stack_stat_camel_case() {
        let stat: RawStackStat = serde_json::from_value(json!({
            "stack": ["a", "b"],
            "stackId": 42,
            "infos": {"alloc": {"count": 2, "sum": 64}, "globalPeak": 32}
        }))
        .unwrap();
        assert_eq!(stat.stack_id.as_str(), "42");
        assert_eq!(stat.infos.alloc.sum, 64);
        assert_eq!(stat.infos.global_peak, 32);
    }

    #[test]
    fn test_id_serializes_as_string() {
        let value = serde_json::to_value(StackId::new("9")).unwrap();
        assert_eq!(value, json!("9"));
    }
}
