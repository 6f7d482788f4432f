//! Symbol table and call-site resolution.
//!
//! Every call site in a MALT trace is an opaque token that points at three
//! indices into the shared string table. `InstrMap` owns both tables and
//! turns a token into a readable `(function, file, line)` frame. Lookups
//! never fail: unknown tokens resolve to the `("??", "??", -1)` sentinel
//! since upstream truncation is allowed to drop call-site records.

use super::schema::{CallSiteId, RawSites};
use crate::utils::config::{UNKNOWN_FILE, UNRESOLVED, UNRESOLVED_LINE};
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;

/// Interned strings from `sites.strings`
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    strings: Vec<String>,
}

impl SymbolTable {
    pub fn new(strings: Vec<String>) -> Self {
        Self { strings }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// A call-site record: indices into the symbol table plus a line number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrRecord {
    pub file: Option<usize>,
    pub function: usize,
    /// `-1` when the trace carries no line
    pub line: i64,
}

/// Human readable projection of an `InstrRecord`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedFrame {
    pub function: String,
    pub file: String,
    pub line: i64,
}

impl ResolvedFrame {
    /// Sentinel returned for call sites without a record
    pub fn unresolved() -> Self {
        Self {
            function: UNRESOLVED.to_string(),
            file: UNRESOLVED.to_string(),
            line: UNRESOLVED_LINE,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.function == UNRESOLVED && self.file == UNRESOLVED && self.line == UNRESOLVED_LINE
    }
}

/// Reverse lookup from function name to the call sites inside it
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_name: HashMap<String, Vec<CallSiteId>>,
}

impl NameIndex {
    /// Call sites resolving to `function`, sorted by id
    pub fn call_sites(&self, function: &str) -> &[CallSiteId] {
        self.by_name.get(function).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CallSiteId])> {
        self.by_name
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Resolves call-site tokens to frames
#[derive(Debug, Clone, Default)]
pub struct InstrMap {
    symbols: SymbolTable,
    records: HashMap<CallSiteId, InstrRecord>,
    names: NameIndex,
}

impl InstrMap {
    /// Build the map and its name index in a single pass over `sites.instr`
    pub fn build(sites: RawSites) -> Self {
        let symbols = SymbolTable::new(sites.strings);
        let mut records = HashMap::with_capacity(sites.instr.len());
        let mut by_name: HashMap<String, Vec<CallSiteId>> = HashMap::new();
        let mut dangling = 0usize;

        for (token, raw) in sites.instr {
            let id = CallSiteId::new(token);
            let record = InstrRecord {
                file: raw.file,
                function: raw.function,
                line: raw.line.unwrap_or(UNRESOLVED_LINE),
            };

            let function = match symbols.get(record.function) {
                Some(name) => name,
                None => {
                    dangling += 1;
                    UNRESOLVED
                }
            };
            if record.file.is_some_and(|f| symbols.get(f).is_none()) {
                dangling += 1;
            }

            by_name
                .entry(function.to_string())
                .or_default()
                .push(id.clone());
            records.insert(id, record);
        }

        for ids in by_name.values_mut() {
            ids.sort();
        }

        if dangling > 0 {
            warn!(
                "{} call-site fields point outside the symbol table ({} strings)",
                dangling,
                symbols.len()
            );
        }
        debug!(
            "Instruction map: {} call sites, {} distinct functions",
            records.len(),
            by_name.len()
        );

        Self {
            symbols,
            records,
            names: NameIndex { by_name },
        }
    }

    /// Resolve a call site, falling back to the sentinel frame
    pub fn resolve(&self, id: &CallSiteId) -> ResolvedFrame {
        match self.records.get(id) {
            Some(record) => ResolvedFrame {
                function: self.function_of(record).to_string(),
                file: self.file_of(record).to_string(),
                line: record.line,
            },
            None => ResolvedFrame::unresolved(),
        }
    }

    /// Function name of a call site, `None` when the site is unknown
    pub fn function_name(&self, id: &CallSiteId) -> Option<&str> {
        self.records.get(id).map(|r| self.function_of(r))
    }

    /// File name of a call site, `None` when the site is unknown
    pub fn file_name(&self, id: &CallSiteId) -> Option<&str> {
        self.records.get(id).map(|r| self.file_of(r))
    }

    pub fn line(&self, id: &CallSiteId) -> Option<i64> {
        self.records.get(id).map(|r| r.line)
    }

    pub fn record(&self, id: &CallSiteId) -> Option<&InstrRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &CallSiteId) -> bool {
        self.records.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CallSiteId, &InstrRecord)> {
        self.records.iter()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn names(&self) -> &NameIndex {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn function_of(&self, record: &InstrRecord) -> &str {
        self.symbols.get(record.function).unwrap_or(UNRESOLVED)
    }

    fn file_of(&self, record: &InstrRecord) -> &str {
        match record.file {
            Some(index) => self.symbols.get(index).unwrap_or(UNRESOLVED),
            None => UNKNOWN_FILE,
        }
    }
}
