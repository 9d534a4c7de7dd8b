//! Dead code analysis - finds definitions no entry point can reach
//!
//! Builds the reachability [`CallGraph`] from every edge of the code graph,
//! seeds a breadth-first search with all entry points at once and reports
//! every definition the search never visits.
//!
//! Each finding carries a confidence score. Static signals (visibility,
//! export, test files, FFI) set the base score and optional line coverage
//! adjusts it. Exported symbols always score at or below private ones.

mod entry_points;

pub use entry_points::{
    is_entry_point, is_event_handler, is_http_handler, is_lifecycle_method, is_program_entry,
    is_test_convention,
};

use crate::coverage::CoverageData;
use crate::graph::{CallGraph, CodeGraph, NodeId, VTable};
use crate::models::{Definition, DefinitionKind, UnreachableBlock, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

const BASE_CONFIDENCE: f64 = 0.9;
const PRIVATE_BONUS: f64 = 0.05;
const EXPORTED_PENALTY: f64 = 0.3;
const TEST_FILE_PENALTY: f64 = 0.15;
const FFI_PENALTY: f64 = 0.25;
const UNCOVERED_BONUS: f64 = 0.05;

fn default_min_confidence() -> f64 {
    0.5
}
fn default_covered_cap() -> f64 {
    0.75
}

/// Dead-code settings (`[dead_code]` in repotoire.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadCodeConfig {
    /// Findings scoring below this are dropped
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Treat every exported symbol as an entry point
    #[serde(default)]
    pub exported_entry_points: bool,
    /// Upper bound for a definition whose lines ran under coverage
    #[serde(default = "default_covered_cap")]
    pub covered_confidence_cap: f64,
}

impl Default for DeadCodeConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            exported_entry_points: false,
            covered_confidence_cap: default_covered_cap(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "high"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::Low => write!(f, "low"),
        }
    }
}

/// One unreachable definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadCodeItem {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub end_line: u32,
    pub visibility: Visibility,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub confidence_reason: String,
    pub reason: String,
    pub kind: DefinitionKind,
    pub context_hash: String,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeadCodeSummary {
    pub total_dead_functions: usize,
    pub total_dead_classes: usize,
    pub total_dead_variables: usize,
    pub total_unreachable_blocks: usize,
    pub total_unreachable_lines: u64,
    pub dead_by_file: BTreeMap<String, usize>,
    pub dead_by_kind: BTreeMap<DefinitionKind, usize>,
    pub total_files_analyzed: usize,
    pub total_lines_analyzed: u64,
    pub total_nodes_in_graph: usize,
    pub total_edges_in_graph: usize,
    pub entry_points: usize,
    pub reachable_definitions: usize,
    pub unreachable_definitions: usize,
    /// Unreachable definitions as a percentage of all definitions
    pub dead_code_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadCodeAnalysis {
    pub dead_functions: Vec<DeadCodeItem>,
    pub dead_classes: Vec<DeadCodeItem>,
    pub dead_variables: Vec<DeadCodeItem>,
    pub unreachable_code: Vec<UnreachableBlock>,
    pub call_graph: CallGraph,
    pub summary: DeadCodeSummary,
}

impl DeadCodeAnalysis {
    pub fn total_items(&self) -> usize {
        self.dead_functions.len() + self.dead_classes.len() + self.dead_variables.len()
    }

    /// All findings in (file, line, name) order
    pub fn items(&self) -> Vec<&DeadCodeItem> {
        let mut items: Vec<&DeadCodeItem> = self
            .dead_functions
            .iter()
            .chain(&self.dead_classes)
            .chain(&self.dead_variables)
            .collect();
        items.sort_by(|a, b| item_order(a, b));
        items
    }
}

fn item_order(a: &DeadCodeItem, b: &DeadCodeItem) -> std::cmp::Ordering {
    a.file
        .cmp(&b.file)
        .then_with(|| a.line.cmp(&b.line))
        .then_with(|| a.name.cmp(&b.name))
}

/// Reachability-based dead code analyzer
pub struct DeadCodeAnalyzer {
    config: DeadCodeConfig,
    coverage: Option<CoverageData>,
}

impl DeadCodeAnalyzer {
    /// Create a new analyzer with default config and no coverage
    pub fn new() -> Self {
        Self {
            config: DeadCodeConfig::default(),
            coverage: None,
        }
    }

    /// Create with custom config
    pub fn with_config(config: DeadCodeConfig) -> Self {
        Self {
            config,
            coverage: None,
        }
    }

    /// Blend line coverage into every confidence score
    pub fn with_coverage(mut self, coverage: CoverageData) -> Self {
        self.coverage = Some(coverage);
        self
    }

    pub fn config(&self) -> &DeadCodeConfig {
        &self.config
    }

    /// Confidence from static signals only
    pub fn static_confidence(def: &Definition) -> f64 {
        let mut confidence = BASE_CONFIDENCE;
        if def.visibility == Visibility::Private {
            confidence += PRIVATE_BONUS;
        }
        if def.exported {
            confidence -= EXPORTED_PENALTY;
        }
        if def.is_test_file {
            confidence -= TEST_FILE_PENALTY;
        }
        if def.is_ffi {
            confidence -= FFI_PENALTY;
        }
        confidence.clamp(0.0, 1.0)
    }

    /// Static confidence adjusted by coverage when it is loaded.
    ///
    /// Any executed line in the definition's span caps the score. A span
    /// that never ran gets a small bonus.
    pub fn confidence(&self, def: &Definition) -> f64 {
        let base = Self::static_confidence(def);
        match self.covered(def) {
            Some(true) => base.min(self.config.covered_confidence_cap).clamp(0.0, 1.0),
            Some(false) => (base + UNCOVERED_BONUS).clamp(0.0, 1.0),
            None => base,
        }
    }

    fn covered(&self, def: &Definition) -> Option<bool> {
        self.coverage
            .as_ref()
            .map(|c| c.covers_range(&def.file, def.line, def.end_line))
    }

    fn confidence_reason(&self, def: &Definition, level: ConfidenceLevel) -> String {
        let mut factors: Vec<&str> = Vec::new();
        if def.visibility == Visibility::Private {
            factors.push("private symbol");
        }
        if def.exported {
            factors.push("exported, may be used outside the project");
        }
        if def.is_test_file {
            factors.push("defined in a test file");
        }
        if def.is_ffi {
            factors.push("foreign export");
        }
        match self.covered(def) {
            Some(true) => factors.push("executed under test coverage"),
            Some(false) => factors.push("never executed under test coverage"),
            None => {}
        }

        let prefix = match level {
            ConfidenceLevel::High => "Likely dead",
            ConfidenceLevel::Medium => "Possibly dead",
            ConfidenceLevel::Low => "Uncertain",
        };
        if factors.is_empty() {
            format!("{prefix}: no references from any entry point")
        } else {
            format!("{prefix}: {}", factors.join("; "))
        }
    }

    pub fn is_entry_point(&self, def: &Definition) -> bool {
        is_entry_point(def, self.config.exported_entry_points)
    }

    /// Entry-point ids of a call graph built from `code`.
    ///
    /// Files are always roots since top-level code runs on load.
    pub fn entry_points(&self, code: &CodeGraph, call_graph: &CallGraph) -> BTreeSet<u32> {
        let mut entries = BTreeSet::new();
        for node in code.graph.nodes().filter(|n| n.kind.is_container()) {
            if let Some(id) = call_graph.id_of(&node.id) {
                entries.insert(id);
            }
        }
        for (node_id, def) in &code.definitions {
            if self.is_entry_point(def) || implements_external_contract(def, &code.vtable) {
                if let Some(id) = call_graph.id_of(node_id) {
                    entries.insert(id);
                }
            }
        }
        entries
    }

    pub fn analyze(&self, code: &CodeGraph) -> DeadCodeAnalysis {
        let mut call_graph = CallGraph::from_code_graph(code);
        let entries = self.entry_points(code, &call_graph);
        for &id in &entries {
            call_graph.add_entry_point(id);
        }
        let reachable = call_graph.reachable();
        debug!(
            "Reachability: {} entry points, {} of {} nodes reached",
            entries.len(),
            reachable.len(),
            call_graph.node_count()
        );

        let mut dead_functions = Vec::new();
        let mut dead_classes = Vec::new();
        let mut dead_variables = Vec::new();
        let mut unreachable_definitions = 0usize;

        for (node_id, def) in &code.definitions {
            let Some(id) = call_graph.id_of(node_id) else {
                continue;
            };
            if reachable.contains(&id) || entries.contains(&id) {
                continue;
            }
            unreachable_definitions += 1;

            let confidence = self.confidence(def);
            if confidence < self.config.min_confidence {
                continue;
            }
            let level = ConfidenceLevel::from_score(confidence);
            let item = DeadCodeItem {
                name: def.name.clone(),
                file: def.file.clone(),
                line: def.line,
                end_line: def.end_line,
                visibility: def.visibility,
                confidence,
                confidence_level: level,
                confidence_reason: self.confidence_reason(def, level),
                reason: dead_reason(def.kind).to_string(),
                kind: def.kind,
                context_hash: def.context_hash.clone(),
                node_id: node_id.clone(),
            };
            match def.kind {
                DefinitionKind::Function => dead_functions.push(item),
                DefinitionKind::Class => dead_classes.push(item),
                DefinitionKind::Variable => dead_variables.push(item),
            }
        }

        dead_functions.sort_by(item_order);
        dead_classes.sort_by(item_order);
        dead_variables.sort_by(item_order);

        let unreachable_code = code.unreachable_blocks.clone();
        let total_definitions = code.definitions.len();

        let mut summary = DeadCodeSummary {
            total_dead_functions: dead_functions.len(),
            total_dead_classes: dead_classes.len(),
            total_dead_variables: dead_variables.len(),
            total_unreachable_blocks: unreachable_code.len(),
            total_unreachable_lines: unreachable_code
                .iter()
                .map(|b| b.line_count() as u64)
                .sum(),
            total_files_analyzed: code.files.len(),
            total_lines_analyzed: code.total_lines(),
            total_nodes_in_graph: call_graph.node_count(),
            total_edges_in_graph: call_graph.edge_count(),
            entry_points: entries.len(),
            reachable_definitions: total_definitions - unreachable_definitions,
            unreachable_definitions,
            ..Default::default()
        };
        for item in dead_functions
            .iter()
            .chain(&dead_classes)
            .chain(&dead_variables)
        {
            *summary.dead_by_file.entry(item.file.clone()).or_default() += 1;
            *summary.dead_by_kind.entry(item.kind).or_default() += 1;
        }
        if total_definitions > 0 {
            summary.dead_code_percentage =
                unreachable_definitions as f64 / total_definitions as f64 * 100.0;
        }

        info!(
            "DeadCodeAnalyzer found {} functions, {} classes, {} variables, {} unreachable blocks",
            summary.total_dead_functions,
            summary.total_dead_classes,
            summary.total_dead_variables,
            summary.total_unreachable_blocks
        );

        DeadCodeAnalysis {
            dead_functions,
            dead_classes,
            dead_variables,
            unreachable_code,
            call_graph,
            summary,
        }
    }
}

impl Default for DeadCodeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn dead_reason(kind: DefinitionKind) -> &'static str {
    match kind {
        DefinitionKind::Function => "Not reachable from any entry point",
        DefinitionKind::Class => "Class never instantiated or referenced",
        DefinitionKind::Variable => "Variable never accessed",
    }
}

/// An overriding method whose owner implements an interface or base class
/// declared outside the project. Callers of such methods live in code the
/// graph never sees.
fn implements_external_contract(def: &Definition, vtable: &VTable) -> bool {
    if !def.overrides {
        return false;
    }
    let Some(receiver) = def.receiver.as_deref() else {
        return false;
    };
    vtable
        .interfaces_of(receiver)
        .iter()
        .any(|iface| !vtable.is_known_type(iface))
}

#[cfg(test)]
mod tests;
