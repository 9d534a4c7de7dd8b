//! Code relationship graph
//!
//! Built once per analysis from extracted fragments and then frozen. Every
//! downstream algorithm (cycles, smells, PageRank, metrics, reachability) reads the same
//! immutable [`CodeGraph`].

pub mod builder;
pub mod call_graph;
pub mod metrics;
pub mod model;
pub mod pagerank;
pub mod vtable;

pub use builder::{build, BuildOptions};
pub use call_graph::CallGraph;
pub use metrics::{graph_metrics, GraphMetrics, MetricsConfig, MetricsSummary, NodeCentrality};
pub use model::{
    Adjacency, DependencyGraph, EdgeKind, GraphEdge, GraphNode, GraphScope, GraphSummary, NodeId,
    NodeKind,
};
pub use pagerank::{NodeMetric, RankConfig};
pub use vtable::VTable;

use crate::models::{Definition, UnreachableBlock};
use crate::parsers::Language;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-file bookkeeping kept alongside the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub path: String,
    pub language: Language,
    pub line_count: u32,
}

/// The merged graph plus everything pass 1 produced that detectors need
#[derive(Debug, Clone, Default)]
pub struct CodeGraph {
    pub graph: DependencyGraph,
    /// Definition for every non-file node, keyed by node id
    pub definitions: BTreeMap<NodeId, Definition>,
    pub vtable: VTable,
    pub unreachable_blocks: Vec<UnreachableBlock>,
    pub files: Vec<FileInfo>,
}

impl CodeGraph {
    pub fn total_lines(&self) -> u64 {
        self.files.iter().map(|f| f.line_count as u64).sum()
    }
}
