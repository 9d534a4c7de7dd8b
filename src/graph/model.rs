//! Graph data model
//!
//! Nodes live in a `BTreeMap` keyed by [`NodeId`] so every traversal sees
//! them in the same order. Edges are deduplicated on `(from, to, kind)`.

use super::metrics;
use rustc_hash::FxHashMap;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Stable node identifier.
///
/// Definition nodes use `"{file}::{qualified_name}"` and file nodes use the
/// bare path, so the same symbol gets the same id on every run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(file: &str, qualified_name: &str) -> Self {
        NodeId(format!("{file}::{qualified_name}"))
    }

    pub fn file(path: &str) -> Self {
        NodeId(path.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Node types in the code graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Module,
    Class,
    Function,
    Variable,
}

impl NodeKind {
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::File | NodeKind::Module)
    }
}

/// Edge types in the code graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    DirectCall,
    IndirectCall,
    Import,
    Inheritance,
    TypeReference,
    DynamicDispatch,
    /// Plain value read of a variable
    Reference,
}

impl EdgeKind {
    /// Edges that transfer control at runtime
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            EdgeKind::DirectCall | EdgeKind::IndirectCall | EdgeKind::DynamicDispatch
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::DirectCall => "direct_call",
            EdgeKind::IndirectCall => "indirect_call",
            EdgeKind::Import => "import",
            EdgeKind::Inheritance => "inheritance",
            EdgeKind::TypeReference => "type_reference",
            EdgeKind::DynamicDispatch => "dynamic_dispatch",
            EdgeKind::Reference => "reference",
        }
    }
}

/// A node in the code graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub name: String,
    pub qualified_name: String,
    pub kind: NodeKind,
    pub file: String,
    pub line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl GraphNode {
    pub fn new(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        kind: NodeKind,
        file: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            qualified_name: name.clone(),
            name,
            kind,
            file: file.into(),
            line: 0,
            end_line: 0,
            signature: None,
        }
    }

    pub fn with_qualified_name(mut self, qn: impl Into<String>) -> Self {
        self.qualified_name = qn.into();
        self
    }

    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.line = start;
        self.end_line = end;
        self
    }

    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature;
        self
    }
}

/// A directed, typed edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    /// 1.0 for syntactic edges, lower for inferred ones
    pub confidence: f64,
}

impl GraphEdge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, kind: EdgeKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            confidence: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// Which slice of the graph an analysis runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphScope {
    /// File nodes, with symbol edges projected onto their files
    #[default]
    File,
    /// Definition nodes and the edges between them
    Symbol,
    /// Everything
    All,
}

impl std::str::FromStr for GraphScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" | "files" => Ok(GraphScope::File),
            "symbol" | "symbols" | "function" => Ok(GraphScope::Symbol),
            "all" => Ok(GraphScope::All),
            other => Err(format!("unknown graph scope '{other}'")),
        }
    }
}

/// Aggregate statistics for a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    pub avg_degree: f64,
    pub density: f64,
    /// Weakly connected components
    pub components: usize,
    pub largest_component: usize,
    /// Strongly connected components with more than one member
    pub strongly_connected_components: usize,
}

/// Nodes in id order plus sorted, deduplicated successor lists.
///
/// Index `i` in `successors` refers to `ids[i]`. This is the arena the
/// graph algorithms run on.
#[derive(Debug, Clone, Default)]
pub struct Adjacency<'a> {
    pub ids: Vec<&'a NodeId>,
    pub successors: Vec<Vec<usize>>,
}

impl Adjacency<'_> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.ids.len()];
        for targets in &self.successors {
            for &t in targets {
                degrees[t] += 1;
            }
        }
        degrees
    }
}

/// Project-wide dependency graph
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
    edges: Vec<GraphEdge>,
    edge_index: FxHashMap<(NodeId, NodeId, EdgeKind), usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. The first node with a given id wins.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Insert an edge. Edges with an unknown endpoint and self-edges are
    /// dropped. A repeated `(from, to, kind)` keeps the higher confidence.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if edge.from == edge.to
            || !self.nodes.contains_key(&edge.from)
            || !self.nodes.contains_key(&edge.to)
        {
            return false;
        }

        let key = (edge.from.clone(), edge.to.clone(), edge.kind);
        if let Some(&idx) = self.edge_index.get(&key) {
            let existing = &mut self.edges[idx];
            if edge.confidence > existing.confidence {
                existing.confidence = edge.confidence;
            }
            return false;
        }

        self.edge_index.insert(key, self.edges.len());
        self.edges.push(edge);
        true
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges sorted by `(from, to, kind)`
    pub fn sorted_edges(&self) -> Vec<&GraphEdge> {
        let mut edges: Vec<&GraphEdge> = self.edges.iter().collect();
        edges.sort_by(|a, b| {
            a.from
                .cmp(&b.from)
                .then_with(|| a.to.cmp(&b.to))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        edges
    }

    /// Index-based view with lexicographically sorted nodes and successors
    pub fn adjacency(&self) -> Adjacency<'_> {
        let ids: Vec<&NodeId> = self.nodes.keys().collect();
        let index: FxHashMap<&NodeId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut successor_sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); ids.len()];
        for edge in &self.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
                successor_sets[from].insert(to);
            }
        }

        Adjacency {
            ids,
            successors: successor_sets
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
        }
    }

    /// Keep only the nodes and edges accepted by the filters
    pub fn subgraph<N, E>(&self, keep_node: N, keep_edge: E) -> DependencyGraph
    where
        N: Fn(&GraphNode) -> bool,
        E: Fn(&GraphEdge) -> bool,
    {
        let mut sub = DependencyGraph::new();
        for node in self.nodes.values().filter(|n| keep_node(n)) {
            sub.add_node(node.clone());
        }
        for edge in self.edges.iter().filter(|e| keep_edge(e)) {
            sub.add_edge(edge.clone());
        }
        sub
    }

    /// Restrict or project the graph to a scope
    pub fn scoped(&self, scope: GraphScope) -> DependencyGraph {
        match scope {
            GraphScope::All => self.clone(),
            GraphScope::Symbol => self.subgraph(|n| !n.kind.is_container(), |_| true),
            GraphScope::File => self.project_to_files(),
        }
    }

    /// File-level dependency graph.
    ///
    /// Every edge between symbols of different files becomes one edge between
    /// the two file nodes. Imports win over other kinds for the same pair.
    fn project_to_files(&self) -> DependencyGraph {
        let mut projected = DependencyGraph::new();
        for node in self.nodes.values().filter(|n| n.kind.is_container()) {
            projected.add_node(node.clone());
        }

        let mut pairs: BTreeMap<(NodeId, NodeId), (EdgeKind, f64)> = BTreeMap::new();
        for edge in &self.edges {
            let (Some(from), Some(to)) = (self.nodes.get(&edge.from), self.nodes.get(&edge.to))
            else {
                continue;
            };
            if from.file == to.file {
                continue;
            }
            let key = (NodeId::file(&from.file), NodeId::file(&to.file));
            let slot = pairs.entry(key).or_insert((edge.kind, edge.confidence));
            if edge.kind == EdgeKind::Import {
                slot.0 = EdgeKind::Import;
            }
            if edge.confidence > slot.1 {
                slot.1 = edge.confidence;
            }
        }

        for ((from, to), (kind, confidence)) in pairs {
            projected.add_edge(GraphEdge::new(from, to, kind).with_confidence(confidence));
        }
        projected
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            ..Default::default()
        };
        for node in self.nodes.values() {
            *summary.nodes_by_kind.entry(node.kind).or_default() += 1;
        }
        for edge in &self.edges {
            *summary.edges_by_kind.entry(edge.kind).or_default() += 1;
        }

        let n = self.nodes.len() as f64;
        let e = self.edges.len() as f64;
        if n > 0.0 {
            summary.avg_degree = 2.0 * e / n;
        }
        if n > 1.0 {
            summary.density = e / (n * (n - 1.0));
        }

        let adj = self.adjacency();
        let labels = metrics::weak_component_labels(&metrics::undirected_neighbors(&adj));
        let sizes = metrics::component_sizes(&labels);
        summary.components = sizes.len();
        summary.largest_component = sizes.iter().copied().max().unwrap_or(0);
        summary.strongly_connected_components = metrics::strongly_connected_components(&adj)
            .iter()
            .filter(|scc| scc.len() > 1)
            .count();
        summary
    }
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DependencyGraph", 2)?;
        let nodes: Vec<&GraphNode> = self.nodes.values().collect();
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("edges", &self.sorted_edges())?;
        state.end()
    }
}
