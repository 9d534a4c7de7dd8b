//! Reachability call graph
//!
//! A compact, integer-indexed view of the code graph used by dead-code
//! analysis. Ids are assigned in sorted [`NodeId`] order so they are stable
//! across runs. Traversal runs on a petgraph `DiGraph` whose node index equals
//! the numeric id.

use super::model::{EdgeKind, NodeId, NodeKind};
use super::CodeGraph;
use crate::models::DefinitionKind;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, VisitMap};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallNode {
    pub id: u32,
    pub node_id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallEdge {
    pub from: u32,
    pub to: u32,
    pub kind: EdgeKind,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CallGraph {
    pub nodes: BTreeMap<u32, CallNode>,
    pub entry_points: BTreeSet<u32>,
    pub edges: Vec<CallEdge>,
    #[serde(skip)]
    index: FxHashMap<NodeId, u32>,
    #[serde(skip)]
    graph: DiGraph<u32, EdgeKind>,
}

impl CallGraph {
    /// Every node and edge of the code graph, plus a `type_reference` edge
    /// from each method to its owning type so a live method keeps its type
    /// alive.
    pub fn from_code_graph(code: &CodeGraph) -> Self {
        let mut cg = CallGraph::default();

        for (i, node) in code.graph.nodes().enumerate() {
            let id = i as u32;
            cg.index.insert(node.id.clone(), id);
            let ix = cg.graph.add_node(id);
            debug_assert_eq!(ix.index(), i);
            cg.nodes.insert(
                id,
                CallNode {
                    id,
                    node_id: node.id.clone(),
                    name: node.name.clone(),
                    kind: node.kind,
                    file: node.file.clone(),
                    line: node.line,
                },
            );
        }

        for edge in code.graph.sorted_edges() {
            cg.push_edge(&edge.from, &edge.to, edge.kind, edge.confidence);
        }

        // class name -> ids, to find owners declared in another file
        let mut classes: BTreeMap<&str, Vec<&NodeId>> = BTreeMap::new();
        for (id, def) in &code.definitions {
            if def.kind == DefinitionKind::Class {
                classes.entry(def.name.as_str()).or_default().push(id);
            }
        }
        for (id, def) in &code.definitions {
            let Some(receiver) = def.receiver.as_deref() else {
                continue;
            };
            let local = NodeId::new(&def.file, receiver);
            if code.definitions.contains_key(&local) {
                cg.push_edge(id, &local, EdgeKind::TypeReference, 1.0);
            } else if let Some(owners) = classes.get(receiver) {
                for owner in owners {
                    cg.push_edge(id, owner, EdgeKind::TypeReference, 1.0);
                }
            }
        }

        cg
    }

    fn push_edge(&mut self, from: &NodeId, to: &NodeId, kind: EdgeKind, confidence: f64) {
        let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        if a == b {
            return;
        }
        self.graph
            .add_edge(NodeIndex::new(a as usize), NodeIndex::new(b as usize), kind);
        self.edges.push(CallEdge {
            from: a,
            to: b,
            kind,
            confidence,
        });
    }

    pub fn id_of(&self, node: &NodeId) -> Option<u32> {
        self.index.get(node).copied()
    }

    pub fn node(&self, id: u32) -> Option<&CallNode> {
        self.nodes.get(&id)
    }

    pub fn add_entry_point(&mut self, id: u32) {
        if self.nodes.contains_key(&id) {
            self.entry_points.insert(id);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes reachable from the registered entry points (entry points included)
    pub fn reachable(&self) -> BTreeSet<u32> {
        self.reachable_from(&self.entry_points)
    }

    /// Breadth-first search seeded with every entry at once.
    ///
    /// The result always contains every valid entry.
    pub fn reachable_from(&self, entries: &BTreeSet<u32>) -> BTreeSet<u32> {
        let bound = self.graph.node_count();
        let mut seeds = entries
            .iter()
            .map(|&e| e as usize)
            .filter(|&e| e < bound)
            .map(NodeIndex::new);

        let Some(first) = seeds.next() else {
            return BTreeSet::new();
        };
        let mut bfs = Bfs::new(&self.graph, first);
        for ix in seeds {
            if bfs.discovered.visit(ix) {
                bfs.stack.push_back(ix);
            }
        }

        let mut visited = BTreeSet::new();
        while let Some(ix) = bfs.next(&self.graph) {
            visited.insert(ix.index() as u32);
        }
        visited
    }
}
