//! Cyclic dependency detector using Tarjan's SCC algorithm
//!
//! Finds strongly connected components with more than one member. Each one
//! is a cyclic dependency and becomes a critical smell.
//!
//! # Algorithm
//!
//! Tarjan's algorithm ([`strongly_connected_components`]) runs in O(V+E) over
//! the sorted arena adjacency of the graph. The DFS is driven by an explicit
//! work stack instead of recursion, so deep dependency chains cannot overflow
//! the thread stack.

use super::{Detector, Smell, SmellMetrics, SmellType};
use crate::graph::metrics::strongly_connected_components;
use crate::graph::{DependencyGraph, GraphScope, NodeId};
use crate::models::Severity;
use serde::Serialize;
use tracing::{debug, info};

/// Cycles found in one graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub scope: GraphScope,
    /// Each cycle starts at its smallest id, ordered by that id
    pub cycles: Vec<Vec<NodeId>>,
    pub smells: Vec<Smell>,
    pub total_cycles: usize,
    pub largest_cycle: usize,
}

/// Detects cyclic dependencies
pub struct CycleDetector {
    scope: GraphScope,
}

impl CycleDetector {
    /// Create a detector for file-level cycles
    pub fn new() -> Self {
        Self {
            scope: GraphScope::File,
        }
    }

    pub fn with_scope(scope: GraphScope) -> Self {
        Self { scope }
    }

    /// Cycles of the scoped graph, each rotated to its smallest id
    pub fn find_cycles(&self, graph: &DependencyGraph) -> Vec<Vec<NodeId>> {
        let scoped = graph.scoped(self.scope);
        cycles_in(&scoped)
    }

    pub fn report(&self, graph: &DependencyGraph) -> CycleReport {
        let cycles = self.find_cycles(graph);
        let smells: Vec<Smell> = cycles.iter().map(|c| cycle_smell(c)).collect();
        let largest_cycle = cycles.iter().map(Vec::len).max().unwrap_or(0);

        info!(
            "CycleDetector found {} cycles (largest: {})",
            cycles.len(),
            largest_cycle
        );

        CycleReport {
            scope: self.scope,
            total_cycles: cycles.len(),
            largest_cycle,
            cycles,
            smells,
        }
    }
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for CycleDetector {
    fn name(&self) -> &'static str {
        "CycleDetector"
    }

    fn description(&self) -> &'static str {
        "Detects cyclic dependencies between components"
    }

    fn detect(&self, graph: &DependencyGraph) -> Vec<Smell> {
        self.report(graph).smells
    }
}

/// Cycles of an already scoped graph
pub(crate) fn cycles_in(graph: &DependencyGraph) -> Vec<Vec<NodeId>> {
    let adj = graph.adjacency();
    let mut cycles: Vec<Vec<NodeId>> = strongly_connected_components(&adj)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let ids: Vec<NodeId> = scc.iter().map(|&i| adj.ids[i].clone()).collect();
            normalize_cycle(&ids)
        })
        .collect();
    cycles.sort();

    debug!(
        "Tarjan over {} nodes produced {} multi-member SCCs",
        adj.len(),
        cycles.len()
    );
    cycles
}

/// Rotate a cycle to start with its smallest element
fn normalize_cycle(cycle: &[NodeId]) -> Vec<NodeId> {
    let min_idx = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| *v)
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut normalized = Vec::with_capacity(cycle.len());
    normalized.extend_from_slice(&cycle[min_idx..]);
    normalized.extend_from_slice(&cycle[..min_idx]);
    normalized
}

fn cycle_path(cycle: &[NodeId]) -> String {
    match cycle {
        [first, .., last] if cycle.len() > 3 => format!("{first} -> ... -> {last}"),
        _ => cycle
            .iter()
            .map(NodeId::as_str)
            .collect::<Vec<_>>()
            .join(" -> "),
    }
}

pub(crate) fn cycle_smell(cycle: &[NodeId]) -> Smell {
    Smell::new(
        SmellType::CyclicDependency,
        Severity::Critical,
        cycle.to_vec(),
        format!(
            "Cyclic dependency detected between {} components: {}",
            cycle.len(),
            cycle_path(cycle)
        ),
        "Break the cycle by introducing an interface or restructuring the dependency direction",
    )
    .with_metrics(SmellMetrics {
        cycle_length: Some(cycle.len()),
        ..SmellMetrics::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, GraphEdge, GraphNode, NodeKind};
    use petgraph::algo::tarjan_scc;
    use petgraph::graph::{DiGraph, NodeIndex};
    use std::collections::BTreeSet;

    fn file_graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for n in nodes {
            g.add_node(GraphNode::new(*n, *n, NodeKind::File, *n));
        }
        for (a, b) in edges {
            g.add_edge(GraphEdge::new(*a, *b, EdgeKind::Import));
        }
        g
    }

    fn names(cycle: &[NodeId]) -> Vec<&str> {
        cycle.iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn test_three_cycle_is_one_critical_smell() {
        let g = file_graph(
            &["a.py", "b.py", "c.py"],
            &[("a.py", "b.py"), ("b.py", "c.py"), ("c.py", "a.py")],
        );
        let report = CycleDetector::new().report(&g);
        assert_eq!(report.total_cycles, 1);
        assert_eq!(names(&report.cycles[0]), vec!["a.py", "b.py", "c.py"]);

        let smell = &report.smells[0];
        assert_eq!(smell.smell_type, SmellType::CyclicDependency);
        assert_eq!(smell.severity, Severity::Critical);
        assert_eq!(
            smell.description,
            "Cyclic dependency detected between 3 components: a.py -> b.py -> c.py"
        );
        assert_eq!(smell.metrics.cycle_length, Some(3));
        assert_eq!(smell.metrics.fan_in, None);
    }

    #[test]
    fn test_cycle_rotated_to_smallest_id() {
        let g = file_graph(
            &["b", "c", "a"],
            &[("c", "a"), ("a", "b"), ("b", "c")],
        );
        let cycles = CycleDetector::new().find_cycles(&g);
        assert_eq!(names(&cycles[0]), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_long_cycle_description_is_elided() {
        let g = file_graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "a")],
        );
        let smells = CycleDetector::new().detect(&g);
        assert_eq!(smells.len(), 1);
        assert!(smells[0]
            .description
            .ends_with("5 components: a -> ... -> e"));
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let g = file_graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(CycleDetector::new().find_cycles(&g).is_empty());
        assert!(CycleDetector::new().find_cycles(&DependencyGraph::new()).is_empty());
    }

    #[test]
    fn test_two_disjoint_cycles_sorted() {
        let g = file_graph(
            &["x", "y", "a", "b", "solo"],
            &[("x", "y"), ("y", "x"), ("b", "a"), ("a", "b"), ("solo", "a")],
        );
        let cycles = CycleDetector::new().find_cycles(&g);
        assert_eq!(cycles.len(), 2);
        assert_eq!(names(&cycles[0]), vec!["a", "b"]);
        assert_eq!(names(&cycles[1]), vec!["x", "y"]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let n = 50_000;
        let ids: Vec<String> = (0..n).map(|i| format!("n{i:06}")).collect();
        let mut g = DependencyGraph::new();
        for id in &ids {
            g.add_node(GraphNode::new(id.as_str(), id.as_str(), NodeKind::File, id.as_str()));
        }
        for pair in ids.windows(2) {
            g.add_edge(GraphEdge::new(pair[0].as_str(), pair[1].as_str(), EdgeKind::Import));
        }
        g.add_edge(GraphEdge::new(
            ids[n - 1].as_str(),
            ids[0].as_str(),
            EdgeKind::Import,
        ));

        let cycles = CycleDetector::new().find_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), n);
    }

    #[test]
    fn test_membership_matches_petgraph() {
        let edges = [
            ("a", "b"),
            ("b", "c"),
            ("c", "a"),
            ("c", "d"),
            ("d", "e"),
            ("e", "d"),
            ("f", "a"),
            ("g", "g2"),
        ];
        let nodes = ["a", "b", "c", "d", "e", "f", "g", "g2"];
        let g = file_graph(&nodes, &edges);

        let ours: BTreeSet<BTreeSet<String>> = CycleDetector::new()
            .find_cycles(&g)
            .into_iter()
            .map(|c| c.into_iter().map(|id| id.to_string()).collect())
            .collect();

        let mut pg: DiGraph<&str, ()> = DiGraph::new();
        let idx: Vec<NodeIndex> = nodes.iter().map(|n| pg.add_node(*n)).collect();
        for (a, b) in edges {
            let ai = nodes.iter().position(|n| *n == a).unwrap();
            let bi = nodes.iter().position(|n| *n == b).unwrap();
            pg.add_edge(idx[ai], idx[bi], ());
        }
        let theirs: BTreeSet<BTreeSet<String>> = tarjan_scc(&pg)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.into_iter().map(|i| pg[i].to_string()).collect())
            .collect();

        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_symbol_scope_finds_mutual_recursion() {
        let mut g = DependencyGraph::new();
        g.add_node(GraphNode::new("m.go", "m.go", NodeKind::File, "m.go"));
        g.add_node(GraphNode::new("m.go::even", "even", NodeKind::Function, "m.go"));
        g.add_node(GraphNode::new("m.go::odd", "odd", NodeKind::Function, "m.go"));
        g.add_edge(GraphEdge::new("m.go::even", "m.go::odd", EdgeKind::DirectCall));
        g.add_edge(GraphEdge::new("m.go::odd", "m.go::even", EdgeKind::DirectCall));

        assert!(CycleDetector::new().find_cycles(&g).is_empty());
        let cycles = CycleDetector::with_scope(GraphScope::Symbol).find_cycles(&g);
        assert_eq!(names(&cycles[0]), vec!["m.go::even", "m.go::odd"]);
    }
}
