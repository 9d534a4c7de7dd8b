//! PageRank importance ranking
//!
//! Power iteration over the arena adjacency. Rank lost at dangling nodes is
//! spread evenly over every node, so scores always sum to 1.

use super::model::{Adjacency, DependencyGraph, NodeId};
use crate::errors::{GraphError, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

fn default_damping() -> f64 {
    0.85
}
fn default_tolerance() -> f64 {
    1e-6
}
fn default_max_iterations() -> usize {
    100
}
fn default_top_n() -> usize {
    50
}

/// PageRank parameters (`[rank]` in repotoire.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankConfig {
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Symbols shown by the repo map
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            top_n: default_top_n(),
        }
    }
}

impl RankConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(GraphError::InvalidParameter(format!(
                "damping must be in [0, 1], got {}",
                self.damping
            )));
        }
        if self.tolerance <= 0.0 || self.tolerance.is_nan() {
            return Err(GraphError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Rank and degree of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetric {
    pub id: NodeId,
    pub page_rank: f64,
    pub in_degree: usize,
    pub out_degree: usize,
}

/// Calculate PageRank scores over an adjacency (PARALLELIZED).
///
/// Index `i` of the result is the score of `adj.ids[i]`. An empty graph gives
/// an empty vector.
///
/// # Errors
/// - `InvalidParameter` if damping is not in [0, 1] or tolerance <= 0
pub fn pagerank_scores(adj: &Adjacency<'_>, config: &RankConfig) -> Result<Vec<f64>> {
    config.validate()?;

    let n = adj.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (src, targets) in adj.successors.iter().enumerate() {
        for &dst in targets {
            incoming[dst].push(src);
        }
    }
    let out_degree: Vec<usize> = adj.successors.iter().map(Vec::len).collect();
    let dangling: Vec<usize> = (0..n).filter(|&i| out_degree[i] == 0).collect();

    let nf = n as f64;
    let damping = config.damping;
    let teleport = (1.0 - damping) / nf;
    let mut scores = vec![1.0 / nf; n];

    for _ in 0..config.max_iterations {
        let dangling_share = damping * dangling.iter().map(|&i| scores[i]).sum::<f64>() / nf;

        let next: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|node| {
                let mut score = teleport + dangling_share;
                for &src in &incoming[node] {
                    score += damping * scores[src] / out_degree[src] as f64;
                }
                score
            })
            .collect();

        // Summed in index order so repeated runs converge identically
        let diff: f64 = scores
            .iter()
            .zip(&next)
            .map(|(old, new)| (old - new).abs())
            .sum();
        scores = next;

        if diff < config.tolerance {
            break;
        }
    }

    Ok(scores)
}

/// PageRank plus degrees for every node, in node id order
pub fn page_rank(graph: &DependencyGraph, config: &RankConfig) -> Result<Vec<NodeMetric>> {
    let adj = graph.adjacency();
    let scores = pagerank_scores(&adj, config)?;
    let in_degrees = adj.in_degrees();

    Ok(adj
        .ids
        .iter()
        .enumerate()
        .map(|(i, id)| NodeMetric {
            id: (*id).clone(),
            page_rank: scores[i],
            in_degree: in_degrees[i],
            out_degree: adj.successors[i].len(),
        })
        .collect())
}

/// Keep the `max_nodes` highest-ranked nodes and at most `max_edges` edges
/// between them, preferring edges between highly ranked endpoints.
pub fn prune(
    graph: &DependencyGraph,
    max_nodes: usize,
    max_edges: usize,
    config: &RankConfig,
) -> Result<DependencyGraph> {
    let mut metrics = page_rank(graph, config)?;
    metrics.sort_by(|a, b| {
        b.page_rank
            .total_cmp(&a.page_rank)
            .then_with(|| a.id.cmp(&b.id))
    });
    metrics.truncate(max_nodes);

    let ranks: FxHashMap<&NodeId, f64> = metrics.iter().map(|m| (&m.id, m.page_rank)).collect();
    let weight = |from: &NodeId, to: &NodeId| -> f64 {
        ranks.get(from).copied().unwrap_or(0.0) + ranks.get(to).copied().unwrap_or(0.0)
    };

    let mut edges: Vec<_> = graph
        .sorted_edges()
        .into_iter()
        .filter(|e| ranks.contains_key(&e.from) && ranks.contains_key(&e.to))
        .collect();
    // stable sort keeps (from, to, kind) order among equal weights
    edges.sort_by(|a, b| weight(&b.from, &b.to).total_cmp(&weight(&a.from, &a.to)));
    edges.truncate(max_edges);

    let mut pruned = DependencyGraph::new();
    for node in graph.nodes().filter(|n| ranks.contains_key(&n.id)) {
        pruned.add_node(node.clone());
    }
    for edge in edges {
        pruned.add_edge(edge.clone());
    }
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{EdgeKind, GraphEdge, GraphNode, NodeKind};

    const EPSILON: f64 = 1e-6;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for n in nodes {
            g.add_node(GraphNode::new(*n, *n, NodeKind::Function, "f.go"));
        }
        for (a, b) in edges {
            g.add_edge(GraphEdge::new(*a, *b, EdgeKind::DirectCall));
        }
        g
    }

    fn total(metrics: &[NodeMetric]) -> f64 {
        metrics.iter().map(|m| m.page_rank).sum()
    }

    #[test]
    fn test_empty_graph() {
        let metrics = page_rank(&DependencyGraph::new(), &RankConfig::default()).unwrap();
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_scores_sum_to_one_with_dangling_nodes() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        let metrics = page_rank(&g, &RankConfig::default()).unwrap();
        assert!((total(&metrics) - 1.0).abs() < 1e-4);
        assert!(metrics.iter().all(|m| m.page_rank >= 0.0));
    }

    #[test]
    fn test_popular_node_ranks_highest() {
        let g = graph(
            &["hub", "a", "b", "c"],
            &[("a", "hub"), ("b", "hub"), ("c", "hub")],
        );
        let metrics = page_rank(&g, &RankConfig::default()).unwrap();
        let hub = metrics.iter().find(|m| m.id.as_str() == "hub").unwrap();
        assert!(metrics.iter().all(|m| m.page_rank <= hub.page_rank + EPSILON));
        assert_eq!(hub.in_degree, 3);
        assert_eq!(hub.out_degree, 0);
    }

    #[test]
    fn test_cycle_is_uniform() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let metrics = page_rank(&g, &RankConfig::default()).unwrap();
        for m in &metrics {
            assert!((m.page_rank - 1.0 / 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_invalid_parameters() {
        let g = graph(&["a"], &[]);
        let bad_damping = RankConfig {
            damping: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            page_rank(&g, &bad_damping),
            Err(GraphError::InvalidParameter(_))
        ));
        let bad_tolerance = RankConfig {
            tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            page_rank(&g, &bad_tolerance),
            Err(GraphError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_prune_keeps_top_nodes() {
        let g = graph(
            &["hub", "a", "b", "c", "lonely"],
            &[("a", "hub"), ("b", "hub"), ("c", "hub"), ("a", "b")],
        );
        let pruned = prune(&g, 3, 1, &RankConfig::default()).unwrap();
        assert_eq!(pruned.node_count(), 3);
        assert!(pruned.contains(&NodeId::from("hub")));
        assert!(pruned.edge_count() <= 1);
    }
}
