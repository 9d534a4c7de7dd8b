//! Graph-theoretic metrics
//!
//! Centralities, clustering, connectivity and communities over the arena
//! adjacency of a [`DependencyGraph`]. Parallel edges of different kinds count
//! once here, except for the per-node degrees, which count every edge.
//!
//! The per-source algorithms (Brandes betweenness, closeness, harmonic,
//! diameter) run one BFS per source on rayon. Partial sums are combined in
//! a fixed chunk order, so results do not depend on the thread count.

use super::model::{Adjacency, DependencyGraph, GraphScope, NodeId};
use super::pagerank::{pagerank_scores, RankConfig};
use crate::errors::{GraphError, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::info;

const UNVISITED: usize = usize::MAX;

/// Sources are split into at most this many chunks for partial sums
const SOURCE_CHUNKS: usize = 256;

/// Local-moving passes before community refinement starts
const MAX_LOCAL_PASSES: usize = 100;

fn default_resolution() -> f64 {
    1.0
}
fn default_refinement_iterations() -> usize {
    100
}
fn default_diameter_samples() -> usize {
    100
}

/// Metrics parameters (`[metrics]` in repotoire.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub scope: GraphScope,
    /// Community resolution. Higher gives more and smaller communities.
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default = "default_refinement_iterations")]
    pub refinement_iterations: usize,
    /// BFS sources sampled for diameter and radius
    #[serde(default = "default_diameter_samples")]
    pub diameter_samples: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            scope: GraphScope::File,
            resolution: default_resolution(),
            refinement_iterations: default_refinement_iterations(),
            diameter_samples: default_diameter_samples(),
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution > 0.0 && self.resolution.is_finite()) {
            return Err(GraphError::InvalidParameter(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.diameter_samples == 0 {
            return Err(GraphError::InvalidParameter(
                "diameter_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Centrality scores of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCentrality {
    pub id: NodeId,
    pub page_rank: f64,
    /// Shortest paths between other nodes that pass through this one
    pub betweenness: f64,
    /// Reached nodes divided by the total distance to them
    pub closeness: f64,
    /// Sum of 1/distance over reached nodes, divided by n - 1
    pub harmonic: f64,
    pub eigenvector: f64,
    /// Local clustering coefficient of the undirected graph
    pub clustering: f64,
    pub in_degree: usize,
    pub out_degree: usize,
    pub community: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Weakly connected components
    pub components: usize,
    pub largest_component: usize,
    /// Strongly connected components with more than one member
    pub strongly_connected_components: usize,
    pub cycle_nodes: usize,
    pub is_cyclic: bool,
    /// Undirected eccentricity bounds over the largest component
    pub diameter: usize,
    pub radius: usize,
    /// Global transitivity of the undirected graph
    pub clustering_coefficient: f64,
    pub assortativity: f64,
    pub reciprocity: f64,
    pub community_count: usize,
    pub modularity: f64,
}

/// Every node metric plus the graph-level summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphMetrics {
    pub scope: GraphScope,
    /// In node id order
    pub nodes: Vec<NodeCentrality>,
    pub summary: MetricsSummary,
}

impl GraphMetrics {
    /// Highest betweenness first, ties by id
    pub fn top_by_betweenness(&self, n: usize) -> Vec<&NodeCentrality> {
        let mut ranked: Vec<&NodeCentrality> = self.nodes.iter().collect();
        ranked.sort_by(|a, b| {
            b.betweenness
                .total_cmp(&a.betweenness)
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked.truncate(n);
        ranked
    }
}

/// Compute every metric on `graph` scoped to `config.scope`.
///
/// # Errors
/// - `InvalidParameter` for a bad `RankConfig` or `MetricsConfig`
pub fn graph_metrics(
    graph: &DependencyGraph,
    rank: &RankConfig,
    config: &MetricsConfig,
) -> Result<GraphMetrics> {
    config.validate()?;
    let graph = &graph.scoped(config.scope);
    let adj = graph.adjacency();
    let page_rank = pagerank_scores(&adj, rank)?;
    let undirected = undirected_neighbors(&adj);
    let predecessors = predecessors(&adj);
    let (in_degree, out_degree) = edge_degrees(graph);

    let ((betweenness, distance), (eigenvector, (clustering, transitivity))) = rayon::join(
        || rayon::join(|| betweenness_centrality(&adj), || distance_centralities(&adj)),
        || {
            rayon::join(
                || eigenvector_centrality(&predecessors, rank.max_iterations, rank.tolerance),
                || clustering_coefficients(&undirected),
            )
        },
    );
    let communities = communities(&undirected, config.resolution, config.refinement_iterations)?;

    let sccs: Vec<Vec<usize>> = strongly_connected_components(&adj)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .collect();
    let labels = weak_component_labels(&undirected);
    let sizes = component_sizes(&labels);
    let (diameter, radius) = diameter_and_radius(&undirected, &labels, config.diameter_samples);

    let summary = MetricsSummary {
        total_nodes: graph.node_count(),
        total_edges: graph.edge_count(),
        components: sizes.len(),
        largest_component: sizes.iter().copied().max().unwrap_or(0),
        strongly_connected_components: sccs.len(),
        cycle_nodes: sccs.iter().map(Vec::len).sum(),
        is_cyclic: !sccs.is_empty(),
        diameter,
        radius,
        clustering_coefficient: transitivity,
        assortativity: assortativity(&adj),
        reciprocity: reciprocity(&adj),
        community_count: communities.iter().map(|&c| c as usize + 1).max().unwrap_or(0),
        modularity: modularity(&undirected, &communities, config.resolution),
    };

    let nodes = adj
        .ids
        .iter()
        .enumerate()
        .map(|(i, id)| NodeCentrality {
            id: (*id).clone(),
            page_rank: page_rank[i],
            betweenness: betweenness[i],
            closeness: distance[i].0,
            harmonic: distance[i].1,
            eigenvector: eigenvector[i],
            clustering: clustering[i],
            in_degree: in_degree[i],
            out_degree: out_degree[i],
            community: communities[i],
        })
        .collect();

    info!(
        "Metrics over {} nodes: {} components, {} communities, diameter {}",
        summary.total_nodes, summary.components, summary.community_count, summary.diameter
    );

    Ok(GraphMetrics {
        scope: config.scope,
        nodes,
        summary,
    })
}

/// Fan-in and fan-out per node in id order, counting every edge
pub fn edge_degrees(graph: &DependencyGraph) -> (Vec<usize>, Vec<usize>) {
    let position: FxHashMap<&NodeId, usize> = graph
        .nodes()
        .enumerate()
        .map(|(i, n)| (&n.id, i))
        .collect();
    let mut fan_in = vec![0usize; position.len()];
    let mut fan_out = vec![0usize; position.len()];
    for edge in graph.edges() {
        if let (Some(&from), Some(&to)) = (position.get(&edge.from), position.get(&edge.to)) {
            fan_out[from] += 1;
            fan_in[to] += 1;
        }
    }
    (fan_in, fan_out)
}

fn predecessors(adj: &Adjacency<'_>) -> Vec<Vec<usize>> {
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); adj.len()];
    for (src, targets) in adj.successors.iter().enumerate() {
        for &dst in targets {
            preds[dst].push(src);
        }
    }
    preds
}

/// Sorted neighbour lists ignoring direction
pub fn undirected_neighbors(adj: &Adjacency<'_>) -> Vec<Vec<usize>> {
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); adj.len()];
    for (src, targets) in adj.successors.iter().enumerate() {
        for &dst in targets {
            if src != dst {
                neighbors[src].push(dst);
                neighbors[dst].push(src);
            }
        }
    }
    for list in &mut neighbors {
        list.sort_unstable();
        list.dedup();
    }
    neighbors
}

/// Sum per-source contributions. Sources are chunked independently of the
/// thread pool and chunk totals are added in order.
fn sum_over_sources<F>(n: usize, contribute: F) -> Vec<f64>
where
    F: Fn(usize, &mut [f64]) + Sync,
{
    if n == 0 {
        return Vec::new();
    }
    let chunk = n.div_ceil(SOURCE_CHUNKS).max(1);
    let partials: Vec<Vec<f64>> = (0..n.div_ceil(chunk))
        .into_par_iter()
        .map(|c| {
            let mut acc = vec![0.0; n];
            for source in (c * chunk)..((c + 1) * chunk).min(n) {
                contribute(source, &mut acc);
            }
            acc
        })
        .collect();

    let mut total = vec![0.0; n];
    for partial in partials {
        for (t, p) in total.iter_mut().zip(partial) {
            *t += p;
        }
    }
    total
}

/// Directed betweenness centrality using Brandes' algorithm (PARALLELIZED)
pub fn betweenness_centrality(adj: &Adjacency<'_>) -> Vec<f64> {
    let n = adj.len();
    sum_over_sources(n, |source, acc| {
        let mut stack: Vec<usize> = Vec::new();
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut paths = vec![0.0f64; n];
        let mut distance = vec![UNVISITED; n];
        paths[source] = 1.0;
        distance[source] = 0;

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &adj.successors[v] {
                if distance[w] == UNVISITED {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    paths[w] += paths[v];
                    preds[w].push(v);
                }
            }
        }

        let mut dependency = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                dependency[v] += paths[v] / paths[w] * (1.0 + dependency[w]);
            }
            if w != source {
                acc[w] += dependency[w];
            }
        }
    })
}

/// `(closeness, harmonic)` per node over outgoing shortest paths
/// (PARALLELIZED).
///
/// Closeness is reached nodes over total distance, so it stays finite on
/// disconnected graphs. Harmonic is normalised by `n - 1`. A node that reaches
/// nothing scores 0 on both.
pub fn distance_centralities(adj: &Adjacency<'_>) -> Vec<(f64, f64)> {
    let n = adj.len();
    if n < 2 {
        return vec![(0.0, 0.0); n];
    }
    let norm = (n - 1) as f64;

    (0..n)
        .into_par_iter()
        .map(|source| {
            let mut distance = vec![UNVISITED; n];
            distance[source] = 0;
            let mut queue = VecDeque::from([source]);
            let mut reached = 0usize;
            let mut total = 0usize;
            let mut harmonic = 0.0;

            while let Some(v) = queue.pop_front() {
                for &w in &adj.successors[v] {
                    if distance[w] == UNVISITED {
                        distance[w] = distance[v] + 1;
                        reached += 1;
                        total += distance[w];
                        harmonic += 1.0 / distance[w] as f64;
                        queue.push_back(w);
                    }
                }
            }

            let closeness = if total == 0 {
                0.0
            } else {
                reached as f64 / total as f64
            };
            (closeness, harmonic / norm)
        })
        .collect()
}

/// Eigenvector centrality by power iteration over incoming edges.
///
/// Iterates `x <- (A + I) x` with L2 normalisation. The identity shift keeps
/// acyclic graphs from collapsing to zero and has the same eigenvectors.
pub fn eigenvector_centrality(
    predecessors: &[Vec<usize>],
    max_iterations: usize,
    tolerance: f64,
) -> Vec<f64> {
    let n = predecessors.len();
    if n == 0 {
        return Vec::new();
    }
    let mut scores = vec![1.0 / n as f64; n];

    for _ in 0..max_iterations {
        let mut next: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|v| scores[v] + predecessors[v].iter().map(|&u| scores[u]).sum::<f64>())
            .collect();

        let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut next {
                *x /= norm;
            }
        }

        let diff = scores
            .iter()
            .zip(&next)
            .map(|(old, new)| (old - new).abs())
            .fold(0.0, f64::max);
        scores = next;
        if diff < tolerance {
            break;
        }
    }
    scores
}

/// Local clustering coefficients and the global transitivity
pub fn clustering_coefficients(neighbors: &[Vec<usize>]) -> (Vec<f64>, f64) {
    let per_node: Vec<(f64, usize, usize)> = neighbors
        .par_iter()
        .map(|list| {
            let k = list.len();
            if k < 2 {
                return (0.0, 0, 0);
            }
            let mut triangles = 0usize;
            for (i, &a) in list.iter().enumerate() {
                for &b in &list[i + 1..] {
                    if neighbors[a].binary_search(&b).is_ok() {
                        triangles += 1;
                    }
                }
            }
            let triplets = k * (k - 1) / 2;
            (triangles as f64 / triplets as f64, triangles, triplets)
        })
        .collect();

    let triangles: usize = per_node.iter().map(|p| p.1).sum();
    let triplets: usize = per_node.iter().map(|p| p.2).sum();
    let global = if triplets == 0 {
        0.0
    } else {
        triangles as f64 / triplets as f64
    };
    (per_node.into_iter().map(|p| p.0).collect(), global)
}

/// Weakly connected component label per node. Labels follow the smallest
/// member index.
pub fn weak_component_labels(neighbors: &[Vec<usize>]) -> Vec<usize> {
    let n = neighbors.len();
    let mut labels = vec![UNVISITED; n];
    let mut next = 0;
    for root in 0..n {
        if labels[root] != UNVISITED {
            continue;
        }
        labels[root] = next;
        let mut queue = VecDeque::from([root]);
        while let Some(v) = queue.pop_front() {
            for &w in &neighbors[v] {
                if labels[w] == UNVISITED {
                    labels[w] = next;
                    queue.push_back(w);
                }
            }
        }
        next += 1;
    }
    labels
}

/// Member count per component label
pub fn component_sizes(labels: &[usize]) -> Vec<usize> {
    let count = labels.iter().map(|&l| l + 1).max().unwrap_or(0);
    let mut sizes = vec![0usize; count];
    for &l in labels {
        sizes[l] += 1;
    }
    sizes
}

/// Undirected diameter and radius of the largest component.
///
/// Eccentricities come from up to `samples` evenly spaced members, so both
/// are exact for components of at most `samples` nodes and bounds above that.
pub fn diameter_and_radius(neighbors: &[Vec<usize>], labels: &[usize], samples: usize) -> (usize, usize) {
    let sizes = component_sizes(labels);
    let Some(largest) = sizes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(label, _)| label)
    else {
        return (0, 0);
    };

    let members: Vec<usize> = (0..labels.len()).filter(|&v| labels[v] == largest).collect();
    let step = (members.len() / samples.max(1)).max(1);
    let sources: Vec<usize> = members.iter().step_by(step).take(samples).copied().collect();
    let n = neighbors.len();

    let eccentricities: Vec<usize> = sources
        .par_iter()
        .map(|&source| {
            let mut distance = vec![UNVISITED; n];
            distance[source] = 0;
            let mut queue = VecDeque::from([source]);
            let mut farthest = 0;
            while let Some(v) = queue.pop_front() {
                for &w in &neighbors[v] {
                    if distance[w] == UNVISITED {
                        distance[w] = distance[v] + 1;
                        farthest = farthest.max(distance[w]);
                        queue.push_back(w);
                    }
                }
            }
            farthest
        })
        .collect();

    let diameter = eccentricities.iter().copied().max().unwrap_or(0);
    let radius = eccentricities.iter().copied().min().unwrap_or(0);
    (diameter, radius)
}

/// Fraction of edges whose reverse edge also exists
pub fn reciprocity(adj: &Adjacency<'_>) -> f64 {
    let mut edges = 0usize;
    let mut mutual = 0usize;
    for (src, targets) in adj.successors.iter().enumerate() {
        for &dst in targets {
            edges += 1;
            if adj.successors[dst].binary_search(&src).is_ok() {
                mutual += 1;
            }
        }
    }
    if edges == 0 {
        0.0
    } else {
        mutual as f64 / edges as f64
    }
}

/// Degree assortativity: Pearson correlation of total degrees across edges
pub fn assortativity(adj: &Adjacency<'_>) -> f64 {
    let in_degrees = adj.in_degrees();
    let degree: Vec<f64> = adj
        .successors
        .iter()
        .zip(&in_degrees)
        .map(|(out, &d_in)| (out.len() + d_in) as f64)
        .collect();

    let (mut sx, mut sy, mut sxy, mut sx2, mut sy2, mut m) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for (src, targets) in adj.successors.iter().enumerate() {
        for &dst in targets {
            let (x, y) = (degree[src], degree[dst]);
            sx += x;
            sy += y;
            sxy += x * y;
            sx2 += x * x;
            sy2 += y * y;
            m += 1.0;
        }
    }
    if m == 0.0 {
        return 0.0;
    }
    let num = sxy - sx * sy / m;
    let var_x = sx2 - sx * sx / m;
    let var_y = sy2 - sy * sy / m;
    if var_x > 0.0 && var_y > 0.0 {
        num / (var_x * var_y).sqrt()
    } else {
        0.0
    }
}

/// Community detection: Louvain local moving followed by a Leiden-style
/// refinement that moves nodes with more external than internal links.
///
/// Returns contiguous community ids numbered by first appearance.
///
/// # Errors
/// - `InvalidParameter` if resolution <= 0
pub fn communities(
    neighbors: &[Vec<usize>],
    resolution: f64,
    refinement_iterations: usize,
) -> Result<Vec<u32>> {
    if !(resolution > 0.0 && resolution.is_finite()) {
        return Err(GraphError::InvalidParameter(format!(
            "resolution must be positive, got {}",
            resolution
        )));
    }
    let n = neighbors.len();
    let mut community: Vec<usize> = (0..n).collect();
    let degrees: Vec<f64> = neighbors.iter().map(|list| list.len() as f64).collect();
    let m = degrees.iter().sum::<f64>() / 2.0;
    if m == 0.0 {
        return Ok(renumber(&community));
    }

    // sum of member degrees per community
    let mut totals = degrees.clone();
    let gain = |links: f64, total: f64, k: f64| links / m - resolution * total * k / (2.0 * m * m);

    for _ in 0..MAX_LOCAL_PASSES {
        let mut moved = false;
        for node in 0..n {
            let current = community[node];
            let k = degrees[node];
            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for &nb in &neighbors[node] {
                *links.entry(community[nb]).or_insert(0.0) += 1.0;
            }

            totals[current] -= k;
            let mut best = current;
            let mut best_gain = gain(links.get(&current).copied().unwrap_or(0.0), totals[current], k);
            for (&c, &l) in &links {
                let g = gain(l, totals[c], k);
                if g > best_gain {
                    best_gain = g;
                    best = c;
                }
            }
            totals[best] += k;
            if best != current {
                community[node] = best;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }

    // Refinement
    for _ in 0..refinement_iterations {
        let mut changed = false;
        for node in 0..n {
            let current = community[node];
            let internal = neighbors[node]
                .iter()
                .filter(|&&nb| community[nb] == current)
                .count();
            let external = neighbors[node].len() - internal;
            if external <= internal {
                continue;
            }

            let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
            for &nb in &neighbors[node] {
                if community[nb] != current {
                    *counts.entry(community[nb]).or_insert(0) += 1;
                }
            }
            let mut best: Option<(usize, usize)> = None;
            for (&c, &count) in &counts {
                if best.map_or(true, |(_, b)| count > b) {
                    best = Some((c, count));
                }
            }
            if let Some((c, count)) = best {
                if count > internal {
                    community[node] = c;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    Ok(renumber(&community))
}

fn renumber(community: &[usize]) -> Vec<u32> {
    let mut mapping: FxHashMap<usize, u32> = FxHashMap::default();
    community
        .iter()
        .map(|c| {
            let next = mapping.len() as u32;
            *mapping.entry(*c).or_insert(next)
        })
        .collect()
}

/// Newman modularity of a partition of the undirected graph
pub fn modularity(neighbors: &[Vec<usize>], community: &[u32], resolution: f64) -> f64 {
    let degree_sum: usize = neighbors.iter().map(Vec::len).sum();
    if degree_sum == 0 {
        return 0.0;
    }
    let m = degree_sum as f64 / 2.0;
    let count = community.iter().map(|&c| c as usize + 1).max().unwrap_or(0);
    let mut internal = vec![0.0f64; count];
    let mut degrees = vec![0.0f64; count];
    for (v, list) in neighbors.iter().enumerate() {
        let c = community[v] as usize;
        degrees[c] += list.len() as f64;
        // each internal edge is seen from both ends
        internal[c] += list.iter().filter(|&&w| community[w] as usize == c).count() as f64 / 2.0;
    }
    internal
        .iter()
        .zip(&degrees)
        .map(|(l, d)| l / m - resolution * (d / (2.0 * m)).powi(2))
        .sum()
}

/// Iterative Tarjan.
///
/// Returns every SCC, singletons included. Members are listed in discovery
/// order, which follows the cycle path for simple cycles.
pub fn strongly_connected_components(adj: &Adjacency<'_>) -> Vec<Vec<usize>> {
    let n = adj.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut sccs = Vec::new();

    // (node, position of the next successor to explore)
    let mut work: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        work.push((root, 0));

        while let Some(frame) = work.last_mut() {
            let v = frame.0;
            if let Some(&w) = adj.successors[v].get(frame.1) {
                frame.1 += 1;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    work.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }

            if lowlink[v] == index[v] {
                let mut scc = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    scc.push(w);
                    if w == v {
                        break;
                    }
                }
                scc.reverse();
                sccs.push(scc);
            }
        }
    }

    sccs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{EdgeKind, GraphEdge, GraphNode, NodeKind};

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

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

    fn star(leaves: usize) -> DependencyGraph {
        let names: Vec<String> = (0..leaves).map(|i| format!("leaf{i}")).collect();
        let mut nodes: Vec<&str> = vec!["hub"];
        nodes.extend(names.iter().map(String::as_str));
        let mut edges = Vec::new();
        for leaf in &names {
            edges.push(("hub", leaf.as_str()));
            edges.push((leaf.as_str(), "hub"));
        }
        graph(&nodes, &edges)
    }

    /// Two directed triangles joined by c -> d
    fn two_triangles() -> DependencyGraph {
        graph(
            &["a", "b", "c", "d", "e", "f"],
            &[
                ("a", "b"),
                ("b", "c"),
                ("c", "a"),
                ("d", "e"),
                ("e", "f"),
                ("f", "d"),
                ("c", "d"),
            ],
        )
    }

    fn symbol_scope() -> MetricsConfig {
        MetricsConfig {
            scope: GraphScope::Symbol,
            ..MetricsConfig::default()
        }
    }

    #[test]
    fn test_betweenness_on_path() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let scores = betweenness_centrality(&g.adjacency());
        assert_eq!(scores, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_betweenness_of_star_center() {
        let g = star(4);
        let adj = g.adjacency();
        let scores = betweenness_centrality(&adj);
        let hub = adj.ids.iter().position(|id| id.as_str() == "hub").unwrap();
        assert!(approx_eq(scores[hub], 12.0));
        for (i, s) in scores.iter().enumerate() {
            if i != hub {
                assert!(approx_eq(*s, 0.0));
            }
        }
    }

    #[test]
    fn test_betweenness_across_source_chunks() {
        let n = 600;
        let names: Vec<String> = (0..n).map(|i| format!("n{i:04}")).collect();
        let nodes: Vec<&str> = names.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = nodes.windows(2).map(|w| (w[0], w[1])).collect();
        let g = graph(&nodes, &edges);

        let scores = betweenness_centrality(&g.adjacency());
        for (i, s) in scores.iter().enumerate() {
            assert!(approx_eq(*s, (i * (n - 1 - i)) as f64), "node {i}: {s}");
        }
    }

    #[test]
    fn test_closeness_and_harmonic_follow_edges() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let scores = distance_centralities(&g.adjacency());
        assert!(approx_eq(scores[0].0, 2.0 / 3.0));
        assert!(approx_eq(scores[0].1, 0.75));
        assert!(approx_eq(scores[1].0, 1.0));
        assert!(approx_eq(scores[1].1, 0.5));
        assert_eq!(scores[2], (0.0, 0.0));
    }

    #[test]
    fn test_eigenvector_uniform_on_cycle() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let scores = eigenvector_centrality(&predecessors(&g.adjacency()), 100, 1e-9);
        for s in scores {
            assert!(approx_eq(s, 1.0 / 3f64.sqrt()));
        }
    }

    #[test]
    fn test_eigenvector_favours_called_nodes() {
        let g = graph(&["hub", "x", "y", "z"], &[("x", "hub"), ("y", "hub"), ("z", "hub")]);
        let adj = g.adjacency();
        let scores = eigenvector_centrality(&predecessors(&adj), 100, 1e-9);
        let hub = adj.ids.iter().position(|id| id.as_str() == "hub").unwrap();
        assert!(scores.iter().all(|&s| s <= scores[hub]));
        assert!(scores[hub] > 0.0);
    }

    #[test]
    fn test_clustering_triangle_and_star() {
        let triangle = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let (local, global) = clustering_coefficients(&undirected_neighbors(&triangle.adjacency()));
        assert!(local.iter().all(|&c| approx_eq(c, 1.0)));
        assert!(approx_eq(global, 1.0));

        let (local, global) = clustering_coefficients(&undirected_neighbors(&star(4).adjacency()));
        assert!(local.iter().all(|&c| c == 0.0));
        assert_eq!(global, 0.0);
    }

    #[test]
    fn test_weak_components() {
        let g = graph(
            &["a", "b", "c", "d", "e", "f"],
            &[("a", "b"), ("e", "d"), ("e", "f")],
        );
        let labels = weak_component_labels(&undirected_neighbors(&g.adjacency()));
        assert_eq!(labels, vec![0, 0, 1, 2, 2, 2]);
        assert_eq!(component_sizes(&labels), vec![2, 1, 3]);
    }

    #[test]
    fn test_diameter_and_radius_of_path() {
        let g = graph(
            &["a", "b", "c", "d", "lonely"],
            &[("a", "b"), ("b", "c"), ("c", "d")],
        );
        let neighbors = undirected_neighbors(&g.adjacency());
        let labels = weak_component_labels(&neighbors);
        assert_eq!(diameter_and_radius(&neighbors, &labels, 100), (3, 2));
        assert_eq!(diameter_and_radius(&[], &[], 100), (0, 0));
    }

    #[test]
    fn test_reciprocity() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "a"), ("b", "c")]);
        assert!(approx_eq(reciprocity(&g.adjacency()), 2.0 / 3.0));
        assert_eq!(reciprocity(&graph(&["a"], &[]).adjacency()), 0.0);
    }

    #[test]
    fn test_star_is_disassortative() {
        assert!(approx_eq(assortativity(&star(4).adjacency()), -1.0));
    }

    #[test]
    fn test_communities_split_two_triangles() {
        let neighbors = undirected_neighbors(&two_triangles().adjacency());
        let community = communities(&neighbors, 1.0, 100).unwrap();
        assert_eq!(community, vec![0, 0, 0, 1, 1, 1]);
        assert!(approx_eq(modularity(&neighbors, &community, 1.0), 5.0 / 14.0));
    }

    #[test]
    fn test_communities_of_isolated_nodes() {
        let neighbors = undirected_neighbors(&graph(&["a", "b", "c"], &[]).adjacency());
        assert_eq!(communities(&neighbors, 1.0, 100).unwrap(), vec![0, 1, 2]);
        assert_eq!(modularity(&neighbors, &[0, 1, 2], 1.0), 0.0);
        assert!(communities(&neighbors, 0.0, 100).is_err());
    }

    #[test]
    fn test_edge_degrees_count_parallel_edges() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        g.add_edge(GraphEdge::new("a", "b", EdgeKind::Import));
        let (fan_in, fan_out) = edge_degrees(&g);
        assert_eq!(fan_in, vec![0, 2]);
        assert_eq!(fan_out, vec![2, 0]);
    }

    #[test]
    fn test_graph_metrics_summary() {
        let metrics =
            graph_metrics(&two_triangles(), &RankConfig::default(), &symbol_scope()).unwrap();
        let s = &metrics.summary;
        assert_eq!(s.total_nodes, 6);
        assert_eq!(s.total_edges, 7);
        assert_eq!(s.components, 1);
        assert_eq!(s.largest_component, 6);
        assert_eq!(s.strongly_connected_components, 2);
        assert_eq!(s.cycle_nodes, 6);
        assert!(s.is_cyclic);
        assert_eq!((s.diameter, s.radius), (3, 2));
        assert_eq!(s.community_count, 2);
        assert!(approx_eq(s.modularity, 5.0 / 14.0));

        let communities: Vec<u32> = metrics.nodes.iter().map(|n| n.community).collect();
        assert_eq!(communities, vec![0, 0, 0, 1, 1, 1]);
        let total_rank: f64 = metrics.nodes.iter().map(|n| n.page_rank).sum();
        assert!((total_rank - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_bridges_rank_first_by_betweenness() {
        let metrics =
            graph_metrics(&two_triangles(), &RankConfig::default(), &symbol_scope()).unwrap();
        let top: Vec<&str> = metrics
            .top_by_betweenness(2)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(top, vec!["c", "d"]);
    }

    #[test]
    fn test_empty_graph_metrics() {
        let metrics =
            graph_metrics(&DependencyGraph::new(), &RankConfig::default(), &symbol_scope()).unwrap();
        assert!(metrics.nodes.is_empty());
        assert_eq!(metrics.summary, MetricsSummary::default());
    }

    #[test]
    fn test_invalid_metrics_config() {
        let bad_resolution = MetricsConfig {
            resolution: -1.0,
            ..MetricsConfig::default()
        };
        assert!(bad_resolution.validate().is_err());
        let no_samples = MetricsConfig {
            diameter_samples: 0,
            ..MetricsConfig::default()
        };
        assert!(no_samples.validate().is_err());
        assert!(MetricsConfig::default().validate().is_ok());
    }
}
