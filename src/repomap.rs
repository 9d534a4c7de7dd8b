//! Repository map
//!
//! Ranks functions and classes by PageRank over the call graph so the most
//! central symbols of a codebase can be listed first.

use crate::errors::Result;
use crate::graph::pagerank::page_rank;
use crate::graph::{DependencyGraph, GraphNode, GraphScope, NodeId, NodeKind, RankConfig};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub file: String,
    pub line: u32,
    pub signature: String,
    pub page_rank: f64,
    pub in_degree: usize,
    pub out_degree: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepoMapSummary {
    pub total_symbols: usize,
    pub total_files: usize,
    pub avg_page_rank: f64,
    pub max_page_rank: f64,
    /// Mean of in-degree plus out-degree
    pub avg_connections: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepoMap {
    /// Highest rank first
    pub symbols: Vec<Symbol>,
    pub summary: RepoMapSummary,
}

impl RepoMap {
    /// Rank the function and class nodes of `graph` over its call edges
    pub fn from_graph(graph: &DependencyGraph, config: &RankConfig) -> Result<Self> {
        let symbols_only = graph.scoped(GraphScope::Symbol).subgraph(
            |n| matches!(n.kind, NodeKind::Function | NodeKind::Class),
            |e| e.kind.is_call(),
        );

        let metrics = page_rank(&symbols_only, config)?;
        let by_id: FxHashMap<&NodeId, &GraphNode> =
            symbols_only.nodes().map(|n| (&n.id, n)).collect();

        let mut symbols: Vec<Symbol> = metrics
            .into_iter()
            .filter_map(|m| {
                let node = by_id.get(&m.id)?;
                Some(Symbol {
                    name: node.name.clone(),
                    kind: node.kind,
                    file: node.file.clone(),
                    line: node.line,
                    signature: signature(node),
                    page_rank: m.page_rank,
                    in_degree: m.in_degree,
                    out_degree: m.out_degree,
                    id: m.id,
                })
            })
            .collect();

        symbols.sort_by(|a, b| {
            b.page_rank
                .total_cmp(&a.page_rank)
                .then_with(|| a.id.cmp(&b.id))
        });

        let summary = summarize(&symbols);
        debug!(
            "Repo map: {} symbols across {} files",
            summary.total_symbols, summary.total_files
        );
        Ok(RepoMap { symbols, summary })
    }

    pub fn top_n(&self, n: usize) -> &[Symbol] {
        &self.symbols[..n.min(self.symbols.len())]
    }

    /// Keep only the `n` highest-ranked symbols. The summary still
    /// describes the full map.
    pub fn truncate(&mut self, n: usize) {
        self.symbols.truncate(n);
    }
}

/// Extracted declaration line, or a synthesized one
fn signature(node: &GraphNode) -> String {
    if let Some(sig) = node.signature.as_deref().filter(|s| !s.is_empty()) {
        return sig.to_string();
    }
    match node.kind {
        NodeKind::Function => format!("func {}()", node.name),
        NodeKind::Class => format!("class {}", node.name),
        NodeKind::Module => format!("module {}", node.name),
        _ => node.name.clone(),
    }
}

fn summarize(symbols: &[Symbol]) -> RepoMapSummary {
    if symbols.is_empty() {
        return RepoMapSummary::default();
    }
    let n = symbols.len() as f64;
    let files: BTreeSet<&str> = symbols.iter().map(|s| s.file.as_str()).collect();
    RepoMapSummary {
        total_symbols: symbols.len(),
        total_files: files.len(),
        avg_page_rank: symbols.iter().map(|s| s.page_rank).sum::<f64>() / n,
        max_page_rank: symbols
            .iter()
            .map(|s| s.page_rank)
            .fold(0.0, f64::max),
        avg_connections: symbols
            .iter()
            .map(|s| (s.in_degree + s.out_degree) as f64)
            .sum::<f64>()
            / n,
    }
}
