//! Component metrics and architectural smells
//!
//! Uses fan-in and fan-out to detect:
//! - Hub-like dependencies: many connections in both directions
//! - God components: very high fan-in and fan-out at once
//! - Unstable dependencies: a stable component depending on an unstable one
//!
//! Cyclic dependencies come from [`super::cycles`] over the same scoped graph.
//! Fan-in and fan-out count edges, so a call and an import between the same
//! pair count twice.

use super::cycles::{cycle_smell, cycles_in};
use super::{Detector, Smell, SmellMetrics, SmellType};
use crate::graph::metrics::edge_degrees;
use crate::graph::{DependencyGraph, GraphScope, NodeId};
use crate::models::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

fn default_hub_degree() -> usize {
    20
}
fn default_hub_min_fan_in() -> usize {
    3
}
fn default_god_fan_in() -> usize {
    10
}
fn default_god_fan_out() -> usize {
    10
}
fn default_stable() -> f64 {
    0.3
}
fn default_unstable() -> f64 {
    0.7
}
fn default_min_gap() -> f64 {
    0.4
}

/// Classification thresholds (`[smells]` in repotoire.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmellThresholds {
    /// Hub when fan-in + fan-out exceeds this
    #[serde(default = "default_hub_degree")]
    pub hub_degree: usize,
    #[serde(default = "default_hub_min_fan_in")]
    pub hub_min_fan_in: usize,
    #[serde(default = "default_god_fan_in")]
    pub god_fan_in: usize,
    #[serde(default = "default_god_fan_out")]
    pub god_fan_out: usize,
    /// Instability below this is stable
    #[serde(default = "default_stable")]
    pub stable: f64,
    /// Instability above this is unstable
    #[serde(default = "default_unstable")]
    pub unstable: f64,
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,
}

impl Default for SmellThresholds {
    fn default() -> Self {
        Self {
            hub_degree: default_hub_degree(),
            hub_min_fan_in: default_hub_min_fan_in(),
            god_fan_in: default_god_fan_in(),
            god_fan_out: default_god_fan_out(),
            stable: default_stable(),
            unstable: default_unstable(),
            min_gap: default_min_gap(),
        }
    }
}

/// Per-component coupling metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentMetrics {
    pub id: NodeId,
    pub fan_in: usize,
    pub fan_out: usize,
    /// fan_out / (fan_in + fan_out), 0 for isolated components
    pub instability: f64,
    pub is_hub: bool,
    pub is_god: bool,
}

impl ComponentMetrics {
    fn new(id: NodeId, fan_in: usize, fan_out: usize, thresholds: &SmellThresholds) -> Self {
        let total = fan_in + fan_out;
        let instability = if total == 0 {
            0.0
        } else {
            fan_out as f64 / total as f64
        };
        let is_god = fan_in > thresholds.god_fan_in && fan_out > thresholds.god_fan_out;
        let is_hub = total > thresholds.hub_degree && fan_in >= thresholds.hub_min_fan_in;
        Self {
            id,
            fan_in,
            fan_out,
            instability,
            is_hub,
            is_god,
        }
    }

    fn smell_metrics(&self) -> SmellMetrics {
        SmellMetrics {
            fan_in: Some(self.fan_in),
            fan_out: Some(self.fan_out),
            instability: Some(self.instability),
            cycle_length: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SmellSummary {
    pub total_smells: usize,
    pub total_components: usize,
    pub by_type: BTreeMap<SmellType, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    pub hub_count: usize,
    pub god_count: usize,
    pub cycle_count: usize,
    pub average_instability: f64,
}

/// Everything the smell detector produces for one graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmellAnalysis {
    pub scope: GraphScope,
    pub smells: Vec<Smell>,
    /// Sorted by instability descending, then id
    pub components: Vec<ComponentMetrics>,
    pub summary: SmellSummary,
    pub thresholds: SmellThresholds,
}

/// Detects architectural smells from coupling metrics
pub struct SmellDetector {
    thresholds: SmellThresholds,
    scope: GraphScope,
}

impl SmellDetector {
    /// Create a new detector with default thresholds on the file graph
    pub fn new() -> Self {
        Self {
            thresholds: SmellThresholds::default(),
            scope: GraphScope::File,
        }
    }

    /// Create with custom thresholds
    pub fn with_config(thresholds: SmellThresholds, scope: GraphScope) -> Self {
        Self { thresholds, scope }
    }

    pub fn thresholds(&self) -> &SmellThresholds {
        &self.thresholds
    }

    /// Metrics for every node of an already scoped graph, in id order
    fn metrics(&self, graph: &DependencyGraph) -> Vec<ComponentMetrics> {
        let (fan_in, fan_out) = edge_degrees(graph);
        graph
            .nodes()
            .enumerate()
            .map(|(i, node)| {
                ComponentMetrics::new(node.id.clone(), fan_in[i], fan_out[i], &self.thresholds)
            })
            .collect()
    }

    fn node_smells(&self, metrics: &[ComponentMetrics]) -> Vec<Smell> {
        let mut smells = Vec::new();
        for m in metrics {
            if m.is_god {
                smells.push(Smell::new(
                    SmellType::GodComponent,
                    Severity::Critical,
                    vec![m.id.clone()],
                    format!(
                        "God component: {} has fan-in {} and fan-out {}",
                        m.id, m.fan_in, m.fan_out
                    ),
                    "Split this component by responsibility so dependents only pull in what they use",
                )
                .with_metrics(m.smell_metrics()));
            } else if m.is_hub {
                smells.push(Smell::new(
                    SmellType::HubLikeDependency,
                    Severity::High,
                    vec![m.id.clone()],
                    format!(
                        "Hub-like dependency: {} has {} dependents and {} dependencies",
                        m.id, m.fan_in, m.fan_out
                    ),
                    "Reduce coupling by extracting focused modules behind narrower interfaces",
                )
                .with_metrics(m.smell_metrics()));
            }
        }
        smells
    }

    /// One smell per edge from a stable component into an unstable one
    fn unstable_dependencies(
        &self,
        graph: &DependencyGraph,
        metrics: &[ComponentMetrics],
    ) -> Vec<Smell> {
        let t = &self.thresholds;
        let adj = graph.adjacency();
        let mut smells = Vec::new();

        for (from, targets) in adj.successors.iter().enumerate() {
            let a = &metrics[from];
            if a.instability >= t.stable {
                continue;
            }
            for &to in targets {
                let b = &metrics[to];
                if b.instability > t.unstable && b.instability - a.instability > t.min_gap {
                    smells.push(Smell::new(
                        SmellType::UnstableDependency,
                        Severity::Medium,
                        vec![a.id.clone(), b.id.clone()],
                        format!(
                            "Stable component {} (I={:.2}) depends on unstable component {} (I={:.2})",
                            a.id, a.instability, b.id, b.instability
                        ),
                        "Depend on an abstraction owned by the stable side instead",
                    )
                    .with_metrics(SmellMetrics {
                        instability: Some(b.instability - a.instability),
                        ..SmellMetrics::default()
                    }));
                }
            }
        }
        smells
    }

    pub fn analyze(&self, graph: &DependencyGraph) -> SmellAnalysis {
        let scoped = graph.scoped(self.scope);
        let metrics = self.metrics(&scoped);

        let mut smells: Vec<Smell> = cycles_in(&scoped)
            .into_iter()
            .map(|members| cycle_smell(&members))
            .collect();
        let cycle_count = smells.len();
        smells.extend(self.node_smells(&metrics));
        smells.extend(self.unstable_dependencies(&scoped, &metrics));

        let mut summary = SmellSummary {
            total_smells: smells.len(),
            total_components: metrics.len(),
            hub_count: metrics.iter().filter(|m| m.is_hub && !m.is_god).count(),
            god_count: metrics.iter().filter(|m| m.is_god).count(),
            cycle_count,
            ..Default::default()
        };
        for smell in &smells {
            *summary.by_type.entry(smell.smell_type).or_default() += 1;
            *summary.by_severity.entry(smell.severity).or_default() += 1;
        }
        if !metrics.is_empty() {
            summary.average_instability =
                metrics.iter().map(|m| m.instability).sum::<f64>() / metrics.len() as f64;
        }

        let mut components = metrics;
        components.sort_by(|a, b| {
            b.instability
                .total_cmp(&a.instability)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(
            "Smell metrics over {} components ({:?} scope)",
            components.len(),
            self.scope
        );
        info!(
            "SmellDetector found {} smells ({} cycles, {} god, {} hub)",
            summary.total_smells, summary.cycle_count, summary.god_count, summary.hub_count
        );

        SmellAnalysis {
            scope: self.scope,
            smells,
            components,
            summary,
            thresholds: self.thresholds.clone(),
        }
    }
}

impl Default for SmellDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SmellDetector {
    fn name(&self) -> &'static str {
        "SmellDetector"
    }

    fn description(&self) -> &'static str {
        "Detects hub-like, god, unstable and cyclic dependencies"
    }

    fn detect(&self, graph: &DependencyGraph) -> Vec<Smell> {
        self.analyze(graph).smells
    }
}
