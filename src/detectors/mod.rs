//! Graph detectors
//!
//! Every detector reads the frozen dependency graph and reports
//! architectural smells. Dead-code analysis needs definitions and coverage as
//! well, so it has its own entry point in [`dead_code`].

pub mod cycles;
pub mod dead_code;
pub mod smells;

pub use cycles::{CycleDetector, CycleReport};
pub use dead_code::{
    ConfidenceLevel, DeadCodeAnalysis, DeadCodeAnalyzer, DeadCodeConfig, DeadCodeItem,
    DeadCodeSummary,
};
pub use smells::{ComponentMetrics, SmellAnalysis, SmellDetector, SmellSummary, SmellThresholds};

use crate::graph::{DependencyGraph, NodeId};
use crate::models::Severity;
use serde::{Deserialize, Serialize};

/// Architectural smell categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmellType {
    CyclicDependency,
    HubLikeDependency,
    GodComponent,
    UnstableDependency,
}

impl SmellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmellType::CyclicDependency => "cyclic_dependency",
            SmellType::HubLikeDependency => "hub_like_dependency",
            SmellType::GodComponent => "god_component",
            SmellType::UnstableDependency => "unstable_dependency",
        }
    }
}

impl std::fmt::Display for SmellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantitative data behind a smell. Only the fields relevant to the smell
/// type are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SmellMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_in: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_out: Option<usize>,
    /// Component instability, or the instability gap of an unstable dependency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_length: Option<usize>,
}

/// One architectural smell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Smell {
    /// Stable across runs: derived from the type and the members
    pub id: String,
    pub smell_type: SmellType,
    pub severity: Severity,
    pub components: Vec<NodeId>,
    pub description: String,
    pub suggestion: String,
    pub metrics: SmellMetrics,
}

impl Smell {
    pub fn new(
        smell_type: SmellType,
        severity: Severity,
        components: Vec<NodeId>,
        description: String,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            id: smell_id(smell_type, &components),
            smell_type,
            severity,
            components,
            description,
            suggestion: suggestion.into(),
            metrics: SmellMetrics::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: SmellMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

/// MD5 keeps ids stable across compiler versions, unlike `DefaultHasher`
fn smell_id(smell_type: SmellType, components: &[NodeId]) -> String {
    let mut input = String::from(smell_type.as_str());
    for c in components {
        input.push('\n');
        input.push_str(c.as_str());
    }
    let digest = md5::compute(input.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// A detector that only needs the dependency graph
pub trait Detector {
    /// Detector name for logging
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn detect(&self, graph: &DependencyGraph) -> Vec<Smell>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smell_id_is_stable_and_order_sensitive() {
        let a = vec![NodeId::from("a.go"), NodeId::from("b.go")];
        let b = vec![NodeId::from("b.go"), NodeId::from("a.go")];
        assert_eq!(
            smell_id(SmellType::CyclicDependency, &a),
            smell_id(SmellType::CyclicDependency, &a)
        );
        assert_ne!(
            smell_id(SmellType::CyclicDependency, &a),
            smell_id(SmellType::CyclicDependency, &b)
        );
        assert_ne!(
            smell_id(SmellType::CyclicDependency, &a),
            smell_id(SmellType::GodComponent, &a)
        );
    }

    #[test]
    fn test_smell_metrics_omit_unset_fields() {
        let smell = Smell::new(
            SmellType::CyclicDependency,
            Severity::Critical,
            vec![NodeId::from("a.go"), NodeId::from("b.go")],
            "cycle".to_string(),
            "break it",
        )
        .with_metrics(SmellMetrics {
            cycle_length: Some(2),
            ..SmellMetrics::default()
        });
        let json = serde_json::to_value(&smell).unwrap();
        assert_eq!(json["metrics"]["cycle_length"], 2);
        assert!(json["metrics"].get("fan_in").is_none());
        assert!(json["metrics"].get("instability").is_none());
    }
}
