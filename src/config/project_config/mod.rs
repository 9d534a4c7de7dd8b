//! Project-level configuration support
//!
//! Loads per-project configuration from `repotoire.toml` or
//! `.repotoirerc.json` in the repository root. Every key is optional.
//!
//! # Configuration Format
//!
//! ```toml
//! # repotoire.toml
//!
//! [graph]
//! workers = 8
//! max_file_size = 2097152
//! dispatch_confidence = 0.7
//!
//! [smells]
//! scope = "file"
//! hub_degree = 20
//! god_fan_in = 10
//!
//! [rank]
//! damping = 0.85
//! top_n = 50
//!
//! [metrics]
//! scope = "file"
//! resolution = 1.0
//! diameter_samples = 100
//!
//! [dead_code]
//! min_confidence = 0.5
//! exported_entry_points = false
//!
//! [exclude]
//! paths = ["generated/", "**/fixtures/**"]
//! ```

use crate::detectors::{DeadCodeConfig, SmellThresholds};
use crate::errors::{GraphError, Result};
use crate::graph::builder::DEFAULT_DISPATCH_CONFIDENCE;
use crate::graph::{GraphScope, MetricsConfig, RankConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Vendored and generated code skipped unless `skip_defaults = true`
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/vendor/**",
    "**/node_modules/**",
    "**/third_party/**",
    "**/dist/**",
    "**/*.min.js",
];

const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}
fn default_dispatch_confidence() -> f64 {
    DEFAULT_DISPATCH_CONFIDENCE
}
fn default_buffer_size() -> usize {
    256
}

/// Extraction and graph construction (`[graph]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Extraction workers, `None` for one per core
    #[serde(default)]
    pub workers: Option<usize>,
    /// Files larger than this many bytes are skipped
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_dispatch_confidence")]
    pub dispatch_confidence: f64,
    /// Capacity of the bounded extraction channels
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            workers: None,
            max_file_size: default_max_file_size(),
            dispatch_confidence: default_dispatch_confidence(),
            buffer_size: default_buffer_size(),
        }
    }
}

/// Smell thresholds plus the graph scope they apply to (`[smells]`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SmellsConfig {
    #[serde(default)]
    pub scope: GraphScope,
    #[serde(flatten)]
    pub thresholds: SmellThresholds,
}

/// Path exclusion configuration (`[exclude]`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExcludeConfig {
    #[serde(default)]
    pub paths: Vec<String>,
    /// Disable [`DEFAULT_EXCLUDE_PATTERNS`]
    #[serde(default)]
    pub skip_defaults: bool,
}

impl ExcludeConfig {
    /// Built-in patterns followed by user patterns, without duplicates
    pub fn effective_patterns(&self) -> Vec<String> {
        let defaults: &[&str] = if self.skip_defaults {
            &[]
        } else {
            DEFAULT_EXCLUDE_PATTERNS
        };
        let mut patterns: Vec<String> = defaults.iter().map(|p| p.to_string()).collect();
        for p in &self.paths {
            if !patterns.contains(p) {
                patterns.push(p.clone());
            }
        }
        patterns
    }

    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.effective_patterns()
            .iter()
            .any(|p| glob_match(p, relative_path))
    }
}

/// Project-level configuration from repotoire.toml
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub smells: SmellsConfig,
    #[serde(default)]
    pub rank: RankConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub dead_code: DeadCodeConfig,
    #[serde(default)]
    pub exclude: ExcludeConfig,
}

impl ProjectConfig {
    /// Reject values the analyses cannot run with
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.rank.validate().map_err(|e| e.to_string())?;
        self.metrics.validate().map_err(|e| e.to_string())?;
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(format!("{name} must be in [0, 1], got {v}"))
            }
        };
        unit("graph.dispatch_confidence", self.graph.dispatch_confidence)?;
        unit("dead_code.min_confidence", self.dead_code.min_confidence)?;
        unit(
            "dead_code.covered_confidence_cap",
            self.dead_code.covered_confidence_cap,
        )?;
        if self.graph.workers == Some(0) {
            return Err("graph.workers must be at least 1".to_string());
        }
        if self.graph.buffer_size == 0 {
            return Err("graph.buffer_size must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Load project configuration from the repository root.
///
/// Tries `repotoire.toml`, then `.repotoirerc.json`. A file that fails to
/// parse or validate is logged and skipped. Falls back to defaults.
pub fn load_project_config(repo_path: &Path) -> ProjectConfig {
    let candidates: [(&str, fn(&Path) -> Result<ProjectConfig>); 2] = [
        ("repotoire.toml", load_toml_config),
        (".repotoirerc.json", load_json_config),
    ];

    for (name, load) in candidates {
        let path = repo_path.join(name);
        if !path.exists() {
            continue;
        }
        match load(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => warn!("Failed to load {}: {}", path.display(), e),
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

fn config_error(path: &Path, message: impl ToString) -> GraphError {
    GraphError::Config {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Load configuration from a TOML file
fn load_toml_config(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content).map_err(|e| config_error(path, e))?;
    config.validate().map_err(|e| config_error(path, e))?;
    Ok(config)
}

/// Load configuration from a JSON file
fn load_json_config(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig =
        serde_json::from_str(&content).map_err(|e| config_error(path, e))?;
    config.validate().map_err(|e| config_error(path, e))?;
    Ok(config)
}

/// Match a relative path against an exclusion pattern.
///
/// Supported forms:
/// - `**/dir/**` matches `dir` as any directory component
/// - `prefix/**/suffix`, where the suffix may hold one `*`
/// - a single `*` wildcard such as `*.test.ts`
/// - anything else is a literal prefix, so `vendor/` matches `vendor/a.go`
///   but not `src/vendor/a.go`
pub fn glob_match(pattern: &str, path: &str) -> bool {
    if let Some(dir) = pattern
        .strip_prefix("**/")
        .and_then(|rest| rest.strip_suffix("/**"))
    {
        return path.starts_with(&format!("{dir}/")) || path.contains(&format!("/{dir}/"));
    }

    if let Some((prefix, suffix)) = pattern.split_once("**") {
        let prefix = prefix.trim_end_matches('/');
        let suffix = suffix.trim_start_matches('/');
        if !prefix.is_empty() && !path.starts_with(prefix) {
            return false;
        }
        return match suffix.split_once('*') {
            None => path.ends_with(suffix),
            Some(("", after)) => path.ends_with(after),
            Some((before, after)) => path.contains(before) && path.ends_with(after),
        };
    }

    if let Some((before, after)) = pattern.split_once('*') {
        if !after.contains('*') {
            return path.len() >= before.len() + after.len()
                && path.starts_with(before)
                && path.ends_with(after);
        }
    }

    path.starts_with(pattern)
}

#[cfg(test)]
mod tests;
