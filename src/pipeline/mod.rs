//! Analysis pipeline
//!
//! Orchestrates a full run:
//! 1. Walk source files
//! 2. Extract fragments in parallel
//! 3. Build the code graph
//! 4. Run cycles, smells, repo map, dead code and graph metrics over the frozen graph

use crate::config::{ExcludeConfig, ProjectConfig};
use crate::coverage::CoverageData;
use crate::detectors::{
    CycleDetector, CycleReport, DeadCodeAnalysis, DeadCodeAnalyzer, SmellAnalysis, SmellDetector,
};
use crate::graph::{self, graph_metrics, BuildOptions, CodeGraph, GraphSummary, MetricsSummary};
use crate::parsers::parallel_pipeline::{extract_parallel, PipelineOptions, PipelineStats, SourceFile};
use crate::parsers::supported_extensions;
use crate::repomap::RepoMap;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything one `analyze` run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub stats: PipelineStats,
    pub graph: GraphSummary,
    pub smells: SmellAnalysis,
    pub cycles: CycleReport,
    pub repo_map: RepoMap,
    pub dead_code: DeadCodeAnalysis,
    /// Graph-level metrics at `[metrics] scope`
    pub metrics: MetricsSummary,
}

/// Collect all source files in the repository, respecting .gitignore and
/// the `[exclude]` patterns. Sorted by relative path.
pub fn collect_source_files(repo_path: &Path, exclude: &ExcludeConfig) -> Result<Vec<SourceFile>> {
    if !repo_path.is_dir() {
        anyhow::bail!("{} is not a directory", repo_path.display());
    }

    let extensions = supported_extensions();
    let patterns = exclude.effective_patterns();
    let mut files = Vec::new();

    let mut builder = WalkBuilder::new(repo_path);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .add_custom_ignore_filename(".repotoireignore");

    for entry in builder.build().flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !extensions.contains(&ext) {
            continue;
        }

        let relative = path
            .strip_prefix(repo_path)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        if patterns.iter().any(|p| crate::config::glob_match(p, &relative)) {
            debug!("Excluded {}", relative);
            continue;
        }

        files.push(SourceFile {
            path: path.to_path_buf(),
            relative,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

fn pipeline_options(config: &ProjectConfig) -> PipelineOptions {
    let defaults = PipelineOptions::default();
    PipelineOptions {
        workers: config.graph.workers.unwrap_or(defaults.workers),
        buffer_size: config.graph.buffer_size,
        max_file_size: config.graph.max_file_size,
    }
}

/// Walk, extract and merge a repository into a [`CodeGraph`]
pub fn build_code_graph(
    repo_path: &Path,
    config: &ProjectConfig,
    progress: Option<&(dyn Fn(usize, usize) + Sync)>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<(CodeGraph, PipelineStats)> {
    let files = collect_source_files(repo_path, &config.exclude)
        .with_context(|| format!("Failed to walk {}", repo_path.display()))?;
    info!("Found {} source files", files.len());

    let extraction = extract_parallel(files, &pipeline_options(config), cancel, progress);
    if extraction.stats.cancelled {
        anyhow::bail!("Extraction cancelled");
    }

    let options = BuildOptions {
        dispatch_confidence: config.graph.dispatch_confidence,
    };
    let code = graph::build(extraction.fragments, &options);
    info!(
        "Built graph: {} nodes, {} edges",
        code.graph.node_count(),
        code.graph.edge_count()
    );
    Ok((code, extraction.stats))
}

/// Run every analysis over an already built graph.
///
/// The analyses only read the graph, so they run concurrently.
pub fn run_all(
    code: &CodeGraph,
    config: &ProjectConfig,
    coverage: Option<CoverageData>,
    stats: PipelineStats,
) -> Result<AnalysisReport> {
    let smell_detector =
        SmellDetector::with_config(config.smells.thresholds.clone(), config.smells.scope);
    let cycle_detector = CycleDetector::with_scope(config.smells.scope);
    let mut dead_code_analyzer = DeadCodeAnalyzer::with_config(config.dead_code.clone());
    if let Some(coverage) = coverage {
        dead_code_analyzer = dead_code_analyzer.with_coverage(coverage);
    }

    let (((smells, cycles), (repo_map, dead_code)), metrics) = rayon::join(
        || {
            rayon::join(
                || {
                    rayon::join(
                        || smell_detector.analyze(&code.graph),
                        || cycle_detector.report(&code.graph),
                    )
                },
                || {
                    rayon::join(
                        || RepoMap::from_graph(&code.graph, &config.rank),
                        || dead_code_analyzer.analyze(code),
                    )
                },
            )
        },
        || graph_metrics(&code.graph, &config.rank, &config.metrics),
    );

    let mut repo_map = repo_map.context("Failed to rank symbols")?;
    repo_map.truncate(config.rank.top_n);
    let metrics = metrics.context("Failed to compute graph metrics")?;

    Ok(AnalysisReport {
        stats,
        graph: code.graph.summary(),
        smells,
        cycles,
        repo_map,
        dead_code,
        metrics: metrics.summary,
    })
}

/// Build the graph for `repo_path` and run every analysis on it
pub fn analyze(
    repo_path: &Path,
    config: &ProjectConfig,
    coverage: Option<CoverageData>,
    progress: Option<&(dyn Fn(usize, usize) + Sync)>,
) -> Result<AnalysisReport> {
    let (code, stats) = build_code_graph(repo_path, config, progress, None)?;
    run_all(&code, config, coverage, stats)
}
