//! CLI command definitions and handlers

mod report;

use crate::config::{load_project_config, ProjectConfig};
use crate::coverage::CoverageData;
use crate::detectors::{CycleDetector, DeadCodeAnalyzer, SmellDetector};
use crate::graph::pagerank::prune;
use crate::graph::{graph_metrics, CodeGraph, GraphScope};
use crate::parsers::parallel_pipeline::PipelineStats;
use crate::pipeline;
use crate::repomap::RepoMap;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a confidence threshold in [0, 1]
fn parse_confidence(s: &str) -> Result<f64, String> {
    let v: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("confidence must be between 0 and 1, got {}", v))
    }
}

/// Code relationship graph analysis
///
/// Builds a dependency graph of a repository and reports cycles,
/// architectural smells, central symbols, graph metrics and dead code.
#[derive(Parser, Debug)]
#[command(name = "repotoire-graph")]
#[command(
    version,
    about = "Code relationship graph engine: cycles, coupling smells, PageRank repo maps and dead code",
    after_help = "\
Examples:
  repotoire-graph .                              Run every analysis on the current directory
  repotoire-graph . smells --scope symbol        Smells between functions instead of files
  repotoire-graph . repomap --top 20             Twenty most central symbols
  repotoire-graph . metrics --scope symbol       Centralities and communities of functions
  repotoire-graph . dead-code --coverage cov.json
  repotoire-graph . --format json analyze        JSON output for scripting"
)]
pub struct Cli {
    /// Path to repository (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace), overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of extraction workers (1-64, default: one per core)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every analysis (default)
    Analyze {
        /// Line coverage JSON used to adjust dead code confidence
        #[arg(long)]
        coverage: Option<PathBuf>,
    },

    /// Detect hub, god, unstable and cyclic dependency smells
    Smells {
        /// Graph scope: file, symbol or all (default from config)
        #[arg(long)]
        scope: Option<GraphScope>,
    },

    /// List dependency cycles
    Cycles {
        /// Graph scope: file, symbol or all (default from config)
        #[arg(long)]
        scope: Option<GraphScope>,
    },

    /// Rank symbols by PageRank
    Repomap {
        /// Number of symbols to show (default from config)
        #[arg(long)]
        top: Option<usize>,
    },

    /// Find unreachable functions, classes and variables
    #[command(name = "dead-code")]
    DeadCode {
        /// Hide findings below this confidence
        #[arg(long, value_parser = parse_confidence)]
        min_confidence: Option<f64>,

        /// Line coverage JSON: {"files": {"<path>": {"<line>": <count>}}}
        #[arg(long)]
        coverage: Option<PathBuf>,

        /// Treat exported symbols as entry points
        #[arg(long)]
        include_exported: bool,
    },

    /// Centralities, communities and connectivity of the dependency graph
    Metrics {
        /// Graph scope: file, symbol or all (default from config)
        #[arg(long)]
        scope: Option<GraphScope>,

        /// Nodes listed, highest betweenness first
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Print the dependency graph, pruned to the highest ranked nodes
    Graph {
        /// Graph scope: file, symbol or all
        #[arg(long, default_value = "file")]
        scope: GraphScope,

        /// Keep at most this many nodes
        #[arg(long, default_value = "200")]
        max_nodes: usize,

        /// Keep at most this many edges
        #[arg(long, default_value = "1000")]
        max_edges: usize,
    },
}

/// Load repository config and apply the global CLI overrides
fn load_config(cli: &Cli) -> ProjectConfig {
    let mut config = load_project_config(&cli.path);
    if let Some(workers) = cli.workers {
        config.graph.workers = Some(workers);
    }
    config
}

fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

/// Build the graph with a progress bar on stderr
fn build_with_progress(repo: &Path, config: &ProjectConfig) -> Result<(CodeGraph, PipelineStats)> {
    let bar = ProgressBar::new(0);
    bar.set_style(create_bar_style());
    bar.set_message("Extracting symbols...");

    let progress = |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };
    let result = pipeline::build_code_graph(repo, config, Some(&progress), None);
    bar.finish_and_clear();
    result
}

fn load_coverage(path: Option<&Path>) -> Result<Option<CoverageData>> {
    path.map(|p| {
        CoverageData::from_json_file(p)
            .with_context(|| format!("Failed to load coverage from {}", p.display()))
    })
    .transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli);
    let json = cli.format == "json";
    let default_command = Commands::Analyze { coverage: None };
    let command = cli.command.as_ref().unwrap_or(&default_command);
    debug!("Running {:?} on {}", command, cli.path.display());

    match command {
        Commands::Analyze { coverage } => {
            let coverage = load_coverage(coverage.as_deref())?;
            let (code, stats) = build_with_progress(&cli.path, &config)?;
            let analysis = pipeline::run_all(&code, &config, coverage, stats)?;
            if json {
                print_json(&analysis)
            } else {
                report::print_analysis(&analysis);
                Ok(())
            }
        }

        Commands::Smells { scope } => {
            let scope = scope.unwrap_or(config.smells.scope);
            let (code, _) = build_with_progress(&cli.path, &config)?;
            let analysis =
                SmellDetector::with_config(config.smells.thresholds.clone(), scope).analyze(&code.graph);
            if json {
                print_json(&analysis)
            } else {
                report::print_smells(&analysis);
                Ok(())
            }
        }

        Commands::Cycles { scope } => {
            let scope = scope.unwrap_or(config.smells.scope);
            let (code, _) = build_with_progress(&cli.path, &config)?;
            let cycles = CycleDetector::with_scope(scope).report(&code.graph);
            if json {
                print_json(&cycles)
            } else {
                report::print_cycles(&cycles);
                Ok(())
            }
        }

        Commands::Repomap { top } => {
            let (code, _) = build_with_progress(&cli.path, &config)?;
            let mut map = RepoMap::from_graph(&code.graph, &config.rank)?;
            map.truncate(top.unwrap_or(config.rank.top_n));
            if json {
                print_json(&map)
            } else {
                report::print_repo_map(&map);
                Ok(())
            }
        }

        Commands::DeadCode {
            min_confidence,
            coverage,
            include_exported,
        } => {
            if let Some(min) = min_confidence {
                config.dead_code.min_confidence = *min;
            }
            if *include_exported {
                config.dead_code.exported_entry_points = true;
            }
            let coverage = load_coverage(coverage.as_deref())?;
            let (code, _) = build_with_progress(&cli.path, &config)?;

            let mut analyzer = DeadCodeAnalyzer::with_config(config.dead_code.clone());
            if let Some(coverage) = coverage {
                analyzer = analyzer.with_coverage(coverage);
            }
            let analysis = analyzer.analyze(&code);
            if json {
                print_json(&analysis)
            } else {
                report::print_dead_code(&analysis);
                Ok(())
            }
        }

        Commands::Metrics { scope, top } => {
            if let Some(scope) = scope {
                config.metrics.scope = *scope;
            }
            let (code, _) = build_with_progress(&cli.path, &config)?;
            let metrics = graph_metrics(&code.graph, &config.rank, &config.metrics)?;
            if json {
                print_json(&metrics)
            } else {
                report::print_metrics(&metrics, *top);
                Ok(())
            }
        }

        Commands::Graph {
            scope,
            max_nodes,
            max_edges,
        } => {
            let (code, _) = build_with_progress(&cli.path, &config)?;
            let scoped = code.graph.scoped(*scope);
            let pruned = prune(&scoped, *max_nodes, *max_edges, &config.rank)?;
            if json {
                print_json(&pruned)
            } else {
                report::print_graph(&pruned, &scoped.summary());
                Ok(())
            }
        }
    }
}
