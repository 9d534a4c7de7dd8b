//! Plain-text rendering for the CLI commands

use crate::detectors::{CycleReport, DeadCodeAnalysis, SmellAnalysis};
use crate::graph::{DependencyGraph, GraphMetrics, GraphSummary, MetricsSummary};
use crate::pipeline::AnalysisReport;
use crate::repomap::RepoMap;

/// Components listed in the instability table
const MAX_COMPONENT_ROWS: usize = 10;

fn section(title: &str) {
    println!();
    println!("{}", title);
    println!("{}", "─".repeat(title.chars().count()));
}

pub(super) fn print_analysis(report: &AnalysisReport) {
    let stats = &report.stats;
    println!(
        "Analyzed {} of {} files ({} too large, {} failed)",
        stats.parsed_files, stats.total_files, stats.skipped_large, stats.skipped_errors
    );
    println!(
        "Graph: {} nodes, {} edges, avg degree {:.2}, {} components",
        report.graph.total_nodes,
        report.graph.total_edges,
        report.graph.avg_degree,
        report.graph.components
    );

    print_cycles(&report.cycles);
    print_smells(&report.smells);
    print_repo_map(&report.repo_map);
    print_dead_code(&report.dead_code);
    section("Graph metrics");
    print_metrics_summary(&report.metrics);
}

pub(super) fn print_cycles(report: &CycleReport) {
    section(&format!("Cycles ({} scope)", scope_name(report)));
    if report.cycles.is_empty() {
        println!("No cycles found.");
        return;
    }
    for (i, cycle) in report.cycles.iter().enumerate() {
        let path: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
        println!("{:>3}. {} -> {}", i + 1, path.join(" -> "), path[0]);
    }
    println!(
        "{} cycles, largest has {} members",
        report.total_cycles, report.largest_cycle
    );
}

fn scope_name(report: &CycleReport) -> String {
    format!("{:?}", report.scope).to_lowercase()
}

pub(super) fn print_smells(analysis: &SmellAnalysis) {
    section("Architectural smells");
    if analysis.smells.is_empty() {
        println!("No smells found.");
    }
    for smell in &analysis.smells {
        println!("[{}] {}: {}", smell.severity, smell.smell_type, smell.description);
        println!("      {}", smell.suggestion);
    }

    let summary = &analysis.summary;
    println!(
        "{} smells over {} components ({} hubs, {} god components, {} cycles), average instability {:.2}",
        summary.total_smells,
        summary.total_components,
        summary.hub_count,
        summary.god_count,
        summary.cycle_count,
        summary.average_instability
    );

    if !analysis.components.is_empty() {
        println!();
        println!("{:<50} {:>6} {:>7} {:>11}", "component", "fan-in", "fan-out", "instability");
        for c in analysis.components.iter().take(MAX_COMPONENT_ROWS) {
            println!(
                "{:<50} {:>6} {:>7} {:>11.2}",
                c.id.as_str(),
                c.fan_in,
                c.fan_out,
                c.instability
            );
        }
    }
}

pub(super) fn print_repo_map(map: &RepoMap) {
    section("Repository map");
    if map.symbols.is_empty() {
        println!("No symbols found.");
        return;
    }
    for (i, symbol) in map.symbols.iter().enumerate() {
        println!(
            "{:>3}. {:.4}  {}:{}  {}  (in {}, out {})",
            i + 1,
            symbol.page_rank,
            symbol.file,
            symbol.line,
            symbol.signature,
            symbol.in_degree,
            symbol.out_degree
        );
    }
    println!(
        "{} symbols in {} files, max rank {:.4}",
        map.summary.total_symbols, map.summary.total_files, map.summary.max_page_rank
    );
}

pub(super) fn print_dead_code(analysis: &DeadCodeAnalysis) {
    section("Dead code");
    let items = analysis.items();
    if items.is_empty() && analysis.unreachable_code.is_empty() {
        println!("No dead code found.");
    }
    for item in &items {
        println!(
            "{}:{}  {} {} ({:.2} {}): {}",
            item.file,
            item.line,
            item.kind,
            item.name,
            item.confidence,
            item.confidence_level,
            item.confidence_reason
        );
    }
    for block in &analysis.unreachable_code {
        println!(
            "{}:{}-{}  unreachable: {}",
            block.file, block.start_line, block.end_line, block.reason
        );
    }

    let summary = &analysis.summary;
    println!(
        "{} functions, {} classes, {} variables unreachable ({:.1}% of definitions); {} entry points",
        summary.total_dead_functions,
        summary.total_dead_classes,
        summary.total_dead_variables,
        summary.dead_code_percentage,
        summary.entry_points
    );
}

pub(super) fn print_metrics(metrics: &GraphMetrics, top: usize) {
    section(&format!("Graph metrics ({} scope)", format!("{:?}", metrics.scope).to_lowercase()));
    print_metrics_summary(&metrics.summary);

    let ranked = metrics.top_by_betweenness(top);
    if ranked.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<50} {:>11} {:>9} {:>8} {:>8} {:>6} {:>7} {:>9}",
        "node", "betweenness", "closeness", "harmonic", "pagerank", "fan-in", "fan-out", "community"
    );
    for node in ranked {
        println!(
            "{:<50} {:>11.2} {:>9.3} {:>8.3} {:>8.4} {:>6} {:>7} {:>9}",
            node.id.as_str(),
            node.betweenness,
            node.closeness,
            node.harmonic,
            node.page_rank,
            node.in_degree,
            node.out_degree,
            node.community
        );
    }
}

fn print_metrics_summary(summary: &MetricsSummary) {
    println!(
        "{} nodes, {} edges in {} components (largest {})",
        summary.total_nodes, summary.total_edges, summary.components, summary.largest_component
    );
    println!(
        "{} cyclic components covering {} nodes",
        summary.strongly_connected_components, summary.cycle_nodes
    );
    println!(
        "diameter {}, radius {}, clustering {:.3}, reciprocity {:.3}, assortativity {:.3}",
        summary.diameter,
        summary.radius,
        summary.clustering_coefficient,
        summary.reciprocity,
        summary.assortativity
    );
    println!(
        "{} communities, modularity {:.3}",
        summary.community_count, summary.modularity
    );
}

pub(super) fn print_graph(graph: &DependencyGraph, full: &GraphSummary) {
    section(&format!(
        "Graph: showing {} of {} nodes, {} of {} edges",
        graph.node_count(),
        full.total_nodes,
        graph.edge_count(),
        full.total_edges
    ));
    println!(
        "{} components, {} cyclic",
        full.components, full.strongly_connected_components
    );
    for node in graph.nodes() {
        println!("{:?}  {}", node.kind, node.id);
    }
    println!();
    for edge in graph.sorted_edges() {
        println!(
            "{} -[{} {:.2}]-> {}",
            edge.from,
            edge.kind.as_str(),
            edge.confidence,
            edge.to
        );
    }
}
