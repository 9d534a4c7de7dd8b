use super::*;
use crate::graph::{build, BuildOptions, DependencyGraph, EdgeKind, GraphEdge, GraphNode, NodeKind};
use crate::parsers::{parse_source, Language};

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn build_from(sources: &[(&str, &str, Language)]) -> CodeGraph {
    let fragments = sources
        .iter()
        .map(|(path, src, lang)| parse_source(src, path, *lang).expect("parse"))
        .collect();
    build(fragments, &BuildOptions::default())
}

/// Code graph from bare definitions plus `qualified name -> qualified name`
/// call edges inside `lib.go`
fn graph_of(defs: Vec<Definition>, calls: &[(&str, &str)]) -> CodeGraph {
    let mut graph = DependencyGraph::new();
    let mut definitions = BTreeMap::new();
    for def in defs {
        let id = NodeId::new(&def.file, &def.qualified_name);
        let kind = match def.kind {
            DefinitionKind::Function => NodeKind::Function,
            DefinitionKind::Class => NodeKind::Class,
            DefinitionKind::Variable => NodeKind::Variable,
        };
        graph.add_node(GraphNode::new(id.clone(), &def.name, kind, &def.file));
        definitions.insert(id, def);
    }
    for (from, to) in calls {
        graph.add_edge(GraphEdge::new(
            NodeId::new("lib.go", from),
            NodeId::new("lib.go", to),
            EdgeKind::DirectCall,
        ));
    }
    CodeGraph {
        graph,
        definitions,
        ..Default::default()
    }
}

fn func(name: &str) -> Definition {
    Definition::new(name, DefinitionKind::Function, "lib.go", 1, 3)
}

fn find<'a>(analysis: &'a DeadCodeAnalysis, name: &str) -> Option<&'a DeadCodeItem> {
    analysis.items().into_iter().find(|i| i.name == name)
}

const SCENARIO_B: &str = "package main

func main() {
\thelper()
}

func helper() {}

func unused() {}

func Exported() {}
";

#[test]
fn test_program_and_test_conventions() {
    assert!(is_program_entry("main"));
    assert!(is_program_entry("init"));
    assert!(is_program_entry("Main"));
    assert!(!is_program_entry("mainly"));

    assert!(is_test_convention("TestParse"));
    assert!(is_test_convention("test_parse"));
    assert!(is_test_convention("BenchmarkBuild"));
    assert!(is_test_convention("ExampleRun"));
    assert!(is_test_convention("FuzzDecode"));
    assert!(!is_test_convention("test"));
    assert!(!is_test_convention("Fuzz"));
}

#[test]
fn test_handler_conventions() {
    assert!(is_http_handler("userHandler"));
    assert!(is_http_handler("OrderController"));
    assert!(is_http_handler("GetUser"));
    assert!(is_http_handler("ServeHTTP"));
    assert!(!is_http_handler("Get"));
    assert!(!is_http_handler("getUser"));

    assert!(is_event_handler("onClick"));
    assert!(is_event_handler("OnSave"));
    assert!(is_event_handler("handleSubmit"));
    assert!(is_event_handler("changeListener"));
    assert!(is_event_handler("DataObserver"));
    assert!(!is_event_handler("on"));
    assert!(!is_event_handler("handle"));
}

#[test]
fn test_lifecycle_methods() {
    for name in ["__init__", "setUpClass", "componentDidMount", "useEffect", "Dispose", "Close"] {
        assert!(is_lifecycle_method(name), "{name}");
    }
    assert!(!is_lifecycle_method("close_all"));
}

#[test]
fn test_exported_is_entry_only_when_configured() {
    let def = func("Render").with_exported(true);
    assert!(!is_entry_point(&def, false));
    assert!(is_entry_point(&def, true));
    assert!(is_entry_point(&func("compute").with_ffi(true), false));
}

#[test]
fn test_static_confidence() {
    let private = func("a").with_visibility(Visibility::Private);
    let public = func("a").with_visibility(Visibility::Public);
    let exported = func("a").with_visibility(Visibility::Public).with_exported(true);
    let everything = func("a")
        .with_exported(true)
        .with_test_file(true)
        .with_ffi(true);

    assert!(approx_eq(DeadCodeAnalyzer::static_confidence(&private), 0.95));
    assert!(approx_eq(DeadCodeAnalyzer::static_confidence(&public), 0.9));
    assert!(approx_eq(DeadCodeAnalyzer::static_confidence(&exported), 0.6));
    assert!(approx_eq(DeadCodeAnalyzer::static_confidence(&everything), 0.2));
}

#[test]
fn test_unused_function_is_dead() {
    let code = build_from(&[("main.go", SCENARIO_B, Language::Go)]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);

    assert!(find(&analysis, "main").is_none());
    assert!(find(&analysis, "helper").is_none());

    let unused = find(&analysis, "unused").expect("unused reported");
    assert!(approx_eq(unused.confidence, 0.95));
    assert_eq!(unused.confidence_level, ConfidenceLevel::High);
    assert_eq!(unused.reason, "Not reachable from any entry point");
    assert_eq!(unused.node_id.as_str(), "main.go::unused");
    assert_eq!(unused.line, 9);

    let exported = find(&analysis, "Exported").expect("exported reported");
    assert!(exported.confidence < unused.confidence);
    assert_eq!(exported.confidence_level, ConfidenceLevel::Medium);
}

#[test]
fn test_test_file_lowers_confidence_by_fixed_amount() {
    let src = "package util\n\nfunc stale() {}\n";
    let code = build_from(&[
        ("util.go", src, Language::Go),
        ("util_test.go", src, Language::Go),
    ]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    let items = analysis.items();
    let prod = items.iter().find(|i| i.file == "util.go").expect("prod");
    let test = items.iter().find(|i| i.file == "util_test.go").expect("test");
    assert!(approx_eq(prod.confidence - test.confidence, 0.15));
}

#[test]
fn test_coverage_caps_and_raises_confidence() {
    let code = build_from(&[("main.go", SCENARIO_B, Language::Go)]);
    let mut coverage = CoverageData::new();
    coverage.record("main.go", 9, 4);

    let analysis = DeadCodeAnalyzer::new()
        .with_coverage(coverage)
        .analyze(&code);

    let unused = find(&analysis, "unused").expect("unused");
    assert!(approx_eq(unused.confidence, 0.75));
    assert!(unused.confidence_reason.contains("executed under test coverage"));

    let exported = find(&analysis, "Exported").expect("exported");
    assert!(approx_eq(exported.confidence, 0.65));
    assert!(exported.confidence <= unused.confidence);
}

#[test]
fn test_min_confidence_filters_findings() {
    let code = graph_of(
        vec![
            func("low").with_exported(true).with_ffi(false).with_test_file(true),
            func("high").with_visibility(Visibility::Private),
        ],
        &[],
    );
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    assert!(find(&analysis, "low").is_none());
    assert!(find(&analysis, "high").is_some());
    // filtered findings still count as unreachable
    assert_eq!(analysis.summary.unreachable_definitions, 2);

    let lenient = DeadCodeAnalyzer::with_config(DeadCodeConfig {
        min_confidence: 0.0,
        ..Default::default()
    })
    .analyze(&code);
    let low = find(&lenient, "low").expect("low kept");
    assert_eq!(low.confidence_level, ConfidenceLevel::Low);
}

#[test]
fn test_entry_points_are_never_reported() {
    let code = graph_of(
        vec![
            func("main"),
            func("TestSomething"),
            func("onClick"),
            func("Dispose"),
            func("orphan"),
        ],
        &[],
    );
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    let names: Vec<&str> = analysis.items().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["orphan"]);
    assert_eq!(analysis.summary.entry_points, 4);
}

#[test]
fn test_kind_specific_reasons_and_sorting() {
    let code = graph_of(
        vec![
            Definition::new("Widget", DefinitionKind::Class, "b.go", 5, 9),
            Definition::new("limit", DefinitionKind::Variable, "a.go", 2, 2),
            Definition::new("zeta", DefinitionKind::Function, "a.go", 10, 12),
            Definition::new("alpha", DefinitionKind::Function, "a.go", 10, 12),
        ],
        &[],
    );
    let analysis = DeadCodeAnalyzer::new().analyze(&code);

    assert_eq!(analysis.dead_classes[0].reason, "Class never instantiated or referenced");
    assert_eq!(analysis.dead_variables[0].reason, "Variable never accessed");
    let fns: Vec<&str> = analysis
        .dead_functions
        .iter()
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(fns, vec!["alpha", "zeta"]);

    let order: Vec<&str> = analysis.items().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(order, vec!["limit", "alpha", "zeta", "Widget"]);
    assert_eq!(analysis.summary.dead_by_file.get("a.go"), Some(&3));
    assert_eq!(
        analysis.summary.dead_by_kind.get(&DefinitionKind::Function),
        Some(&2)
    );
}

#[test]
fn test_dispatch_keeps_implementations_alive() {
    let src = r#"package main

type Speaker interface {
	Speak() string
}

type Dog struct{}

func (d Dog) Speak() string { return "woof" }

type Cat struct{}

func (c Cat) Speak() string { return "meow" }

func talk(s Speaker) {
	s.Speak()
}

func main() {
	talk(nil)
}
"#;
    let code = build_from(&[("main.go", src, Language::Go)]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    assert!(find(&analysis, "Speak").is_none());
    assert!(find(&analysis, "talk").is_none());
    assert!(find(&analysis, "Dog").is_none());
    assert!(find(&analysis, "Cat").is_none());
}

#[test]
fn test_external_trait_impl_is_entry() {
    let src = r#"use std::fmt;

struct Meters(f64);

impl fmt::Display for Meters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}m", self.0)
    }
}

fn unused_helper() {}
"#;
    let code = build_from(&[("src/units.rs", src, Language::Rust)]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    assert!(find(&analysis, "fmt").is_none());
    assert!(find(&analysis, "Meters").is_none());
    assert!(find(&analysis, "unused_helper").is_some());
}

#[test]
fn test_summary_counts() {
    let code = graph_of(
        vec![func("main"), func("helper"), func("unused")],
        &[("main", "helper")],
    );
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    let summary = &analysis.summary;
    assert_eq!(summary.total_dead_functions, 1);
    assert_eq!(summary.reachable_definitions, 2);
    assert_eq!(summary.unreachable_definitions, 1);
    assert!((summary.dead_code_percentage - 100.0 / 3.0).abs() < 1e-6);
    assert_eq!(summary.total_nodes_in_graph, 3);
    assert_eq!(summary.total_edges_in_graph, 1);
    assert_eq!(analysis.call_graph.entry_points.len(), 1);
}

#[test]
fn test_empty_project() {
    let analysis = DeadCodeAnalyzer::new().analyze(&CodeGraph::default());
    assert_eq!(analysis.total_items(), 0);
    assert!(analysis.unreachable_code.is_empty());
    assert_eq!(analysis.summary.entry_points, 0);
    assert_eq!(analysis.summary.dead_code_percentage, 0.0);
}

#[test]
fn test_unreachable_blocks_are_reported() {
    let src = "def f():\n    return 1\n    print('never')\n    x = 2\n";
    let code = build_from(&[("m.py", src, Language::Python)]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    assert_eq!(analysis.unreachable_code.len(), 1);
    let block = &analysis.unreachable_code[0];
    assert_eq!((block.start_line, block.end_line), (3, 4));
    assert_eq!(analysis.summary.total_unreachable_lines, 2);
}

#[test]
fn test_self_call_stays_within_declaring_file() {
    let a = "class Config:\n    def _load(self):\n        pass\n";
    let b = r#"class Config:
    def run(self):
        self._load()

    def _load(self):
        pass

def main():
    Config().run()
"#;
    let code = build_from(&[("a.py", a, Language::Python), ("b.py", b, Language::Python)]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    let dead: Vec<&str> = analysis
        .dead_functions
        .iter()
        .map(|d| d.node_id.as_str())
        .collect();

    assert!(!dead.contains(&"b.py::Config._load"), "{:?}", dead);
    assert!(!dead.contains(&"b.py::Config.run"), "{:?}", dead);
    // nothing reaches the other file's copy
    assert!(dead.contains(&"a.py::Config._load"), "{:?}", dead);
}

#[test]
fn test_untyped_receiver_reaches_non_interface_methods() {
    let src = r#"from abc import ABC, abstractmethod

class Store(ABC):
    @abstractmethod
    def _save(self):
        pass

class Db(Store):
    def _save(self):
        pass

class Cache:
    def _save(self):
        pass

def main():
    c = Cache()
    c._save()
"#;
    let code = build_from(&[("m.py", src, Language::Python)]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    let dead: Vec<&str> = analysis
        .dead_functions
        .iter()
        .map(|d| d.node_id.as_str())
        .collect();

    assert!(!dead.contains(&"m.py::Cache._save"), "{:?}", dead);
    assert!(!dead.contains(&"m.py::Db._save"), "{:?}", dead);
}
