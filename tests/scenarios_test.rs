//! End-to-end properties of the graph analyses over extracted source

use repotoire_graph::detectors::{
    CycleDetector, DeadCodeAnalyzer, SmellDetector, SmellThresholds, SmellType,
};
use repotoire_graph::graph::pagerank::page_rank;
use repotoire_graph::graph::{
    build, BuildOptions, CallGraph, CodeGraph, GraphScope, NodeId, RankConfig,
};
use repotoire_graph::models::Severity;
use repotoire_graph::parsers::{parse_source, Language};
use repotoire_graph::repomap::RepoMap;
use std::collections::BTreeSet;

const EPSILON: f64 = 1e-6;

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

fn three_file_cycle() -> CodeGraph {
    build_from(&[
        ("a.py", "import b\n\ndef fa():\n    b.fb()\n", Language::Python),
        ("b.py", "import c\n\ndef fb():\n    c.fc()\n", Language::Python),
        ("c.py", "import a\n\ndef fc():\n    a.fa()\n", Language::Python),
    ])
}

#[test]
fn three_file_import_cycle_is_one_critical_smell() {
    let code = three_file_cycle();
    let analysis = SmellDetector::new().analyze(&code.graph);

    let cyclic: Vec<_> = analysis
        .smells
        .iter()
        .filter(|s| s.smell_type == SmellType::CyclicDependency)
        .collect();
    assert_eq!(cyclic.len(), 1);
    assert_eq!(cyclic[0].severity, Severity::Critical);
    assert_eq!(
        cyclic[0].components,
        vec![NodeId::from("a.py"), NodeId::from("b.py"), NodeId::from("c.py")]
    );
}

#[test]
fn every_cycle_has_mutually_reachable_members() {
    let code = three_file_cycle();
    let report = CycleDetector::with_scope(GraphScope::Symbol).report(&code.graph);
    for cycle in &report.cycles {
        assert!(cycle.len() >= 2);
    }

    let file_report = CycleDetector::new().report(&code.graph);
    assert_eq!(file_report.total_cycles, 1);
    assert_eq!(file_report.largest_cycle, 3);
}

#[test]
fn unused_function_confidence_depends_on_visibility() {
    let code = build_from(&[(
        "main.go",
        "package main\n\nfunc main() {\n\thelper()\n}\n\nfunc helper() {}\n\nfunc unused() {}\n\nfunc Unused() {}\n",
        Language::Go,
    )]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    let confidence = |name: &str| {
        analysis
            .dead_functions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.confidence)
    };

    assert!(confidence("main").is_none());
    assert!(confidence("helper").is_none());
    let private = confidence("unused").expect("private reported");
    let exported = confidence("Unused").expect("exported reported");
    assert!(approx_eq(private, 0.95));
    assert!(exported < private);
}

#[test]
fn interface_dispatch_resolves_every_implementation() {
    let code = build_from(&[(
        "animals.go",
        r#"package animals

type Speaker interface {
	Speak() string
}

type Dog struct{}

func (d Dog) Speak() string { return "woof" }

type Cat struct{}

func (c Cat) Speak() string { return "meow" }
"#,
        Language::Go,
    )]);

    let targets: BTreeSet<NodeId> = code.vtable.resolve("Speaker", "Speak").into_iter().collect();
    assert_eq!(targets.len(), 2);
    assert!(targets.contains(&NodeId::from("animals.go::Dog.Speak")));
    assert!(targets.contains(&NodeId::from("animals.go::Cat.Speak")));
    assert!(code.vtable.resolve("Speaker", "Run").is_empty());
    assert!(code.vtable.resolve("Walker", "Speak").is_empty());
}

#[test]
fn test_file_confidence_differs_by_fixed_delta() {
    let src = "def __orphan():\n    return 1\n";
    let code = build_from(&[
        ("pkg/orphans.py", src, Language::Python),
        ("pkg/test_orphans.py", src, Language::Python),
    ]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    let by_file = |file: &str| {
        analysis
            .dead_functions
            .iter()
            .find(|d| d.file == file)
            .map(|d| d.confidence)
            .expect("orphan reported")
    };
    assert!(approx_eq(by_file("pkg/orphans.py") - by_file("pkg/test_orphans.py"), 0.15));
}

#[test]
fn reachability_grows_with_entry_points() {
    let code = build_from(&[(
        "lib.py",
        "def a():\n    b()\n\ndef b():\n    c()\n\ndef c():\n    pass\n\ndef d():\n    pass\n",
        Language::Python,
    )]);
    let call_graph = CallGraph::from_code_graph(&code);
    let id = |qn: &str| call_graph.id_of(&NodeId::new("lib.py", qn)).expect("node");

    let small: BTreeSet<u32> = [id("b")].into_iter().collect();
    let large: BTreeSet<u32> = [id("b"), id("d")].into_iter().collect();
    let reach_small = call_graph.reachable_from(&small);
    let reach_large = call_graph.reachable_from(&large);

    assert!(reach_small.is_superset(&small));
    assert!(reach_large.is_superset(&reach_small));
    assert!(reach_small.contains(&id("c")));
    assert!(!reach_small.contains(&id("a")));
}

#[test]
fn page_rank_is_a_distribution() {
    let code = three_file_cycle();
    for scope in [GraphScope::File, GraphScope::Symbol, GraphScope::All] {
        let metrics = page_rank(&code.graph.scoped(scope), &RankConfig::default()).unwrap();
        let total: f64 = metrics.iter().map(|m| m.page_rank).sum();
        assert!(metrics.iter().all(|m| m.page_rank >= 0.0));
        assert!((total - 1.0).abs() < 1e-3, "{scope:?} sums to {total}");
    }
}

#[test]
fn confidences_stay_in_unit_interval() {
    let code = build_from(&[
        (
            "src/lib.rs",
            "pub fn api() {}\nfn hidden() {}\n#[no_mangle]\npub extern \"C\" fn ffi_entry() {}\npub struct Thing;\n",
            Language::Rust,
        ),
        ("web/app.js", "function lonely() {}\nexport function shared() {}\n", Language::JavaScript),
    ]);
    let analysis = DeadCodeAnalyzer::new().analyze(&code);
    for item in analysis.items() {
        assert!((0.0..=1.0).contains(&item.confidence), "{}", item.name);
    }
    for edge in code.graph.edges() {
        assert!((0.0..=1.0).contains(&edge.confidence));
    }
}

#[test]
fn pipeline_output_is_deterministic() {
    let sources = [
        ("a.py", "import b\n\nclass A:\n    def run(self):\n        self.step()\n    def step(self):\n        pass\n", Language::Python),
        ("b.py", "from a import A\n\ndef go():\n    A().run()\n", Language::Python),
        ("main.go", "package main\n\nfunc main() {\n\tgo1()\n}\n\nfunc go1() {}\n", Language::Go),
    ];
    let first = build_from(&sources);
    let second = build_from(&sources);

    assert_eq!(first.graph.sorted_edges(), second.graph.sorted_edges());
    let hashes = |code: &CodeGraph| -> Vec<(NodeId, String)> {
        code.definitions
            .iter()
            .map(|(id, d)| (id.clone(), d.context_hash.clone()))
            .collect()
    };
    assert_eq!(hashes(&first), hashes(&second));

    let dead_a = DeadCodeAnalyzer::new().analyze(&first);
    let dead_b = DeadCodeAnalyzer::new().analyze(&second);
    assert_eq!(dead_a.summary, dead_b.summary);

    let map_a = RepoMap::from_graph(&first.graph, &RankConfig::default()).unwrap();
    let map_b = RepoMap::from_graph(&second.graph, &RankConfig::default()).unwrap();
    assert_eq!(map_a, map_b);
}

#[test]
fn strict_thresholds_flag_hubs() {
    let code = build_from(&[
        ("core.py", "def util():\n    pass\n", Language::Python),
        ("x.py", "from core import util\n\ndef fx():\n    util()\n", Language::Python),
        ("y.py", "from core import util\n\ndef fy():\n    util()\n", Language::Python),
        ("z.py", "from core import util\n\ndef fz():\n    util()\n", Language::Python),
    ]);
    let thresholds = SmellThresholds {
        hub_degree: 2,
        hub_min_fan_in: 3,
        ..SmellThresholds::default()
    };
    let analysis = SmellDetector::with_config(thresholds, GraphScope::File).analyze(&code.graph);
    let hubs: Vec<_> = analysis
        .smells
        .iter()
        .filter(|s| s.smell_type == SmellType::HubLikeDependency)
        .collect();
    assert_eq!(hubs.len(), 1);
    assert_eq!(hubs[0].components, vec![NodeId::from("core.py")]);
}
