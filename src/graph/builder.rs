//! Graph construction (pass 2)
//!
//! Runs after every file has been extracted. Fragments are merged in path
//! order, the VTable is filled, and only then are raw references resolved into
//! edges against the project-wide symbol index.

use super::model::{DependencyGraph, EdgeKind, GraphEdge, GraphNode, NodeId, NodeKind};
use super::vtable::VTable;
use super::{CodeGraph, FileInfo};
use crate::models::{Definition, DefinitionKind};
use crate::parsers::{FileFragment, Language, Reference, ReferenceKind};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Default confidence for interface-dispatched call edges
pub const DEFAULT_DISPATCH_CONFIDENCE: f64 = 0.7;

/// Receivers that always mean the caller's own type
const SELF_RECEIVERS: &[&str] = &["self", "this", "Self", "cls"];

/// Extensions stripped from import paths before matching
const IMPORT_EXTENSIONS: &[&str] = &[
    ".go", ".py", ".pyi", ".rs", ".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".java", ".cs",
    ".c", ".h", ".cpp", ".cc", ".cxx", ".hpp", ".hh", ".hxx",
];

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub dispatch_confidence: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            dispatch_confidence: DEFAULT_DISPATCH_CONFIDENCE,
        }
    }
}

/// Confidence for one of `k` equally plausible targets
pub fn ambiguity_confidence(k: usize) -> f64 {
    if k <= 1 {
        1.0
    } else {
        (1.0 / k as f64).clamp(0.1, 0.9)
    }
}

fn node_kind(kind: DefinitionKind) -> NodeKind {
    match kind {
        DefinitionKind::Function => NodeKind::Function,
        DefinitionKind::Class => NodeKind::Class,
        DefinitionKind::Variable => NodeKind::Variable,
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Pre-indexed definitions for O(1) name lookups
#[derive(Debug, Default)]
struct SymbolIndex {
    by_name: FxHashMap<String, Vec<NodeId>>,
    by_file_and_name: FxHashMap<(String, String), Vec<NodeId>>,
    /// type name -> (method name, id) for every file defining the method
    methods_by_type: BTreeMap<String, Vec<(String, NodeId)>>,
}

impl SymbolIndex {
    fn insert(&mut self, id: &NodeId, def: &Definition) {
        self.by_name
            .entry(def.name.clone())
            .or_default()
            .push(id.clone());
        self.by_file_and_name
            .entry((def.file.clone(), def.name.clone()))
            .or_default()
            .push(id.clone());

        if let (DefinitionKind::Function, Some(receiver)) = (def.kind, &def.receiver) {
            self.methods_by_type
                .entry(receiver.clone())
                .or_default()
                .push((def.name.clone(), id.clone()));
        }
    }

    /// Definitions named `name` accepted by `keep`. Same-file matches shadow
    /// the rest of the project.
    fn candidates<F>(
        &self,
        file: &str,
        name: &str,
        definitions: &BTreeMap<NodeId, Definition>,
        keep: F,
    ) -> Vec<NodeId>
    where
        F: Fn(&Definition) -> bool,
    {
        let filter = |ids: Option<&Vec<NodeId>>| -> Vec<NodeId> {
            let mut out: Vec<NodeId> = ids
                .into_iter()
                .flatten()
                .filter(|id| definitions.get(*id).is_some_and(&keep))
                .cloned()
                .collect();
            out.sort();
            out.dedup();
            out
        };

        let local = filter(
            self.by_file_and_name
                .get(&(file.to_string(), name.to_string())),
        );
        if !local.is_empty() {
            return local;
        }
        filter(self.by_name.get(name))
    }
}

/// Import path matcher over the project's file layout
#[derive(Debug, Default)]
struct ImportIndex {
    /// last segment -> (file id, segments) for file stems and directories
    by_last_segment: FxHashMap<String, Vec<(NodeId, Vec<String>)>>,
    /// full stem or directory path -> file ids
    by_path: FxHashMap<String, Vec<NodeId>>,
}

impl ImportIndex {
    fn insert(&mut self, path: &str) {
        let id = NodeId::file(path);
        let stem = strip_extension(path);
        let stem_segments: Vec<String> = stem.split('/').map(str::to_string).collect();
        let dir_segments: Vec<String> = stem_segments[..stem_segments.len() - 1].to_vec();

        for segments in [stem_segments, dir_segments] {
            let Some(last) = segments.last() else {
                continue;
            };
            self.by_path
                .entry(segments.join("/"))
                .or_default()
                .push(id.clone());
            self.by_last_segment
                .entry(last.clone())
                .or_default()
                .push((id.clone(), segments));
        }
    }

    /// Files an import refers to. Relative imports are resolved against the
    /// importing file first. Otherwise the import matches a file whose stem
    /// or directory ends with the import's segments (or the reverse, for
    /// fully-qualified module paths).
    fn resolve(&self, importer: &str, raw: &str) -> Vec<NodeId> {
        let raw = raw.trim();
        if raw.starts_with("./") || raw.starts_with("../") {
            if let Some(ids) = self.resolve_relative(importer, raw) {
                return ids;
            }
        }

        let mut segments = import_segments(raw);
        while !segments.is_empty() {
            let found = self.match_suffix(&segments);
            if !found.is_empty() {
                return found;
            }
            // `use crate::a::Item` names an item inside module `a`
            segments.pop();
        }
        Vec::new()
    }

    fn resolve_relative(&self, importer: &str, raw: &str) -> Option<Vec<NodeId>> {
        let mut base: Vec<&str> = importer.split('/').collect();
        base.pop();
        for part in strip_extension(raw).split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    base.pop()?;
                }
                other => base.push(other),
            }
        }
        let mut ids = self.by_path.get(&base.join("/"))?.clone();
        ids.sort();
        ids.dedup();
        Some(ids)
    }

    fn match_suffix(&self, segments: &[String]) -> Vec<NodeId> {
        let Some(last) = segments.last() else {
            return Vec::new();
        };
        let mut found: BTreeSet<NodeId> = BTreeSet::new();
        for (id, file_segments) in self.by_last_segment.get(last).into_iter().flatten() {
            if file_segments.ends_with(segments) || segments.ends_with(file_segments) {
                found.insert(id.clone());
            }
        }
        found.into_iter().collect()
    }
}

fn strip_extension(path: &str) -> &str {
    IMPORT_EXTENSIONS
        .iter()
        .find_map(|ext| path.strip_suffix(ext))
        .unwrap_or(path)
}

/// Normalise an import to path segments
fn import_segments(raw: &str) -> Vec<String> {
    let mut s = raw.trim_matches(|c| matches!(c, '"' | '\'' | '<' | '>' | ' '));
    loop {
        let before = s;
        s = s
            .trim_start_matches("./")
            .trim_start_matches("../")
            .trim_start_matches('.');
        if s == before {
            break;
        }
    }
    let s = strip_extension(s);

    s.split(['/', '.', ':'].as_ref())
        .filter(|seg| !seg.is_empty())
        .filter(|seg| !matches!(*seg, "crate" | "self" | "super" | "*" | "@"))
        .map(str::to_string)
        .collect()
}

/// Pass 2: merge fragments into a resolved graph
pub fn build(mut fragments: Vec<FileFragment>, options: &BuildOptions) -> CodeGraph {
    fragments.sort_by(|a, b| a.path.cmp(&b.path));

    let mut graph = DependencyGraph::new();
    let mut definitions: BTreeMap<NodeId, Definition> = BTreeMap::new();
    let mut index = SymbolIndex::default();
    let mut imports = ImportIndex::default();
    let mut files = Vec::with_capacity(fragments.len());
    let mut unreachable_blocks = Vec::new();

    // Nodes
    for fragment in &fragments {
        let file_id = NodeId::file(&fragment.path);
        graph.add_node(
            GraphNode::new(file_id, file_name(&fragment.path), NodeKind::File, &fragment.path)
                .with_qualified_name(&fragment.path)
                .with_lines(1, fragment.line_count.max(1)),
        );
        imports.insert(&fragment.path);
        files.push(FileInfo {
            path: fragment.path.clone(),
            language: fragment.language,
            line_count: fragment.line_count,
        });
        unreachable_blocks.extend(fragment.unreachable_blocks.iter().cloned());

        for def in &fragment.definitions {
            let id = NodeId::new(&fragment.path, &def.qualified_name);
            if definitions.contains_key(&id) {
                continue;
            }
            graph.add_node(
                GraphNode::new(id.clone(), &def.name, node_kind(def.kind), &def.file)
                    .with_qualified_name(&def.qualified_name)
                    .with_lines(def.line, def.end_line)
                    .with_signature(def.signature.clone()),
            );
            index.insert(&id, def);
            definitions.insert(id, def.clone());
        }
    }

    let vtable = build_vtable(&fragments, &index);
    debug!(
        "VTable: {} types, {} interfaces",
        vtable.type_count(),
        vtable.interface_count()
    );

    let resolver = Resolver {
        definitions: &definitions,
        index: &index,
        imports: &imports,
        vtable: &vtable,
        dispatch_confidence: options.dispatch_confidence,
    };

    // Edges
    for fragment in &fragments {
        for ty in &fragment.types {
            let from = NodeId::new(&fragment.path, &ty.name);
            if !definitions.contains_key(&from) {
                continue;
            }
            for base in &ty.bases {
                resolver.link_type(&mut graph, &from, &fragment.path, base);
            }
        }
        for imp in &fragment.impls {
            let types = resolver.classes(&fragment.path, &imp.type_name);
            for from in &types {
                resolver.link_type(&mut graph, from, &fragment.path, &imp.interface);
            }
        }
        for reference in &fragment.references {
            resolver.link_reference(&mut graph, fragment, reference);
        }
    }

    unreachable_blocks.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then_with(|| a.start_line.cmp(&b.start_line))
    });

    debug!(
        "Built graph: {} nodes, {} edges from {} files",
        graph.node_count(),
        graph.edge_count(),
        files.len()
    );

    CodeGraph {
        graph,
        definitions,
        vtable,
        unreachable_blocks,
        files,
    }
}

/// Dedicated VTable pass, before any call edge is resolved
fn build_vtable(fragments: &[FileFragment], index: &SymbolIndex) -> VTable {
    let mut vtable = VTable::new();
    let mut go_interfaces: BTreeSet<String> = BTreeSet::new();

    for fragment in fragments {
        for ty in &fragment.types {
            let methods = index
                .methods_by_type
                .get(&ty.name)
                .cloned()
                .unwrap_or_default();
            vtable.register_type(&ty.name, ty.bases.first().map(String::as_str), methods);
            for base in ty.bases.iter().skip(1) {
                vtable.register_implementation(base, &ty.name);
            }
            if ty.is_interface || !ty.interface_methods.is_empty() {
                vtable.register_interface(&ty.name, ty.interface_methods.iter().cloned());
                if ty.is_interface && fragment.language == Language::Go {
                    go_interfaces.insert(ty.name.clone());
                }
            }
        }
        for imp in &fragment.impls {
            vtable.register_implementation(&imp.interface, &imp.type_name);
        }
    }

    // Types that only appear through their methods (Go methods in another
    // file, Rust inherent impls of foreign types)
    for (type_name, methods) in &index.methods_by_type {
        if !vtable.is_known_type(type_name) {
            vtable.register_type(type_name, None, methods.clone());
        }
    }

    let inferred = vtable.infer_structural_implementations(go_interfaces.iter().map(String::as_str));
    if inferred > 0 {
        debug!("Inferred {} structural interface implementations", inferred);
    }
    vtable
}

struct Resolver<'a> {
    definitions: &'a BTreeMap<NodeId, Definition>,
    index: &'a SymbolIndex,
    imports: &'a ImportIndex,
    vtable: &'a VTable,
    dispatch_confidence: f64,
}

impl Resolver<'_> {
    fn classes(&self, file: &str, name: &str) -> Vec<NodeId> {
        self.index.candidates(file, name, self.definitions, |d| {
            d.kind == DefinitionKind::Class
        })
    }

    fn link_type(&self, graph: &mut DependencyGraph, from: &NodeId, file: &str, base: &str) {
        let targets = self.classes(file, base);
        let confidence = ambiguity_confidence(targets.len());
        for to in targets {
            graph.add_edge(
                GraphEdge::new(from.clone(), to, EdgeKind::Inheritance).with_confidence(confidence),
            );
        }
    }

    fn link_reference(&self, graph: &mut DependencyGraph, fragment: &FileFragment, r: &Reference) {
        let from = match &r.from {
            Some(qn) => NodeId::new(&fragment.path, qn),
            None => NodeId::file(&fragment.path),
        };
        let file = fragment.path.as_str();

        let edges: Vec<(NodeId, EdgeKind, f64)> = match r.kind {
            ReferenceKind::Call => self.resolve_call(file, &from, r),
            ReferenceKind::Read => {
                let targets = self.index.candidates(file, &r.name, self.definitions, |_| true);
                let confidence = ambiguity_confidence(targets.len());
                targets
                    .into_iter()
                    .filter_map(|id| {
                        let kind = match self.definitions.get(&id)?.kind {
                            DefinitionKind::Function => EdgeKind::IndirectCall,
                            DefinitionKind::Class => EdgeKind::TypeReference,
                            DefinitionKind::Variable => EdgeKind::Reference,
                        };
                        Some((id, kind, confidence))
                    })
                    .collect()
            }
            ReferenceKind::TypeUse => with_kind(self.classes(file, &r.name), EdgeKind::TypeReference),
            ReferenceKind::Import => {
                with_kind(self.imports.resolve(file, &r.name), EdgeKind::Import)
            }
        };

        for (to, kind, confidence) in edges {
            graph.add_edge(GraphEdge::new(from.clone(), to, kind).with_confidence(confidence));
        }
    }

    fn resolve_call(&self, file: &str, from: &NodeId, r: &Reference) -> Vec<(NodeId, EdgeKind, f64)> {
        let caller_type = self
            .definitions
            .get(from)
            .and_then(|d| d.receiver.as_deref());
        let method = r.name.as_str();

        // a bare call inside a method may be an implicit `this.method()`
        let on_self = r
            .receiver
            .as_deref()
            .map_or(true, |recv| SELF_RECEIVERS.contains(&recv));
        if on_self {
            if let Some(ty) = caller_type {
                let own = self.type_methods(file, ty, method);
                if !own.is_empty() {
                    return own;
                }
            }
        }

        let Some(receiver) = r.receiver.as_deref() else {
            return self.by_name(file, method);
        };
        let receiver_type = receiver_segment(receiver);

        // a receiver typed as an interface only reaches its implementations
        if self.vtable.is_interface(receiver_type) {
            let dispatched = self.dispatch(receiver_type, method);
            if !dispatched.is_empty() {
                return dispatched;
            }
        }

        let typed = self.type_methods(file, receiver_type, method);
        if !typed.is_empty() {
            return typed;
        }

        // an untyped receiver may hold anything defining `method`
        merge_targets(self.dispatch(receiver_type, method), self.by_name(file, method))
    }

    /// `method` on types named `type_name`. The caller's own file wins;
    /// otherwise every file declaring the type gets an edge.
    fn type_methods(&self, file: &str, type_name: &str, method: &str) -> Vec<(NodeId, EdgeKind, f64)> {
        let local = NodeId::new(file, &format!("{}.{}", type_name, method));
        if self.definitions.contains_key(&local) {
            return vec![(local, EdgeKind::DirectCall, 1.0)];
        }
        let ids = self.vtable.methods_of(type_name, method);
        let confidence = ambiguity_confidence(ids.len());
        ids.into_iter()
            .map(|id| (id.clone(), EdgeKind::DirectCall, confidence))
            .collect()
    }

    /// Expand a call through every interface declaring `method`.
    ///
    /// When the receiver names an interface only that interface is used.
    fn dispatch(&self, receiver_type: &str, method: &str) -> Vec<(NodeId, EdgeKind, f64)> {
        let interfaces: Vec<&str> = if self.vtable.is_interface(receiver_type) {
            vec![receiver_type]
        } else {
            self.vtable.interfaces_declaring(method)
        };

        let mut targets: BTreeSet<NodeId> = BTreeSet::new();
        for iface in interfaces {
            targets.extend(self.vtable.resolve(iface, method));
            // the declaration itself (trait or interface method)
            targets.extend(self.vtable.methods_of(iface, method).into_iter().cloned());
        }
        targets
            .into_iter()
            .map(|id| (id, EdgeKind::DynamicDispatch, self.dispatch_confidence))
            .collect()
    }

    /// Plain name resolution with ambiguity-scaled confidence
    fn by_name(&self, file: &str, name: &str) -> Vec<(NodeId, EdgeKind, f64)> {
        let targets = self.index.candidates(file, name, self.definitions, |d| {
            matches!(d.kind, DefinitionKind::Function | DefinitionKind::Class)
        });
        let confidence = ambiguity_confidence(targets.len());
        targets
            .into_iter()
            .map(|id| {
                let is_method = self.definitions.get(&id).is_some_and(Definition::is_method);
                let kind = if is_method {
                    EdgeKind::DynamicDispatch
                } else {
                    EdgeKind::DirectCall
                };
                (id, kind, confidence)
            })
            .collect()
    }
}

/// Union of two target lists. A target in both keeps its higher confidence.
fn merge_targets(
    first: Vec<(NodeId, EdgeKind, f64)>,
    second: Vec<(NodeId, EdgeKind, f64)>,
) -> Vec<(NodeId, EdgeKind, f64)> {
    let mut merged: BTreeMap<NodeId, (EdgeKind, f64)> = BTreeMap::new();
    for (id, kind, confidence) in first.into_iter().chain(second) {
        match merged.get(&id) {
            Some((_, existing)) if *existing >= confidence => {}
            _ => {
                merged.insert(id, (kind, confidence));
            }
        }
    }
    merged
        .into_iter()
        .map(|(id, (kind, confidence))| (id, kind, confidence))
        .collect()
}

fn with_kind(targets: Vec<NodeId>, kind: EdgeKind) -> Vec<(NodeId, EdgeKind, f64)> {
    let confidence = ambiguity_confidence(targets.len());
    targets
        .into_iter()
        .map(|id| (id, kind, confidence))
        .collect()
}

/// Type-like tail of a receiver expression: `self.repo` gives `repo`,
/// `pkg::Dog` gives `Dog`, `Config()` gives `Config`
fn receiver_segment(receiver: &str) -> &str {
    let mut receiver = receiver.trim();
    if receiver.ends_with(')') {
        if let Some(open) = receiver.find('(') {
            receiver = receiver[..open].trim_end();
        }
    }
    let idx = ["::", ".", "->"]
        .iter()
        .filter_map(|sep| receiver.rfind(sep).map(|i| i + sep.len()))
        .max();
    match idx {
        Some(i) => &receiver[i..],
        None => receiver,
    }
}
