//! Single tree-sitter walk shared by every language
//!
//! One recursive pass per file emits definitions, type declarations, raw
//! references and unreachable blocks into a [`FileFragment`]. Language
//! differences are looked up in `lang_rules`.

use super::lang_rules::{self as rules, Exposure};
use super::{FileFragment, Language, Reference, ReferenceKind, TypeDecl, TypeImpl};
use crate::models::{Definition, DefinitionKind, UnreachableBlock, Visibility};
use rustc_hash::FxHashSet;
use tree_sitter::Node;

pub(super) fn extract(root: &Node, source: &[u8], fragment: &mut FileFragment) {
    let mut extractor = Extractor {
        source,
        lang: fragment.language,
        fragment,
        consumed: FxHashSet::default(),
        seen: FxHashSet::default(),
    };
    extractor.walk(*root, &Ctx::default());
    extractor.finish();
}

/// Enclosing type while walking a class, trait or impl body
#[derive(Debug, Clone)]
struct Owner {
    name: String,
    is_interface: bool,
    trait_impl: bool,
    exported: bool,
}

#[derive(Debug, Clone, Default)]
struct Ctx {
    /// Qualified name references are attributed to. `None` is the file.
    scope: Option<String>,
    owner: Option<Owner>,
    in_function: bool,
    /// Go receiver variable, treated like `self`
    self_alias: Option<String>,
}

impl Ctx {
    fn is_module_scope(&self) -> bool {
        !self.in_function && self.owner.is_none()
    }
}

type RefKey = (Option<String>, ReferenceKind, String, Option<String>);

struct Extractor<'a> {
    source: &'a [u8],
    lang: Language,
    fragment: &'a mut FileFragment,
    /// Identifier nodes already accounted for (definition names, callees)
    consumed: FxHashSet<usize>,
    seen: FxHashSet<RefKey>,
}

fn line_of(point: tree_sitter::Point) -> u32 {
    point.row as u32 + 1
}

impl<'a> Extractor<'a> {
    fn text(&self, node: &Node) -> Option<&'a str> {
        node.utf8_text(self.source).ok()
    }

    fn walk(&mut self, node: Node<'_>, ctx: &Ctx) {
        let kind = node.kind();
        if rules::is_comment(kind) {
            return;
        }

        if rules::is_function_kind(self.lang, kind) && self.visit_function(node, ctx) {
            return;
        }
        if rules::is_type_kind(self.lang, kind) && self.visit_type(node, ctx) {
            return;
        }
        if ctx.is_module_scope() && self.visit_variable(node, ctx) {
            return;
        }
        if kind == "impl_item" && self.lang == Language::Rust {
            self.visit_impl(node, ctx);
            return;
        }
        if self.record_import(node) {
            return;
        }

        if rules::is_call_kind(kind) {
            self.record_call(node, ctx);
        } else if rules::is_value_identifier(kind) {
            self.record_identifier(node, ctx, ReferenceKind::Read);
        } else if rules::is_type_identifier(kind) {
            self.record_identifier(node, ctx, ReferenceKind::TypeUse);
        }

        if ctx.in_function && rules::is_block_kind(kind) {
            self.scan_unreachable(node);
        }

        self.walk_children(node, ctx);
    }

    fn walk_children(&mut self, node: Node<'_>, ctx: &Ctx) {
        let children: Vec<Node> = node.children(&mut node.walk()).collect();
        for child in children {
            self.walk(child, ctx);
        }
    }

    fn definition(
        &self,
        name: &str,
        kind: DefinitionKind,
        node: &Node,
        exposure: Exposure,
    ) -> Definition {
        Definition::new(
            name,
            kind,
            self.fragment.path.clone(),
            line_of(node.start_position()),
            line_of(node.end_position()),
        )
        .with_visibility(exposure.visibility)
        .with_exported(exposure.exported)
        .with_test_file(self.fragment.is_test_file)
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn visit_function(&mut self, node: Node<'_>, ctx: &Ctx) -> bool {
        let Some((name_node, scope_receiver)) = self.function_name(node) else {
            return false;
        };
        let Some(name) = self.text(&name_node) else {
            return false;
        };
        self.consumed.insert(name_node.id());
        self.emit_function(name, node, node, scope_receiver, ctx);
        true
    }

    /// Record a function definition and walk its body in its own scope.
    ///
    /// `decl` carries modifiers and attributes, `node` spans the code.
    fn emit_function(
        &mut self,
        name: &str,
        node: Node<'_>,
        decl: Node<'_>,
        scope_receiver: Option<String>,
        ctx: &Ctx,
    ) {
        let receiver = scope_receiver
            .or_else(|| self.go_receiver(node).map(|(ty, _)| ty))
            .or_else(|| ctx.owner.as_ref().map(|o| o.name.clone()));
        let in_trait_impl = ctx.owner.as_ref().is_some_and(|o| o.trait_impl);

        let exposure = match &ctx.owner {
            Some(owner) if owner.is_interface => Exposure {
                visibility: Visibility::Public,
                exported: owner.exported,
            },
            _ => rules::exposure(self.lang, &decl, name, self.source, in_trait_impl),
        };

        let overrides = in_trait_impl || rules::has_override_marker(self.lang, &decl, self.source);
        let mut def = self
            .definition(name, DefinitionKind::Function, &node, exposure)
            .with_overrides(overrides)
            .with_ffi(rules::is_ffi(self.lang, &decl, self.source));
        if let Some(receiver) = receiver {
            def = def.with_receiver(receiver);
        }
        if let Some(sig) = rules::signature_line(&decl, self.source) {
            def = def.with_signature(sig);
        }

        let inner = Ctx {
            scope: Some(def.qualified_name.clone()),
            owner: None,
            in_function: true,
            self_alias: self.go_receiver(node).and_then(|(_, var)| var),
        };
        self.fragment.definitions.push(def);
        self.walk_children(node, &inner);
    }

    /// Name node of a function, plus the scope of a C++ out-of-line
    /// definition such as `void Dog::speak()`.
    fn function_name<'t>(&self, node: Node<'t>) -> Option<(Node<'t>, Option<String>)> {
        if !matches!(self.lang, Language::C | Language::Cpp) {
            return node.child_by_field_name("name").map(|n| (n, None));
        }

        let mut decl = node.child_by_field_name("declarator")?;
        while decl.kind() != "function_declarator" {
            decl = inner_declarator(decl)?;
        }
        let mut name = decl.child_by_field_name("declarator")?;
        let mut scope = None;
        while name.kind() == "qualified_identifier" {
            if let Some(s) = name.child_by_field_name("scope").and_then(|s| self.text(&s)) {
                scope = Some(rules::normalize_type_name(s));
            }
            name = name.child_by_field_name("name")?;
        }
        Some((name, scope))
    }

    /// Go method receiver: `(d *Dog)` gives `("Dog", Some("d"))`
    fn go_receiver(&self, node: Node<'_>) -> Option<(String, Option<String>)> {
        if self.lang != Language::Go || node.kind() != "method_declaration" {
            return None;
        }
        let params = node.child_by_field_name("receiver")?;
        let param = params
            .named_children(&mut params.walk())
            .find(|c| c.kind() == "parameter_declaration")?;
        let ty = param.child_by_field_name("type").and_then(|t| self.text(&t))?;
        let var = param
            .child_by_field_name("name")
            .and_then(|n| self.text(&n))
            .map(str::to_string);
        Some((rules::normalize_type_name(ty), var))
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn visit_type(&mut self, node: Node<'_>, ctx: &Ctx) -> bool {
        // C++ forward declarations and elaborated type uses have no body
        if self.lang == Language::Cpp && node.child_by_field_name("body").is_none() {
            return false;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return false;
        };
        let Some(name) = self.text(&name_node) else {
            return false;
        };
        self.consumed.insert(name_node.id());

        let shape = self.type_shape(node);
        let exposure = rules::exposure(self.lang, &node, name, self.source, false);
        let mut def = self
            .definition(name, DefinitionKind::Class, &node, exposure)
            .with_ffi(rules::is_ffi(self.lang, &node, self.source));
        if let Some(sig) = rules::signature_line(&node, self.source) {
            def = def.with_signature(sig);
        }

        let inner = Ctx {
            scope: Some(def.qualified_name.clone()),
            owner: Some(Owner {
                name: name.to_string(),
                is_interface: shape.is_interface,
                trait_impl: false,
                exported: exposure.exported,
            }),
            in_function: ctx.in_function,
            self_alias: None,
        };

        self.fragment.types.push(TypeDecl {
            name: name.to_string(),
            bases: shape.bases,
            is_interface: shape.is_interface,
            interface_methods: shape.methods,
            line: line_of(node.start_position()),
        });
        self.fragment.definitions.push(def);
        self.walk_children(node, &inner);
        true
    }

    fn type_shape(&self, node: Node<'_>) -> TypeShape {
        let mut shape = TypeShape::default();
        match self.lang {
            Language::Go => self.go_type_shape(node, &mut shape),
            Language::Python => self.python_type_shape(node, &mut shape),
            Language::Rust => {
                if node.kind() == "trait_item" {
                    shape.is_interface = true;
                    if let Some(bounds) = node.child_by_field_name("bounds").and_then(|b| self.text(&b)) {
                        shape.bases = rules::split_type_list(&bounds.replace('+', ","));
                    }
                    self.body_method_names(node, &mut shape.methods, |_| true);
                }
            }
            Language::JavaScript | Language::TypeScript | Language::Tsx => {
                for child in node.children(&mut node.walk()) {
                    if matches!(child.kind(), "class_heritage" | "extends_type_clause") {
                        if let Some(text) = self.text(&child) {
                            shape.bases.extend(rules::split_type_list(text));
                        }
                    }
                }
                shape.is_interface = node.kind() == "interface_declaration";
                let interface = shape.is_interface;
                self.body_method_names(node, &mut shape.methods, |m| {
                    interface || m.kind() == "abstract_method_signature"
                });
            }
            Language::Java | Language::CSharp => {
                for field in ["superclass", "interfaces"] {
                    if let Some(text) = node.child_by_field_name(field).and_then(|n| self.text(&n)) {
                        shape.bases.extend(rules::split_type_list(text));
                    }
                }
                for child in node.children(&mut node.walk()) {
                    if matches!(child.kind(), "extends_interfaces" | "base_list") {
                        if let Some(text) = self.text(&child) {
                            shape.bases.extend(rules::split_type_list(text));
                        }
                    }
                }
                shape.is_interface = node.kind() == "interface_declaration";
                let interface = shape.is_interface;
                let source = self.source;
                self.body_method_names(node, &mut shape.methods, |m| {
                    interface || rules::header_text(m, source).contains("abstract ")
                });
            }
            Language::Cpp => {
                for child in node.children(&mut node.walk()) {
                    if child.kind() == "base_class_clause" {
                        if let Some(text) = self.text(&child) {
                            shape.bases.extend(rules::split_type_list(text));
                        }
                    }
                }
                let source = self.source;
                self.body_method_names(node, &mut shape.methods, |m| {
                    rules::header_text(m, source).contains("virtual")
                });
                shape.is_interface = false;
            }
            Language::C => {}
        }
        shape.bases.dedup();
        shape
    }

    fn go_type_shape(&self, node: Node<'_>, shape: &mut TypeShape) {
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        match ty.kind() {
            "interface_type" => {
                shape.is_interface = true;
                for child in ty.named_children(&mut ty.walk()) {
                    match child.kind() {
                        "method_elem" | "method_spec" => {
                            if let Some(name) = child.child_by_field_name("name").and_then(|n| self.text(&n)) {
                                shape.methods.push(name.to_string());
                            }
                        }
                        "type_elem" | "constraint_elem" | "type_identifier" | "qualified_type" => {
                            if let Some(text) = self.text(&child) {
                                shape.bases.push(rules::normalize_type_name(text));
                            }
                        }
                        _ => {}
                    }
                }
            }
            "struct_type" => {
                // embedded fields promote methods like a base class
                for list in ty.named_children(&mut ty.walk()) {
                    for field in list.named_children(&mut list.walk()) {
                        if field.kind() != "field_declaration" || field.child_by_field_name("name").is_some() {
                            continue;
                        }
                        if let Some(text) = field.child_by_field_name("type").and_then(|t| self.text(&t)) {
                            shape.bases.push(rules::normalize_type_name(text));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn python_type_shape(&self, node: Node<'_>, shape: &mut TypeShape) {
        if let Some(args) = node.child_by_field_name("superclasses") {
            for arg in args.named_children(&mut args.walk()) {
                match arg.kind() {
                    "keyword_argument" => {
                        if self.text(&arg).is_some_and(|t| t.contains("ABCMeta")) {
                            shape.is_interface = true;
                        }
                    }
                    "identifier" | "attribute" => {
                        if let Some(text) = self.text(&arg) {
                            shape.bases.push(rules::last_segment(text).to_string());
                        }
                    }
                    // Generic[T], Protocol[T]
                    "subscript" => {
                        if let Some(text) = arg.child_by_field_name("value").and_then(|v| self.text(&v)) {
                            shape.bases.push(rules::last_segment(text).to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        if shape.bases.iter().any(|b| b == "ABC" || b == "Protocol") {
            shape.is_interface = true;
        }
        if shape.is_interface {
            self.body_method_names(node, &mut shape.methods, |_| true);
        }
    }

    /// Names of function-like members directly inside a type body
    fn body_method_names<F>(&self, node: Node<'_>, out: &mut Vec<String>, keep: F)
    where
        F: Fn(&Node) -> bool,
    {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        for member in body.named_children(&mut body.walk()) {
            // Python decorators wrap the definition
            let member = if member.kind() == "decorated_definition" {
                match member.child_by_field_name("definition") {
                    Some(def) => def,
                    None => continue,
                }
            } else {
                member
            };

            let is_method = rules::is_function_kind(self.lang, member.kind())
                || matches!(member.kind(), "method_signature" | "abstract_method_signature")
                || (self.lang == Language::Cpp
                    && member.kind() == "field_declaration"
                    && has_function_declarator(member));
            if !is_method || !keep(&member) {
                continue;
            }

            let name = if self.lang == Language::Cpp {
                self.function_name(member).map(|(n, _)| n).or_else(|| {
                    member
                        .child_by_field_name("declarator")
                        .filter(|d| d.kind() == "function_declarator")
                        .and_then(|d| d.child_by_field_name("declarator"))
                })
            } else {
                member.child_by_field_name("name")
            };
            if let Some(name) = name.and_then(|n| self.text(&n)) {
                out.push(name.to_string());
            }
        }
    }

    /// `impl Type` and `impl Trait for Type`
    fn visit_impl(&mut self, node: Node<'_>, ctx: &Ctx) {
        let Some(type_name) = node
            .child_by_field_name("type")
            .and_then(|t| self.text(&t))
            .map(rules::normalize_type_name)
        else {
            self.walk_children(node, ctx);
            return;
        };
        let trait_name = node
            .child_by_field_name("trait")
            .and_then(|t| self.text(&t))
            .map(rules::normalize_type_name);

        if let Some(interface) = &trait_name {
            self.fragment.impls.push(TypeImpl {
                type_name: type_name.clone(),
                interface: interface.clone(),
            });
        }

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Ctx {
                scope: ctx.scope.clone(),
                owner: Some(Owner {
                    name: type_name,
                    is_interface: false,
                    trait_impl: trait_name.is_some(),
                    exported: false,
                }),
                in_function: ctx.in_function,
                self_alias: None,
            };
            self.walk(body, &inner);
        }
    }

    // ========================================================================
    // Module-scope variables
    // ========================================================================

    fn visit_variable(&mut self, node: Node<'_>, ctx: &Ctx) -> bool {
        match (self.lang, node.kind()) {
            (Language::Go, "var_spec" | "const_spec") => {
                let names: Vec<Node> = node
                    .children_by_field_name("name", &mut node.walk())
                    .collect();
                self.emit_variables(node, node, &names, ctx)
            }
            (Language::Rust, "const_item" | "static_item") => match node.child_by_field_name("name") {
                Some(name) => self.emit_variables(node, node, &[name], ctx),
                None => false,
            },
            (Language::Python, "assignment") => match node.child_by_field_name("left") {
                Some(left) if left.kind() == "identifier" => {
                    self.emit_variables(node, node, &[left], ctx)
                }
                _ => false,
            },
            (Language::JavaScript | Language::TypeScript | Language::Tsx, "variable_declarator") => {
                self.visit_js_declarator(node, ctx)
            }
            (Language::C | Language::Cpp, "declaration") => {
                if has_function_declarator(node) {
                    // prototypes declare nothing new and reference nothing
                    return true;
                }
                let names: Vec<Node> = node
                    .children_by_field_name("declarator", &mut node.walk())
                    .filter_map(declarator_identifier)
                    .collect();
                self.emit_variables(node, node, &names, ctx)
            }
            _ => false,
        }
    }

    fn visit_js_declarator(&mut self, node: Node<'_>, ctx: &Ctx) -> bool {
        let Some(name_node) = node.child_by_field_name("name") else {
            return false;
        };
        if name_node.kind() != "identifier" {
            return false;
        }
        let decl = node.parent().unwrap_or(node);

        let is_function = node.child_by_field_name("value").is_some_and(|v| {
            matches!(
                v.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            )
        });
        if !is_function {
            return self.emit_variables(node, decl, &[name_node], ctx);
        }

        let Some(name) = self.text(&name_node) else {
            return false;
        };
        self.consumed.insert(name_node.id());
        self.emit_function(name, node, decl, None, ctx);
        true
    }

    fn emit_variables(&mut self, node: Node<'_>, decl: Node<'_>, names: &[Node], ctx: &Ctx) -> bool {
        let mut scope = None;
        for name_node in names {
            let Some(name) = self.text(name_node) else {
                continue;
            };
            self.consumed.insert(name_node.id());
            let exposure = rules::exposure(self.lang, &decl, name, self.source, false);
            let mut def = self.definition(name, DefinitionKind::Variable, &node, exposure);
            if let Some(sig) = rules::signature_line(&decl, self.source) {
                def = def.with_signature(sig);
            }
            scope.get_or_insert_with(|| def.qualified_name.clone());
            self.fragment.definitions.push(def);
        }
        if scope.is_none() {
            return false;
        }

        let inner = Ctx {
            scope,
            ..ctx.clone()
        };
        self.walk_children(node, &inner);
        true
    }

    // ========================================================================
    // References
    // ========================================================================

    fn push_reference(
        &mut self,
        from: Option<String>,
        kind: ReferenceKind,
        name: String,
        receiver: Option<String>,
        line: u32,
    ) {
        if name.is_empty() {
            return;
        }
        let key = (from.clone(), kind, name.clone(), receiver.clone());
        if !self.seen.insert(key) {
            return;
        }
        self.fragment.references.push(Reference {
            from,
            kind,
            name,
            receiver,
            line,
        });
    }

    fn record_identifier(&mut self, node: Node<'_>, ctx: &Ctx, kind: ReferenceKind) {
        if self.consumed.contains(&node.id()) {
            return;
        }
        let Some(name) = self.text(&node) else {
            return;
        };
        if matches!(name, "self" | "cls" | "_") {
            return;
        }
        self.push_reference(
            ctx.scope.clone(),
            kind,
            name.to_string(),
            None,
            line_of(node.start_position()),
        );
    }

    fn record_call(&mut self, node: Node<'_>, ctx: &Ctx) {
        let Some(callee) = self.callee(node) else {
            return;
        };
        if let Some(name_node) = callee.name_node {
            self.consumed.insert(name_node.id());
        }

        if self.lang.is_js_family() && callee.receiver.is_none() && callee.name == "require" {
            if let Some(path) = self.first_string_argument(node) {
                self.push_import(&path, line_of(node.start_position()));
            }
            return;
        }

        let receiver = callee.receiver.map(|r| {
            if ctx.self_alias.as_deref() == Some(r.as_str()) {
                "self".to_string()
            } else {
                r
            }
        });
        self.push_reference(
            ctx.scope.clone(),
            ReferenceKind::Call,
            callee.name,
            receiver,
            line_of(node.start_position()),
        );
    }

    fn callee<'t>(&self, node: Node<'t>) -> Option<Callee<'t>> {
        match node.kind() {
            "method_invocation" => {
                let name_node = node.child_by_field_name("name")?;
                Some(Callee {
                    name: self.text(&name_node)?.to_string(),
                    name_node: Some(name_node),
                    receiver: node
                        .child_by_field_name("object")
                        .and_then(|o| self.text(&o))
                        .map(|t| t.trim().to_string()),
                })
            }
            "object_creation_expression" | "new_expression" => {
                let ty = node
                    .child_by_field_name("type")
                    .or_else(|| node.child_by_field_name("constructor"))?;
                if ty.kind() == "member_expression" {
                    return self.callee_from_expr(ty);
                }
                let keep_node = matches!(ty.kind(), "identifier" | "type_identifier");
                Some(Callee {
                    name: rules::normalize_type_name(self.text(&ty)?),
                    name_node: keep_node.then_some(ty),
                    receiver: None,
                })
            }
            _ => self.callee_from_expr(node.child_by_field_name("function")?),
        }
    }

    fn callee_from_expr<'t>(&self, func: Node<'t>) -> Option<Callee<'t>> {
        let (name_field, receiver_field) = match func.kind() {
            "identifier" | "field_identifier" | "property_identifier" => {
                return Some(Callee {
                    name: self.text(&func)?.to_string(),
                    name_node: Some(func),
                    receiver: None,
                });
            }
            "selector_expression" => ("field", "operand"),
            "member_expression" => ("property", "object"),
            "field_expression" => (
                "field",
                if func.child_by_field_name("value").is_some() {
                    "value"
                } else {
                    "argument"
                },
            ),
            "attribute" => ("attribute", "object"),
            "scoped_identifier" => ("name", "path"),
            "qualified_identifier" => ("name", "scope"),
            "member_access_expression" => ("name", "expression"),
            "generic_function" => {
                return self.callee_from_expr(func.child_by_field_name("function")?);
            }
            "template_function" => {
                return self.callee_from_expr(func.child_by_field_name("name")?);
            }
            _ => {
                let text = self.text(&func)?;
                return Some(Callee {
                    name: rules::normalize_type_name(text),
                    name_node: None,
                    receiver: None,
                });
            }
        };

        let name_node = func.child_by_field_name(name_field)?;
        let name = rules::normalize_type_name(self.text(&name_node)?);
        let receiver = func
            .child_by_field_name(receiver_field)
            .and_then(|r| self.text(&r))
            .map(|t| t.trim().to_string());
        Some(Callee {
            name,
            name_node: Some(name_node),
            receiver,
        })
    }

    fn first_string_argument(&self, call: Node<'_>) -> Option<String> {
        let args = call.child_by_field_name("arguments")?;
        let first = args.named_child(0)?;
        if first.kind() != "string" {
            return None;
        }
        self.text(&first).map(str::to_string)
    }

    fn push_import(&mut self, raw: &str, line: u32) {
        let path = raw
            .trim()
            .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '<' | '>'))
            .trim();
        if path.is_empty() {
            return;
        }
        self.push_reference(None, ReferenceKind::Import, path.to_string(), None, line);
    }

    /// Record an import statement. Returns false for nodes that are not one.
    fn record_import(&mut self, node: Node<'_>) -> bool {
        let line = line_of(node.start_position());
        let paths: Vec<String> = match (self.lang, node.kind()) {
            (Language::Go, "import_spec") => node
                .child_by_field_name("path")
                .and_then(|p| self.text(&p))
                .map(str::to_string)
                .into_iter()
                .collect(),
            (Language::Python, "import_statement") => node
                .children_by_field_name("name", &mut node.walk())
                .filter_map(|n| {
                    let module = if n.kind() == "aliased_import" {
                        n.child_by_field_name("name")?
                    } else {
                        n
                    };
                    self.text(&module).map(str::to_string)
                })
                .collect(),
            (Language::Python, "import_from_statement") => node
                .child_by_field_name("module_name")
                .and_then(|m| self.text(&m))
                .map(str::to_string)
                .into_iter()
                .collect(),
            (Language::Rust, "use_declaration") => node
                .child_by_field_name("argument")
                .and_then(|a| self.text(&a))
                .map(|t| {
                    let t = t.split("::{").next().unwrap_or(t);
                    t.split(" as ").next().unwrap_or(t).to_string()
                })
                .into_iter()
                .collect(),
            (Language::JavaScript | Language::TypeScript | Language::Tsx, "import_statement") => node
                .child_by_field_name("source")
                .and_then(|s| self.text(&s))
                .map(str::to_string)
                .into_iter()
                .collect(),
            (Language::Java, "import_declaration") => self
                .text(&node)
                .map(|t| {
                    let t = t.trim().trim_start_matches("import").trim_end_matches(';').trim();
                    let t = t.strip_prefix("static ").unwrap_or(t);
                    t.trim_end_matches(".*").trim().to_string()
                })
                .into_iter()
                .collect(),
            (Language::CSharp, "using_directive") => self
                .text(&node)
                .map(|t| {
                    let t = t.trim().trim_start_matches("using").trim_end_matches(';').trim();
                    let t = t.strip_prefix("static ").unwrap_or(t);
                    let t = t.rsplit('=').next().unwrap_or(t);
                    t.trim().to_string()
                })
                .into_iter()
                .collect(),
            (Language::C | Language::Cpp, "preproc_include") => node
                .child_by_field_name("path")
                .and_then(|p| self.text(&p))
                .map(str::to_string)
                .into_iter()
                .collect(),
            _ => return false,
        };

        for path in paths {
            self.push_import(&path, line);
        }
        true
    }

    // ========================================================================
    // Unreachable code
    // ========================================================================

    fn scan_unreachable(&mut self, block: Node<'_>) {
        let mut statements = Vec::new();
        collect_statements(block, &mut statements);

        let Some(pos) = statements
            .iter()
            .position(|s| rules::is_terminator(self.lang, s, self.source))
        else {
            return;
        };
        let terminator_line = line_of(statements[pos].start_position());

        let mut run: Option<(u32, u32)> = None;
        for stmt in &statements[pos + 1..] {
            // a label is a jump target, everything from it on can run
            if stmt.kind() == "labeled_statement" {
                break;
            }
            // JS function declarations are hoisted
            let hoisted = self.lang.is_js_family()
                && matches!(stmt.kind(), "function_declaration" | "generator_function_declaration");
            if hoisted {
                if let Some((start, end)) = run.take() {
                    self.push_unreachable(start, end, terminator_line);
                }
                continue;
            }
            let start = line_of(stmt.start_position());
            let end = line_of(stmt.end_position());
            run = Some(match run {
                Some((s, _)) => (s, end),
                None => (start, end),
            });
        }
        if let Some((start, end)) = run {
            self.push_unreachable(start, end, terminator_line);
        }
    }

    fn push_unreachable(&mut self, start_line: u32, end_line: u32, terminator_line: u32) {
        self.fragment.unreachable_blocks.push(UnreachableBlock {
            file: self.fragment.path.clone(),
            start_line,
            end_line,
            reason: format!("Code after terminating statement at line {}", terminator_line),
        });
    }

    /// Sort and merge overlapping or adjacent unreachable blocks
    fn finish(&mut self) {
        let blocks = &mut self.fragment.unreachable_blocks;
        blocks.sort_by_key(|b| (b.start_line, b.end_line));

        let mut merged: Vec<UnreachableBlock> = Vec::with_capacity(blocks.len());
        for block in blocks.drain(..) {
            match merged.last_mut() {
                Some(last) if last.end_line + 1 >= block.start_line => {
                    last.end_line = last.end_line.max(block.end_line);
                }
                _ => merged.push(block),
            }
        }
        *blocks = merged;
    }
}

struct Callee<'t> {
    name: String,
    name_node: Option<Node<'t>>,
    receiver: Option<String>,
}

#[derive(Debug, Default)]
struct TypeShape {
    bases: Vec<String>,
    is_interface: bool,
    methods: Vec<String>,
}

/// Statements directly inside a block. Go wraps them in a `statement_list`.
fn collect_statements<'t>(block: Node<'t>, out: &mut Vec<Node<'t>>) {
    for child in block.named_children(&mut block.walk()) {
        if rules::is_comment(child.kind()) {
            continue;
        }
        if child.kind() == "statement_list" {
            collect_statements(child, out);
        } else {
            out.push(child);
        }
    }
}

fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind().ends_with("declarator"));
    found
}

/// Whether a C/C++ declaration declares a function rather than a value
fn has_function_declarator(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let declarators: Vec<Node> = node
        .children_by_field_name("declarator", &mut cursor)
        .collect();
    declarators.into_iter().any(|mut d| loop {
        if d.kind() == "function_declarator" {
            break true;
        }
        match inner_declarator(d) {
            Some(inner) => d = inner,
            None => break false,
        }
    })
}

/// Identifier at the bottom of a C/C++ declarator chain
fn declarator_identifier(node: Node<'_>) -> Option<Node<'_>> {
    let mut d = node;
    loop {
        if d.kind() == "identifier" {
            return Some(d);
        }
        d = inner_declarator(d)?;
    }
}
