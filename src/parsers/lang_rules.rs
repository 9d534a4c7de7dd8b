//! Per-language syntax tables and rules
//!
//! The extractor walks every grammar with the same loop; what differs per
//! language (node kinds, visibility, FFI markers, terminators) lives here.

use super::Language;
use crate::models::Visibility;
use tree_sitter::Node;

/// Node kinds that declare a named function or method
pub(super) fn is_function_kind(lang: Language, kind: &str) -> bool {
    match lang {
        Language::Go => matches!(kind, "function_declaration" | "method_declaration"),
        Language::Python => kind == "function_definition",
        Language::Rust => matches!(kind, "function_item" | "function_signature_item"),
        Language::JavaScript | Language::TypeScript | Language::Tsx => matches!(
            kind,
            "function_declaration" | "generator_function_declaration" | "method_definition"
        ),
        Language::Java => matches!(kind, "method_declaration" | "constructor_declaration"),
        Language::CSharp => matches!(
            kind,
            "method_declaration" | "constructor_declaration" | "local_function_statement"
        ),
        Language::C | Language::Cpp => kind == "function_definition",
    }
}

/// Node kinds that declare a class-like type
pub(super) fn is_type_kind(lang: Language, kind: &str) -> bool {
    match lang {
        Language::Go => kind == "type_spec",
        Language::Python => kind == "class_definition",
        Language::Rust => matches!(kind, "struct_item" | "enum_item" | "trait_item" | "union_item"),
        Language::JavaScript => kind == "class_declaration",
        Language::TypeScript | Language::Tsx => matches!(
            kind,
            "class_declaration" | "abstract_class_declaration" | "interface_declaration"
        ),
        Language::Java => matches!(
            kind,
            "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration"
        ),
        Language::CSharp => matches!(
            kind,
            "class_declaration"
                | "interface_declaration"
                | "struct_declaration"
                | "record_declaration"
                | "enum_declaration"
        ),
        Language::C => false,
        Language::Cpp => matches!(kind, "class_specifier" | "struct_specifier"),
    }
}

/// Call-like expressions across all grammars
pub(super) fn is_call_kind(kind: &str) -> bool {
    matches!(
        kind,
        "call_expression"
            | "call"
            | "method_invocation"
            | "invocation_expression"
            | "object_creation_expression"
            | "new_expression"
    )
}

pub(super) fn is_comment(kind: &str) -> bool {
    matches!(kind, "comment" | "line_comment" | "block_comment")
}

/// Statement containers scanned for code after a terminator
pub(super) fn is_block_kind(kind: &str) -> bool {
    matches!(
        kind,
        "block" | "statement_block" | "compound_statement" | "constructor_body"
    )
}

/// Plain identifier nodes that read a value
pub(super) fn is_value_identifier(kind: &str) -> bool {
    kind == "identifier"
}

/// Identifier nodes in type position
pub(super) fn is_type_identifier(kind: &str) -> bool {
    kind == "type_identifier"
}

// ============================================================================
// Visibility
// ============================================================================

/// Declared visibility and whether the symbol is visible outside its module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Exposure {
    pub visibility: Visibility,
    pub exported: bool,
}

impl Exposure {
    const fn new(visibility: Visibility, exported: bool) -> Self {
        Self {
            visibility,
            exported,
        }
    }
}

/// Work out visibility for a definition node.
///
/// `decl` is the node that carries modifiers. For JS it is the outermost
/// declaration, whose parent may be an `export_statement`.
pub(super) fn exposure(
    lang: Language,
    decl: &Node,
    name: &str,
    source: &[u8],
    in_trait_impl: bool,
) -> Exposure {
    match lang {
        Language::Go => {
            if name.chars().next().is_some_and(char::is_uppercase) {
                Exposure::new(Visibility::Public, true)
            } else {
                Exposure::new(Visibility::Private, false)
            }
        }
        Language::Python => python_exposure(name),
        Language::Rust => {
            if has_child_kind(decl, "visibility_modifier") {
                Exposure::new(Visibility::Public, true)
            } else if in_trait_impl {
                Exposure::new(Visibility::Public, false)
            } else {
                Exposure::new(Visibility::Private, false)
            }
        }
        Language::JavaScript | Language::TypeScript | Language::Tsx => {
            js_exposure(decl, name, source)
        }
        Language::Java | Language::CSharp => {
            let modifiers = modifier_text(decl, source);
            if modifiers.iter().any(|m| m == "public" || m == "protected") {
                Exposure::new(Visibility::Public, true)
            } else if modifiers.iter().any(|m| m == "private") {
                Exposure::new(Visibility::Private, false)
            } else if modifiers.iter().any(|m| m == "internal") || lang == Language::Java {
                Exposure::new(Visibility::Internal, false)
            } else {
                Exposure::new(Visibility::Private, false)
            }
        }
        Language::C | Language::Cpp => {
            let is_static = decl
                .children(&mut decl.walk())
                .filter(|c| c.kind() == "storage_class_specifier")
                .any(|c| c.utf8_text(source).is_ok_and(|t| t == "static"));
            if is_static {
                Exposure::new(Visibility::Private, false)
            } else {
                Exposure::new(Visibility::Unknown, true)
            }
        }
    }
}

fn python_exposure(name: &str) -> Exposure {
    let dunder = name.starts_with("__") && name.ends_with("__") && name.len() > 4;
    if dunder {
        Exposure::new(Visibility::Public, false)
    } else if name.starts_with("__") {
        Exposure::new(Visibility::Private, false)
    } else if name.starts_with('_') {
        Exposure::new(Visibility::Internal, false)
    } else {
        Exposure::new(Visibility::Public, true)
    }
}

fn js_exposure(decl: &Node, name: &str, source: &[u8]) -> Exposure {
    if name.starts_with('#') {
        return Exposure::new(Visibility::Private, false);
    }

    let accessibility = decl
        .children(&mut decl.walk())
        .find(|c| c.kind() == "accessibility_modifier")
        .and_then(|c| c.utf8_text(source).ok());
    match accessibility {
        Some("private") => return Exposure::new(Visibility::Private, false),
        Some("protected") | Some("public") => return Exposure::new(Visibility::Public, true),
        _ => {}
    }

    if decl.kind() == "method_definition" {
        // unmarked class members are public
        return Exposure::new(Visibility::Unknown, true);
    }

    let exported = decl
        .parent()
        .is_some_and(|p| p.kind() == "export_statement");
    if exported {
        Exposure::new(Visibility::Public, true)
    } else {
        Exposure::new(Visibility::Private, false)
    }
}

/// Modifier keywords on a Java or C# declaration
fn modifier_text(decl: &Node, source: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    for child in decl.children(&mut decl.walk()) {
        match child.kind() {
            // Java groups them, C# lists them one by one
            "modifiers" => {
                for m in child.children(&mut child.walk()) {
                    if let Ok(text) = m.utf8_text(source) {
                        out.push(text.to_string());
                    }
                }
            }
            "modifier" => {
                if let Ok(text) = child.utf8_text(source) {
                    out.push(text.to_string());
                }
            }
            _ => {}
        }
    }
    out
}

/// Method explicitly marked as overriding an inherited member
pub(super) fn has_override_marker(lang: Language, decl: &Node, source: &[u8]) -> bool {
    match lang {
        Language::Java => modifier_text(decl, source)
            .iter()
            .any(|m| m == "@Override"),
        Language::CSharp => modifier_text(decl, source).iter().any(|m| m == "override"),
        Language::Cpp => header_text(decl, source).contains(" override"),
        Language::TypeScript | Language::Tsx => decl
            .children(&mut decl.walk())
            .any(|c| c.kind() == "override_modifier"),
        _ => false,
    }
}

fn has_child_kind(node: &Node, kind: &str) -> bool {
    node.children(&mut node.walk()).any(|c| c.kind() == kind)
}

// ============================================================================
// FFI markers
// ============================================================================

fn ffi_markers(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Go => &["//export", "//go:linkname"],
        Language::Rust => &["#[no_mangle]", "#[unsafe(no_mangle)]", "extern \"C\"", "#[export_name"],
        Language::C | Language::Cpp => &[
            "__declspec(dllexport)",
            "__attribute__((visibility",
            "extern \"C\"",
        ],
        Language::Python => &[
            "@pyfunction",
            "@pyclass",
            "@pymethods",
            "@ffi.def_extern",
            "CFUNCTYPE",
        ],
        _ => &[],
    }
}

/// How many bytes of leading attributes and comments to inspect
fn ffi_lookback(lang: Language) -> usize {
    match lang {
        Language::Python => 500,
        _ => 200,
    }
}

/// Whether a declaration is exported across a language boundary.
///
/// Checks the attributes, decorators and comments directly preceding the
/// declaration, the declaration header itself, and C++ `extern "C"` blocks.
pub(super) fn is_ffi(lang: Language, decl: &Node, source: &[u8]) -> bool {
    let markers = ffi_markers(lang);
    if markers.is_empty() {
        return false;
    }

    let header = header_text(decl, source);
    if markers.iter().any(|m| header.contains(m)) {
        return true;
    }

    let leading = leading_text(decl, source, ffi_lookback(lang));
    if markers.iter().any(|m| leading.contains(m)) {
        return true;
    }

    if matches!(lang, Language::C | Language::Cpp) {
        let mut parent = decl.parent();
        while let Some(p) = parent {
            if p.kind() == "linkage_specification" {
                return true;
            }
            parent = p.parent();
        }
    }
    false
}

/// Text of the attributes, decorators and comments attached to a node,
/// limited to `limit` bytes before it.
fn leading_text(node: &Node, source: &[u8], limit: usize) -> String {
    let end = node.start_byte();
    let mut start = end;
    let mut sibling = node.prev_sibling();
    while let Some(s) = sibling {
        let attached = matches!(
            s.kind(),
            "attribute_item" | "attribute" | "decorator" | "annotation" | "marker_annotation"
        ) || is_comment(s.kind());
        if !attached || end - s.start_byte() > limit {
            break;
        }
        start = s.start_byte();
        sibling = s.prev_sibling();
    }
    String::from_utf8_lossy(&source[start..end]).into_owned()
}

/// Declaration text up to its body, or its first line without a body
pub(super) fn header_text(node: &Node, source: &[u8]) -> String {
    let start = node.start_byte();
    let end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let text = String::from_utf8_lossy(&source[start..end]);
    text.into_owned()
}

// ============================================================================
// Terminators
// ============================================================================

/// Calls that never return, matched against the start of a statement
fn exit_markers(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Go => &["panic(", "os.Exit(", "log.Fatal", "log.Panic"],
        Language::Rust => &[
            "panic!",
            "unreachable!",
            "todo!",
            "unimplemented!",
            "std::process::exit",
            "process::exit",
        ],
        Language::Python => &["sys.exit(", "os._exit(", "exit(", "quit()"],
        Language::JavaScript | Language::TypeScript | Language::Tsx => &["process.exit("],
        Language::Java => &["System.exit("],
        Language::CSharp => &["Environment.Exit("],
        Language::C | Language::Cpp => &["exit(", "abort(", "_Exit(", "std::terminate", "std::exit("],
    }
}

/// Whether a statement unconditionally leaves the enclosing block
pub(super) fn is_terminator(lang: Language, stmt: &Node, source: &[u8]) -> bool {
    match stmt.kind() {
        "return_statement" | "return" | "throw_statement" | "raise_statement" => true,
        "return_expression" => true,
        "expression_statement" => {
            if lang == Language::Rust
                && stmt
                    .named_child(0)
                    .is_some_and(|c| c.kind() == "return_expression")
            {
                return true;
            }
            let text = stmt.utf8_text(source).unwrap_or("").trim_start();
            exit_markers(lang).iter().any(|m| text.starts_with(m))
        }
        _ => false,
    }
}

// ============================================================================
// Text helpers
// ============================================================================

/// Last path segment of a dotted, `::` or `->` separated name
pub(super) fn last_segment(text: &str) -> &str {
    let text = text.trim();
    let idx = ["::", ".", "->"]
        .iter()
        .filter_map(|sep| text.rfind(sep).map(|i| i + sep.len()))
        .max();
    match idx {
        Some(i) => &text[i..],
        None => text,
    }
}

/// Bare type name: drops references, pointers, generics and paths
pub(super) fn normalize_type_name(text: &str) -> String {
    let mut t = text.trim();
    t = t.trim_start_matches(&['&', '*'][..]).trim();
    if let Some(rest) = t.strip_prefix("mut ") {
        t = rest.trim();
    }
    if let Some(rest) = t.strip_prefix("dyn ") {
        t = rest.trim();
    }
    let t = match t.find(&['<', '[', '('][..]) {
        Some(i) => &t[..i],
        None => t,
    };
    last_segment(t).trim().to_string()
}

/// Split a base list like `extends A implements B<T>, C` into bare names
pub(super) fn split_type_list(text: &str) -> Vec<String> {
    const KEYWORDS: &[&str] = &[
        "extends",
        "implements",
        "public",
        "private",
        "protected",
        "virtual",
        "with",
    ];

    // Drop generic arguments first so their commas don't split names
    let mut flat = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => flat.push(ch),
            _ => {}
        }
    }

    flat.split(|c: char| c == ',' || c == '{' || c.is_whitespace())
        .map(|s| s.trim_matches(|c: char| c == ':' || c == ';'))
        .filter(|s| !s.is_empty() && !KEYWORDS.contains(s))
        .map(|s| last_segment(s).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// One-line declaration signature, capped at 200 characters
pub(super) fn signature_line(node: &Node, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let line = text.lines().next()?.trim();
    let line = line.strip_suffix('{').unwrap_or(line).trim_end();
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(200).collect())
}
