//! Source code parsers using tree-sitter
//!
//! Pass 1 of graph construction. Each file is parsed on its own into a
//! [`FileFragment`]: the definitions it declares, the types and interfaces it
//! introduces, and the raw (unresolved) references it makes. Nothing here
//! looks at other files; cross-file resolution happens in `graph::builder`.

mod extractor;
mod lang_rules;
pub mod parallel_pipeline;

use crate::models::{Definition, UnreachableBlock};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Languages the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Python,
    Rust,
    JavaScript,
    TypeScript,
    /// TypeScript with JSX
    Tsx,
    Java,
    CSharp,
    C,
    Cpp,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "go" => Some(Language::Go),
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "java" => Some(Language::Java),
            "cs" => Some(Language::CSharp),
            "c" | "h" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "c++" | "hpp" | "hh" | "hxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::Go => "Go",
            Language::Python => "Python",
            Language::Rust => "Rust",
            Language::JavaScript => "JavaScript",
            Language::TypeScript | Language::Tsx => "TypeScript",
            Language::Java => "Java",
            Language::CSharp => "C#",
            Language::C => "C",
            Language::Cpp => "C++",
        }
    }

    pub fn is_js_family(&self) -> bool {
        matches!(
            self,
            Language::JavaScript | Language::TypeScript | Language::Tsx
        )
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
            Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Get all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "go", // Go
        "py", "pyi", // Python
        "rs",  // Rust
        "js", "jsx", "mjs", "cjs", // JavaScript
        "ts", "mts", "cts", "tsx", // TypeScript
        "java", // Java
        "cs",   // C#
        "c", "h", // C
        "cpp", "cc", "cxx", "c++", "hpp", "hh", "hxx", // C++
    ]
}

/// What a raw reference is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// `name(...)` or `recv.name(...)`
    Call,
    /// Bare identifier read: may name a function, class or variable
    Read,
    /// Identifier in type position
    TypeUse,
    /// Module path of an import statement
    Import,
}

/// An unresolved reference made from inside a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Qualified name of the innermost enclosing definition.
    /// `None` for top-level code.
    pub from: Option<String>,
    pub kind: ReferenceKind,
    /// Last path segment for calls and reads, full module path for imports
    pub name: String,
    /// Receiver text for `recv.name(...)` calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    pub line: u32,
}

/// A class, struct, enum, interface or trait declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    /// Base classes and implemented interfaces, in declaration order
    pub bases: Vec<String>,
    pub is_interface: bool,
    /// Method names declared by an interface or trait
    pub interface_methods: Vec<String>,
    pub line: u32,
}

/// `impl Trait for Type` and similar out-of-line implementation declarations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeImpl {
    pub type_name: String,
    pub interface: String,
}

/// Everything pass 1 learned about one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFragment {
    /// Repository-relative path with forward slashes
    pub path: String,
    pub language: Language,
    pub line_count: u32,
    pub is_test_file: bool,
    pub definitions: Vec<Definition>,
    pub types: Vec<TypeDecl>,
    pub impls: Vec<TypeImpl>,
    pub references: Vec<Reference>,
    pub unreachable_blocks: Vec<UnreachableBlock>,
}

impl FileFragment {
    pub fn new(path: impl Into<String>, language: Language) -> Self {
        let path = path.into();
        Self {
            is_test_file: is_test_file(&path),
            path,
            language,
            line_count: 0,
            definitions: Vec::new(),
            types: Vec::new(),
            impls: Vec::new(),
            references: Vec::new(),
            unreachable_blocks: Vec::new(),
        }
    }
}

/// Parse a file from disk, using its own path as the display path
pub fn parse_file(path: &Path) -> Result<FileFragment> {
    let display = path.to_string_lossy().replace('\\', "/");
    parse_file_as(path, &display)
}

/// Parse a file from disk and record it under `display_path`
pub fn parse_file_as(path: &Path, display_path: &str) -> Result<FileFragment> {
    let language = Language::from_path(path)
        .with_context(|| format!("Unsupported file type: {}", path.display()))?;
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_source(&source, display_path, language)
}

/// Parse source code directly (useful for testing)
pub fn parse_source(source: &str, path: &str, language: Language) -> Result<FileFragment> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language.grammar())
        .with_context(|| format!("Failed to set {} language", language))?;

    let tree = parser
        .parse(source, None)
        .with_context(|| format!("Failed to parse {} source", language))?;

    let mut fragment = FileFragment::new(path, language);
    fragment.line_count = source.lines().count() as u32;
    extractor::extract(&tree.root_node(), source.as_bytes(), &mut fragment);
    Ok(fragment)
}

/// Test-only files by naming convention
pub fn is_test_file(path: &str) -> bool {
    let path = path.replace('\\', "/");
    let file_name = path.rsplit('/').next().unwrap_or(&path);

    if file_name.ends_with("_test.go") || file_name.ends_with("_test.py") {
        return true;
    }
    if file_name.starts_with("test_") && file_name.ends_with(".py") {
        return true;
    }
    if file_name.contains(".test.") || file_name.contains(".spec.") {
        return true;
    }

    let with_root = format!("/{}", path);
    with_root.contains("/test/") || with_root.contains("/tests/") || with_root.contains("/__tests__/")
}
