//! Core data models shared by the extractor, graph builder and detectors
//!
//! A [`Definition`] is everything pass 1 knows about a declared symbol.
//! Detectors never look at parse trees, only at these records and the graph.

use serde::{Deserialize, Serialize};

/// Generate a stable fingerprint for a definition.
///
/// The hash identifies the same logical finding across repeated runs, so it
/// must not depend on hasher seeds or compiler versions. The result is the
/// first 16 hex characters of the MD5 digest of `name:file:line:kind`.
pub fn context_hash(name: &str, file: &str, line: u32, kind: DefinitionKind) -> String {
    let input = format!("{name}:{file}:{line}:{}", kind.as_str());
    let digest = md5::compute(input.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Severity levels for smells
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Declared visibility of a symbol. How it is derived depends on the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Internal,
    #[default]
    Unknown,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a definition. Methods are functions with a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Function,
    Class,
    Variable,
}

impl DefinitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionKind::Function => "function",
            DefinitionKind::Class => "class",
            DefinitionKind::Variable => "variable",
        }
    }
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared symbol collected during extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub name: String,
    /// `Type.method` for methods, the bare name otherwise
    pub qualified_name: String,
    pub kind: DefinitionKind,
    pub file: String,
    pub line: u32,
    pub end_line: u32,
    pub visibility: Visibility,
    pub exported: bool,
    /// Owning type for methods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    pub is_test_file: bool,
    pub is_ffi: bool,
    /// Method explicitly implements an inherited contract (trait impl,
    /// `@Override`, `override`)
    #[serde(default)]
    pub overrides: bool,
    pub context_hash: String,
    /// First line of the declaration, used by the repo map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Definition {
    pub fn new(
        name: impl Into<String>,
        kind: DefinitionKind,
        file: impl Into<String>,
        line: u32,
        end_line: u32,
    ) -> Self {
        let name = name.into();
        let file = file.into();
        let context_hash = context_hash(&name, &file, line, kind);
        Self {
            qualified_name: name.clone(),
            name,
            kind,
            file,
            line,
            end_line,
            visibility: Visibility::Unknown,
            exported: false,
            receiver: None,
            is_test_file: false,
            is_ffi: false,
            overrides: false,
            context_hash,
            signature: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    /// Attach an owning type. The qualified name becomes `Type.name`.
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        let receiver = receiver.into();
        self.qualified_name = format!("{}.{}", receiver, self.name);
        self.receiver = Some(receiver);
        self
    }

    pub fn with_test_file(mut self, is_test_file: bool) -> Self {
        self.is_test_file = is_test_file;
        self
    }

    pub fn with_ffi(mut self, is_ffi: bool) -> Self {
        self.is_ffi = is_ffi;
        self
    }

    pub fn with_overrides(mut self, overrides: bool) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Statements that follow an unconditional terminator in the same block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreachableBlock {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub reason: String,
}

impl UnreachableBlock {
    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}
