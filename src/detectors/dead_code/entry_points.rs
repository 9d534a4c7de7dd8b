//! Entry-point naming conventions
//!
//! Callers driven by runtimes, frameworks and test harnesses are invisible to
//! static analysis, so these rules apply whatever the declared visibility.

use crate::models::Definition;

/// Program entries and module initialisers
static PROGRAM_ENTRIES: &[&str] = &["main", "init", "Main"];

static HANDLER_SUFFIXES: &[&str] = &[
    "Handler",
    "handler",
    "Endpoint",
    "endpoint",
    "Controller",
    "controller",
];

/// REST-style verb prefixes
static HTTP_VERBS: &[&str] = &["Get", "Post", "Put", "Delete", "Patch", "Head", "Options"];

static SERVE_NAMES: &[&str] = &["ServeHTTP", "Handle", "serve"];

static CALLBACK_SUFFIXES: &[&str] = &[
    "Callback", "callback", "Listener", "listener", "Observer", "observer",
];

static LIFECYCLE_METHODS: &[&str] = &[
    // test fixtures
    "Setup",
    "SetUp",
    "setup",
    "Teardown",
    "TearDown",
    "teardown",
    // Python
    "__init__",
    "__del__",
    "__enter__",
    "__exit__",
    "setUp",
    "tearDown",
    "setUpClass",
    "tearDownClass",
    // React
    "componentDidMount",
    "componentWillUnmount",
    "componentDidUpdate",
    "useEffect",
    "useState",
    "useMemo",
    "useCallback",
    // general
    "Initialize",
    "initialize",
    "Finalize",
    "finalize",
    "Start",
    "Stop",
    "Open",
    "Close",
    "Connect",
    "Disconnect",
    "Dispose",
];

/// Prefix match that requires something after the prefix
fn has_prefix(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len() && name.starts_with(prefix)
}

pub fn is_program_entry(name: &str) -> bool {
    PROGRAM_ENTRIES.contains(&name)
}

/// `Test*`/`test*`, `Benchmark*`, `Example*`, `Fuzz*`
pub fn is_test_convention(name: &str) -> bool {
    has_prefix(name, "Test")
        || has_prefix(name, "test")
        || has_prefix(name, "Benchmark")
        || has_prefix(name, "Example")
        || has_prefix(name, "Fuzz")
}

pub fn is_http_handler(name: &str) -> bool {
    HANDLER_SUFFIXES.iter().any(|s| name.ends_with(s))
        || HTTP_VERBS.iter().any(|verb| has_prefix(name, verb))
        || SERVE_NAMES.contains(&name)
}

pub fn is_event_handler(name: &str) -> bool {
    has_prefix(name, "On")
        || has_prefix(name, "on")
        || has_prefix(name, "Handle")
        || has_prefix(name, "handle")
        || CALLBACK_SUFFIXES.iter().any(|s| name.ends_with(s))
}

pub fn is_lifecycle_method(name: &str) -> bool {
    LIFECYCLE_METHODS.contains(&name)
}

/// Whether a definition is a root of the reachability search.
///
/// `exported_entry_points` treats every exported symbol as reachable from
/// outside the project.
pub fn is_entry_point(def: &Definition, exported_entry_points: bool) -> bool {
    let name = def.name.as_str();
    is_program_entry(name)
        || def.is_ffi
        || (exported_entry_points && def.exported)
        || is_test_convention(name)
        || is_http_handler(name)
        || is_event_handler(name)
        || is_lifecycle_method(name)
}
