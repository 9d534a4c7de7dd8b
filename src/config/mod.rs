//! Configuration for the graph engine
//!
//! Project-level settings live in `repotoire.toml` (or `.repotoirerc.json`)
//! at the repository root. CLI flags override what the file sets.

mod project_config;

pub use project_config::{
    glob_match, load_project_config, ExcludeConfig, GraphConfig, ProjectConfig, SmellsConfig,
    DEFAULT_EXCLUDE_PATTERNS,
};
