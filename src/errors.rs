//! Error types for the graph engine
//!
//! Graph algorithms only fail on invalid parameters. Per-file problems
//! during extraction are skips, not errors, and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring or running graph analyses
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("Failed to load coverage from {}: {message}", path.display())]
    Coverage { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
