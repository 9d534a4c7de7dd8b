//! Repotoire graph engine
//!
//! Builds a typed relationship graph of a multi-language repository and
//! runs graph analyses over it: dependency cycles, coupling smells,
//! PageRank repo maps, and reachability-based dead code detection.

pub mod cli;
pub mod config;
pub mod coverage;
pub mod detectors;
pub mod errors;
pub mod graph;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod repomap;

pub use errors::{GraphError, Result};
