//! Line coverage overlay for dead-code confidence
//!
//! Coverage is loaded from a simple JSON document:
//!
//! ```json
//! { "files": { "src/app.py": { "12": 3, "13": 0 } } }
//! ```
//!
//! A count above zero marks the line as covered.

use crate::errors::{GraphError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageData {
    covered_lines: BTreeMap<String, BTreeSet<u32>>,
    execution_counts: BTreeMap<String, BTreeMap<u32, u64>>,
}

#[derive(Deserialize)]
struct CoverageFile {
    #[serde(default)]
    files: BTreeMap<String, BTreeMap<String, u64>>,
}

impl CoverageData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an execution count for one line. Counts accumulate.
    pub fn record(&mut self, file: &str, line: u32, count: u64) {
        let slot = self
            .execution_counts
            .entry(file.to_string())
            .or_default()
            .entry(line)
            .or_default();
        *slot += count;
        if *slot > 0 {
            self.covered_lines
                .entry(file.to_string())
                .or_default()
                .insert(line);
        }
    }

    pub fn from_json_str(json: &str, origin: &str) -> Result<Self> {
        let parsed: CoverageFile =
            serde_json::from_str(json).map_err(|e| GraphError::Coverage {
                path: PathBuf::from(origin),
                message: e.to_string(),
            })?;

        let mut data = CoverageData::new();
        for (file, lines) in parsed.files {
            for (line, count) in lines {
                let line: u32 = line.trim().parse().map_err(|_| GraphError::Coverage {
                    path: PathBuf::from(origin),
                    message: format!("invalid line number '{line}' for {file}"),
                })?;
                data.record(&file, line, count);
            }
        }
        debug!(
            "Loaded coverage for {} files from {}",
            data.file_count(),
            origin
        );
        Ok(data)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::Coverage {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&content, &path.display().to_string())
    }

    pub fn is_line_covered(&self, file: &str, line: u32) -> bool {
        self.covered_lines
            .get(file)
            .is_some_and(|lines| lines.contains(&line))
    }

    pub fn execution_count(&self, file: &str, line: u32) -> u64 {
        self.execution_counts
            .get(file)
            .and_then(|lines| lines.get(&line))
            .copied()
            .unwrap_or(0)
    }

    /// Whether any line in `start..=end` ran at least once
    pub fn covers_range(&self, file: &str, start: u32, end: u32) -> bool {
        let end = end.max(start);
        self.covered_lines
            .get(file)
            .is_some_and(|lines| lines.range(start..=end).next().is_some())
    }

    pub fn file_count(&self) -> usize {
        self.execution_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.execution_counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_query() {
        let data = CoverageData::from_json_str(
            r#"{"files": {"app.py": {"3": 2, "4": 0, "10": 1}}}"#,
            "inline",
        )
        .unwrap();
        assert!(data.is_line_covered("app.py", 3));
        assert!(!data.is_line_covered("app.py", 4));
        assert_eq!(data.execution_count("app.py", 10), 1);
        assert_eq!(data.execution_count("other.py", 10), 0);
        assert!(!data.covers_range("app.py", 4, 5));
        assert!(data.covers_range("app.py", 5, 12));
    }

    #[test]
    fn test_zero_count_is_not_covered() {
        let mut data = CoverageData::new();
        data.record("a.go", 7, 0);
        assert!(!data.is_line_covered("a.go", 7));
        assert!(!data.is_empty());
    }

    #[test]
    fn test_bad_line_number_is_reported() {
        let err = CoverageData::from_json_str(r#"{"files": {"a.go": {"x": 1}}}"#, "cov.json")
            .unwrap_err();
        assert!(matches!(err, GraphError::Coverage { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = CoverageData::from_json_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, GraphError::Coverage { .. }));
    }
}
