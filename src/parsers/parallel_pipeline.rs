//! Parallel extraction pipeline using crossbeam channels
//!
//! Pass 1 of graph construction runs here. Extraction is CPU-bound and has
//! no cross-file state, so it fans out over N worker threads while the
//! calling thread collects fragments.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────┐
//!                     │   Producer  │  Single thread feeds file paths
//!                     └──────┬──────┘
//!                            │ bounded channel
//!            ┌───────────────┼───────────────┐
//!            ▼               ▼               ▼
//!     ┌──────────┐    ┌──────────┐    ┌──────────┐
//!     │ Worker 1 │    │ Worker 2 │    │ Worker N │  Each owns its parse state
//!     └────┬─────┘    └────┬─────┘    └────┬─────┘
//!          └───────────────┼───────────────┘
//!                          │ bounded channel
//!                          ▼
//!                   ┌──────────────┐
//!                   │   Consumer   │  Calling thread, collects fragments
//!                   └──────────────┘
//! ```
//!
//! Returning from [`extract_parallel`] is the barrier: every fragment exists
//! before the graph builder starts resolving references.

use crate::parsers::{parse_file_as, FileFragment};
use crossbeam_channel::bounded;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// A file to extract, with the path it is reported under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Repository-relative path with `/` separators
    pub relative: String,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workers: usize,
    pub buffer_size: usize,
    pub max_file_size: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            buffer_size: 256,
            max_file_size: 2 * 1024 * 1024,
        }
    }
}

/// Combined stats from the pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub total_files: usize,
    pub parsed_files: usize,
    pub skipped_large: usize,
    pub skipped_errors: usize,
    pub cancelled: bool,
    pub total_definitions: usize,
}

#[derive(Debug, Default)]
pub struct ExtractionResult {
    /// Sorted by path
    pub fragments: Vec<FileFragment>,
    pub stats: PipelineStats,
}

enum WorkerOutput {
    Parsed(Box<FileFragment>),
    TooLarge,
    Failed,
}

fn extract_one(file: &SourceFile, max_file_size: u64) -> WorkerOutput {
    let size = match std::fs::metadata(&file.path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("Failed to stat {}: {}", file.path.display(), e);
            return WorkerOutput::Failed;
        }
    };
    if size > max_file_size {
        debug!(
            "Skipping {} ({} bytes > {} limit)",
            file.relative, size, max_file_size
        );
        return WorkerOutput::TooLarge;
    }

    match parse_file_as(&file.path, &file.relative) {
        Ok(fragment) => WorkerOutput::Parsed(Box::new(fragment)),
        Err(e) => {
            warn!("Failed to parse {}: {:#}", file.relative, e);
            WorkerOutput::Failed
        }
    }
}

/// Extract every file on a bounded worker pool.
///
/// `progress` is called on the calling thread once per finished file with
/// `(done, total)`. Setting `cancel` stops the producer and workers before
/// their next file; fragments already extracted are still returned.
pub fn extract_parallel(
    files: Vec<SourceFile>,
    options: &PipelineOptions,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<&(dyn Fn(usize, usize) + Sync)>,
) -> ExtractionResult {
    let total = files.len();
    let num_workers = options.workers.max(1);
    let buffer_size = options.buffer_size.max(1);
    let max_file_size = options.max_file_size;
    let cancel = cancel.unwrap_or_default();

    let (file_tx, file_rx) = bounded::<SourceFile>(buffer_size);
    let (result_tx, result_rx) = bounded::<WorkerOutput>(buffer_size);

    let producer_cancel = Arc::clone(&cancel);
    let producer = thread::spawn(move || {
        for file in files {
            if producer_cancel.load(Ordering::Relaxed) {
                break;
            }
            // Blocks while the channel is full
            if file_tx.send(file).is_err() {
                break;
            }
        }
    });

    let mut workers = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let rx = file_rx.clone();
        let tx = result_tx.clone();
        let cancel = Arc::clone(&cancel);
        workers.push(thread::spawn(move || {
            for file in rx {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                if tx.send(extract_one(&file, max_file_size)).is_err() {
                    break;
                }
            }
        }));
    }

    // Workers see a closed channel once the producer is done
    drop(file_rx);
    drop(result_tx);

    let mut result = ExtractionResult {
        fragments: Vec::with_capacity(total),
        stats: PipelineStats {
            total_files: total,
            ..Default::default()
        },
    };

    let mut done = 0;
    for output in result_rx {
        done += 1;
        match output {
            WorkerOutput::Parsed(fragment) => {
                result.stats.parsed_files += 1;
                result.stats.total_definitions += fragment.definitions.len();
                result.fragments.push(*fragment);
            }
            WorkerOutput::TooLarge => result.stats.skipped_large += 1,
            WorkerOutput::Failed => result.stats.skipped_errors += 1,
        }
        if let Some(cb) = progress {
            cb(done, total);
        }
    }

    if producer.join().is_err() {
        warn!("Extraction producer thread panicked");
    }
    for handle in workers {
        if handle.join().is_err() {
            warn!("Extraction worker thread panicked");
        }
    }

    result.stats.cancelled = cancel.load(Ordering::Relaxed);
    result.fragments.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(
        "Extracted {}/{} files ({} too large, {} failed)",
        result.stats.parsed_files,
        total,
        result.stats.skipped_large,
        result.stats.skipped_errors
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> SourceFile {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        SourceFile {
            path,
            relative: name.to_string(),
        }
    }

    #[test]
    fn test_pipeline_multiple_workers() {
        let dir = TempDir::new().unwrap();
        let files: Vec<SourceFile> = (0..10)
            .map(|i| write(&dir, &format!("m{i}.py"), &format!("def func{i}():\n    pass\n")))
            .collect();

        let options = PipelineOptions {
            workers: 4,
            buffer_size: 3,
            ..Default::default()
        };
        let result = extract_parallel(files, &options, None, None);

        assert_eq!(result.fragments.len(), 10);
        assert_eq!(result.stats.parsed_files, 10);
        assert_eq!(result.stats.total_definitions, 10);
        let paths: Vec<&str> = result.fragments.iter().map(|f| f.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_oversized_and_broken_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let ok = write(&dir, "ok.go", "package main\n\nfunc main() {}\n");
        let big = write(&dir, "big.go", &"// padding\n".repeat(200));
        let unsupported = write(&dir, "notes.txt", "hello");
        let missing = SourceFile {
            path: dir.path().join("gone.go"),
            relative: "gone.go".to_string(),
        };

        let options = PipelineOptions {
            workers: 2,
            buffer_size: 2,
            max_file_size: 1024,
        };
        let result = extract_parallel(vec![ok, big, unsupported, missing], &options, None, None);

        assert_eq!(result.stats.total_files, 4);
        assert_eq!(result.stats.parsed_files, 1);
        assert_eq!(result.stats.skipped_large, 1);
        assert_eq!(result.stats.skipped_errors, 2);
        assert_eq!(result.fragments[0].path, "ok.go");
    }

    #[test]
    fn test_progress_called_per_file() {
        let dir = TempDir::new().unwrap();
        let files: Vec<SourceFile> = (0..5)
            .map(|i| write(&dir, &format!("f{i}.js"), "function f() {}\n"))
            .collect();

        let calls = AtomicUsize::new(0);
        let last = AtomicUsize::new(0);
        let progress = |done: usize, total: usize| {
            calls.fetch_add(1, Ordering::SeqCst);
            last.store(done, Ordering::SeqCst);
            assert_eq!(total, 5);
        };
        extract_parallel(files, &PipelineOptions::default(), None, Some(&progress));

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(last.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        let files: Vec<SourceFile> = (0..20)
            .map(|i| write(&dir, &format!("f{i}.py"), "x = 1\n"))
            .collect();

        let cancel = Arc::new(AtomicBool::new(true));
        let result = extract_parallel(files, &PipelineOptions::default(), Some(cancel), None);
        assert!(result.stats.cancelled);
        assert!(result.fragments.is_empty());
        assert_eq!(result.stats.total_files, 20);
    }

    #[test]
    fn test_empty_input() {
        let result = extract_parallel(Vec::new(), &PipelineOptions::default(), None, None);
        assert!(result.fragments.is_empty());
        assert_eq!(result.stats, PipelineStats::default());
    }
}
