//! Batch repair
//!
//! Discovers NIF files under a directory and repairs them in parallel.
//! Each file is independent: a failure is recorded for that file and the
//! rest of the batch carries on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use super::{FixOptions, FixOutcome, fix_file};
use crate::error::Error;

/// Per-file result of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FileStatus {
    Fixed {
        regions: usize,
        triangles: usize,
        skipped: usize,
    },
    SkippedNoIndices {
        skipped: usize,
    },
    Error {
        message: String,
        unsupported_format: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Result of a batch repair
#[derive(Debug, Clone, Serialize)]
pub struct BatchFixResult {
    pub fixed_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    /// One entry per input file, in input order.
    pub results: Vec<FileResult>,
}

impl BatchFixResult {
    /// Whether any file failed with an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Append failures found before repair started, such as unreadable
    /// directory entries.
    #[must_use]
    pub fn with_failures(mut self, failures: Vec<FileResult>) -> Self {
        self.error_count += failures.len();
        self.results.extend(failures);
        self
    }
}

/// Files found by [`discover_nif_files`].
#[derive(Debug, Clone, Default)]
pub struct NifDiscovery {
    /// Matching files, sorted.
    pub files: Vec<PathBuf>,
    /// Directory entries that could not be read, as error results.
    pub failures: Vec<FileResult>,
}

/// Find all files with `extension` in a directory recursively
///
/// Entries the walk cannot read (permission errors, broken symlinks) are
/// logged and returned as [`FileStatus::Error`] results instead of being
/// dropped silently.
///
/// # Arguments
/// * `dir` - Directory to search
/// * `extension` - File extension without the dot, matched case-insensitively
pub fn discover_nif_files<P: AsRef<Path>>(dir: P, extension: &str) -> NifDiscovery {
    let dir = dir.as_ref();
    let mut discovery = NifDiscovery::default();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                let err = Error::from(e);
                tracing::warn!("Cannot read {}: {err}", path.display());
                discovery.failures.push(FileResult {
                    path,
                    status: FileStatus::Error {
                        message: err.to_string(),
                        unsupported_format: err.is_unsupported_format(),
                    },
                });
                continue;
            }
        };
        if entry.path().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        {
            discovery.files.push(entry.into_path());
        }
    }

    discovery.files.sort();
    discovery
}

/// Sorted list of matching files under `dir`. Unreadable entries are
/// logged and skipped; use [`discover_nif_files`] to report them.
pub fn find_nif_files<P: AsRef<Path>>(dir: P, extension: &str) -> Vec<PathBuf> {
    discover_nif_files(dir, extension).files
}

/// Repair many files in parallel
///
/// # Arguments
/// * `files` - Files to repair
/// * `options` - Output target and dry-run flag shared by every file
/// * `progress` - Callback for progress updates (current, total, file)
///
/// # Returns
/// Summary of the batch, with one [`FileResult`] per input.
pub fn batch_fix<F>(files: &[PathBuf], options: &FixOptions, progress: F) -> BatchFixResult
where
    F: Fn(usize, usize, &Path) + Send + Sync,
{
    let fixed_counter = AtomicUsize::new(0);
    let skipped_counter = AtomicUsize::new(0);
    let error_counter = AtomicUsize::new(0);
    let processed = AtomicUsize::new(0);
    let total = files.len();

    let results: Vec<FileResult> = files
        .par_iter()
        .map(|path| {
            let status = match fix_file(path, options) {
                Ok(report) => match report.outcome {
                    FixOutcome::Fixed => {
                        fixed_counter.fetch_add(1, Ordering::SeqCst);
                        FileStatus::Fixed {
                            regions: report.located.len(),
                            triangles: report.triangles_reversed,
                            skipped: report.skipped.len(),
                        }
                    }
                    FixOutcome::SkippedNoIndices => {
                        skipped_counter.fetch_add(1, Ordering::SeqCst);
                        FileStatus::SkippedNoIndices {
                            skipped: report.skipped.len(),
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed {}: {e}", path.display());
                    error_counter.fetch_add(1, Ordering::SeqCst);
                    FileStatus::Error {
                        message: e.to_string(),
                        unsupported_format: e.is_unsupported_format(),
                    }
                }
            };

            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(current, total, path);

            FileResult {
                path: path.clone(),
                status,
            }
        })
        .collect();

    BatchFixResult {
        fixed_count: fixed_counter.load(Ordering::SeqCst),
        skipped_count: skipped_counter.load(Ordering::SeqCst),
        error_count: error_counter.load(Ordering::SeqCst),
        results,
    }
}
