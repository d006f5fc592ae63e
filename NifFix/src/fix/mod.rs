//! Winding repair for whole files
//!
//! The pipeline for one file is: read all bytes, locate index streams,
//! reverse each located region in a private copy of the buffer, then commit
//! the copy. Nothing reaches disk until every region has been rewritten, so
//! a failure at any point leaves the original untouched.

pub mod batch;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::formats::nif::{LocatedStream, NifFile, SkippedStream, locate_index_streams};
use crate::winding::reverse_winding;

pub use batch::{
    BatchFixResult, FileResult, FileStatus, NifDiscovery, batch_fix, discover_nif_files,
    find_nif_files,
};

/// Where repaired bytes are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputTarget {
    /// Overwrite the input file.
    #[default]
    InPlace,
    /// Write to this exact path.
    File(PathBuf),
    /// Write to `output_root`, mirroring the input's path below `source_root`.
    Mirror {
        source_root: PathBuf,
        output_root: PathBuf,
    },
}

impl OutputTarget {
    /// Destination path for a given input file.
    #[must_use]
    pub fn destination(&self, input: &Path) -> PathBuf {
        match self {
            OutputTarget::InPlace => input.to_path_buf(),
            OutputTarget::File(path) => path.clone(),
            OutputTarget::Mirror {
                source_root,
                output_root,
            } => match input.strip_prefix(source_root) {
                Ok(relative) => output_root.join(relative),
                Err(_) => output_root.join(input.file_name().unwrap_or(input.as_os_str())),
            },
        }
    }
}

/// Caller-level options for a repair run.
#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    pub output: OutputTarget,
    /// Run the whole pipeline but never write.
    pub dry_run: bool,
}

/// What happened to a file that parsed cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixOutcome {
    /// At least one index region was rewritten.
    Fixed,
    /// Nothing to rewrite; the output equals the input.
    SkippedNoIndices,
}

impl fmt::Display for FixOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixOutcome::Fixed => "fixed",
            FixOutcome::SkippedNoIndices => "skipped-no-indices",
        })
    }
}

/// Summary of a repair.
#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    pub outcome: FixOutcome,
    pub triangles_reversed: usize,
    pub located: Vec<LocatedStream>,
    pub skipped: Vec<SkippedStream>,
    /// Set once the repaired bytes have been committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<PathBuf>,
}

/// Repaired bytes plus the report that describes them.
#[derive(Debug, Clone)]
pub struct FixedNif {
    pub report: FixReport,
    pub bytes: Vec<u8>,
}

/// Repair a NIF held in memory. `data` itself is never modified.
///
/// # Errors
///
/// Returns the header-family errors for unsupported files and
/// [`Error::TruncatedBuffer`] / [`Error::BlockOverrun`] and friends for
/// corrupt ones. Streams that cannot be fixed are reported, not errors.
pub fn fix_bytes(data: &[u8]) -> Result<FixedNif> {
    let file = NifFile::parse(data)?;
    let scan = locate_index_streams(&file)?;

    let mut working = data.to_vec();
    let mut triangles_reversed = 0;
    for located in &scan.located {
        triangles_reversed += reverse_winding(&mut working, &located.descriptor)?;
    }

    let outcome = if scan.is_empty() {
        FixOutcome::SkippedNoIndices
    } else {
        FixOutcome::Fixed
    };

    Ok(FixedNif {
        report: FixReport {
            outcome,
            triangles_reversed,
            located: scan.located,
            skipped: scan.skipped,
            written: None,
        },
        bytes: working,
    })
}

/// Repair one file on disk and commit it according to `options`.
///
/// Files with nothing to fix are never written, whatever the output target.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read or the result cannot be
/// committed, plus everything [`fix_bytes`] can return.
pub fn fix_file(path: &Path, options: &FixOptions) -> Result<FixReport> {
    let data = std::fs::read(path)?;
    let FixedNif { mut report, bytes } = fix_bytes(&data)?;

    match report.outcome {
        FixOutcome::Fixed if !options.dry_run => {
            let destination = options.output.destination(path);
            commit(&destination, &bytes)?;
            tracing::info!(
                "Fixed {}: {} regions, {} triangles -> {}",
                path.display(),
                report.located.len(),
                report.triangles_reversed,
                destination.display()
            );
            report.written = Some(destination);
        }
        FixOutcome::Fixed => {
            tracing::info!(
                "Would fix {}: {} regions, {} triangles (dry run)",
                path.display(),
                report.located.len(),
                report.triangles_reversed
            );
        }
        FixOutcome::SkippedNoIndices => {
            tracing::info!("No index streams to fix in {}", path.display());
        }
    }

    Ok(report)
}

/// Atomically replace `destination` with `bytes`.
///
/// The bytes go to a temporary file in the destination directory first and
/// are renamed over the target only after a successful flush. An existing
/// target keeps its permissions.
fn commit(destination: &Path, bytes: &[u8]) -> Result<()> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    if let Ok(metadata) = std::fs::metadata(destination) {
        std::fs::set_permissions(temp.path(), metadata.permissions())?;
    }
    temp.persist(destination).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_in_place_and_file() {
        let input = Path::new("meshes/rock.nif");
        assert_eq!(OutputTarget::InPlace.destination(input), input);
        assert_eq!(
            OutputTarget::File(PathBuf::from("out.nif")).destination(input),
            PathBuf::from("out.nif")
        );
    }

    #[test]
    fn test_destination_mirror() {
        let target = OutputTarget::Mirror {
            source_root: PathBuf::from("in"),
            output_root: PathBuf::from("out"),
        };
        assert_eq!(
            target.destination(Path::new("in/a/b.nif")),
            PathBuf::from("out/a/b.nif")
        );
        assert_eq!(
            target.destination(Path::new("elsewhere/c.nif")),
            PathBuf::from("out/c.nif")
        );
    }

    #[test]
    fn test_fix_bytes_rejects_non_nif() {
        let err = fix_bytes(b"not a nif file\n\0\0\0\0").unwrap_err();
        assert!(err.is_unsupported_format());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(FixOutcome::Fixed.to_string(), "fixed");
        assert_eq!(FixOutcome::SkippedNoIndices.to_string(), "skipped-no-indices");
    }
}
