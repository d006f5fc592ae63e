//! # NifFix
//!
//! Repairs Gamebryo NIF 20.6.0.0 models whose triangle winding is inverted,
//! which makes back-face culling render them inside-out.
//!
//! The file is parsed just far enough to find every `NiMesh` and the
//! `NiDataStream` blocks it uses for triangle indices. Each triangle
//! `(i0, i1, i2)` in those streams becomes `(i2, i1, i0)`; every other byte
//! of the file is left exactly as it was.
//!
//! ## Quick Start
//!
//! ```no_run
//! use niffix::fix::{FixOptions, FixOutcome, fix_file};
//! use std::path::Path;
//!
//! let report = fix_file(Path::new("rock01.nif"), &FixOptions::default())?;
//! if report.outcome == FixOutcome::Fixed {
//!     println!("Reversed {} triangles", report.triangles_reversed);
//! }
//! # Ok::<(), niffix::Error>(())
//! ```
//!
//! ### Working in memory
//!
//! ```no_run
//! let data = std::fs::read("rock01.nif")?;
//! let fixed = niffix::fix::fix_bytes(&data)?;
//! assert_eq!(fixed.bytes.len(), data.len());
//! # Ok::<(), niffix::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `niffix` command-line binary

pub mod error;
pub mod fix;
pub mod formats;
pub mod inspect;
pub mod winding;

// Re-exports for convenience
pub use error::{Error, Result, SkipReason};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result, SkipReason};
    pub use crate::fix::{
        BatchFixResult, FileResult, FileStatus, FixOptions, FixOutcome, FixReport, FixedNif,
        NifDiscovery, OutputTarget, batch_fix, discover_nif_files, find_nif_files, fix_bytes,
        fix_file,
    };
    pub use crate::formats::nif::{
        LocatedStream, NifFile, NifHeader, NifVersion, SkippedStream, StreamScan,
        locate_index_streams,
    };
    pub use crate::inspect::{NifSummary, WindingPreview, inspect_nif, inspect_nif_bytes};
    pub use crate::winding::{
        IndexStreamDescriptor, IndexWidth, Triangle, read_triangles, reverse_winding,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
