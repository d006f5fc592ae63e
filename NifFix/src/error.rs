//! Error types for `NifFix`

use std::path::PathBuf;

use thiserror::Error;

use crate::formats::nif::NifVersion;

/// The error type for `NifFix` operations.
///
/// Every variant is local to one file: a batch run records the error for
/// that file and moves on to its siblings.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),

    /// The input path is neither a file nor a directory.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was requested.
        path: PathBuf,
    },

    // ==================== Header Errors ====================
    /// The header line or block count does not look like a Gamebryo file.
    #[error("malformed NIF header: {reason}")]
    MalformedHeader {
        /// What was wrong with the header.
        reason: String,
    },

    /// The file declares a version this tool does not repair.
    #[error("unsupported NIF version {found} (supported: {supported})", supported = NifVersion::SUPPORTED)]
    UnsupportedVersion {
        /// The version found in the file.
        found: NifVersion,
    },

    /// The container uses a layout this tool cannot walk safely.
    #[error("unsupported NIF format: {reason}")]
    UnsupportedFormat {
        /// Description of the unsupported feature.
        reason: String,
    },

    // ==================== Structural Errors ====================
    /// A read would extend past the end of the buffer.
    #[error("truncated buffer: need {need} bytes at offset {offset}, file is {len} bytes")]
    TruncatedBuffer {
        /// Absolute offset of the failed read.
        offset: usize,
        /// Bytes requested.
        need: usize,
        /// Total buffer length.
        len: usize,
    },

    /// A block's type index points outside the block-type table.
    #[error("block {block} has type index {type_index}, but only {count} block types are declared")]
    InvalidBlockType {
        /// Block index.
        block: usize,
        /// The out-of-range type index.
        type_index: u16,
        /// Number of declared block types.
        count: usize,
    },

    /// A block reference points outside the block table.
    #[error("block {block} references block {target}, but the file has {count} blocks")]
    InvalidBlockRef {
        /// Referencing block.
        block: usize,
        /// The referenced index.
        target: i32,
        /// Number of blocks in the file.
        count: usize,
    },

    /// A string reference points outside the string table.
    #[error("block {block} references string {index}, but the string table has {count} entries")]
    InvalidStringIndex {
        /// Referencing block.
        block: usize,
        /// The out-of-range string index.
        index: u32,
        /// Number of strings in the table.
        count: usize,
    },

    /// Typed parsing of a block read past its declared size.
    #[error("{type_name} block {block} overruns its declared size of {size} bytes")]
    BlockOverrun {
        /// Block index.
        block: usize,
        /// Block type name.
        type_name: String,
        /// Declared block size.
        size: usize,
    },
}

impl Error {
    /// Whether this error means the file is not a supported Gamebryo file
    /// at all, as opposed to a supported file with corrupt contents.
    #[must_use]
    pub fn is_unsupported_format(&self) -> bool {
        matches!(
            self,
            Error::MalformedHeader { .. }
                | Error::UnsupportedVersion { .. }
                | Error::UnsupportedFormat { .. }
        )
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// Why a single index stream (or region of one) was left untouched.
///
/// These are not errors: the rest of the file is still processed.
#[derive(Error, Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The index count is not a multiple of three.
    #[error("index count {count} is not divisible by 3")]
    NonTriangleIndexCount {
        /// Declared number of indices.
        count: usize,
    },

    /// An integer index format whose width is neither 2 nor 4 bytes.
    #[error("unsupported index width of {width} bytes")]
    UnsupportedElementWidth {
        /// Declared element width in bytes.
        width: usize,
    },

    /// The stream's component layout is not a single integer index.
    #[error("unsupported index component format 0x{format:08x} ({components} components)")]
    UnsupportedComponentFormat {
        /// Packed component format of the first component.
        format: u32,
        /// Number of components in the stream.
        components: usize,
    },

    /// The owning mesh is not a triangle list.
    #[error("mesh primitive type {primitive} is not a triangle list")]
    NotTriangleList {
        /// Raw primitive type value.
        primitive: u32,
    },

    /// A region addresses indices beyond the stream's payload.
    #[error("region [{start}, {start}+{count}) exceeds stream capacity of {capacity} indices")]
    RegionOutOfBounds {
        /// First index of the region.
        start: usize,
        /// Number of indices in the region.
        count: usize,
        /// Number of indices the payload holds.
        capacity: usize,
    },

    /// A region partially overlaps one that was already fixed.
    #[error("region [{start}, {start}+{count}) overlaps a previous region")]
    OverlappingRegion {
        /// First index of the region.
        start: usize,
        /// Number of indices in the region.
        count: usize,
    },

    /// The referenced block is not an `NiDataStream`.
    #[error("referenced block is a {type_name}, not an NiDataStream")]
    NotADataStream {
        /// Actual type of the referenced block.
        type_name: String,
    },
}

/// A specialized Result type for `NifFix` operations.
pub type Result<T> = std::result::Result<T, Error>;
