//! Gamebryo NIF container support
//!
//! A NIF file is a text header line, a binary header (version, block-type
//! table, per-block type index and size, string table, groups), then the
//! blocks back to back, then a footer. From 20.2.0.5 on every block's byte
//! size is declared up front, which is what lets us skip block types we do
//! not understand without interpreting them.
//!
//! Only `NiMesh` and `NiDataStream` blocks are ever decoded.

mod blocks;
mod cursor;
mod header;
mod locator;

use std::fmt;

use serde::Serialize;

pub use blocks::{
    Block, BlockKind, ComponentFormat, DataStreamTag, DataStreamUsage, MeshPrimitiveType,
    MeshStreamRef, NiDataStream, NiMesh, Region, Semantic,
};
pub use cursor::NifCursor;
pub use header::{BlockHeader, NifHeader};
pub use locator::{LocatedStream, SkippedStream, StreamScan, locate_index_streams};

use crate::error::{Error, Result};

/// Text every NIF header line of the supported family contains.
pub const HEADER_SIGNATURE: &str = "Gamebryo File Format";

/// Component semantic name that marks a mesh stream as triangle indices.
pub const INDEX_SEMANTIC: &str = "INDEX";

/// Null value for block references.
pub const NULL_REF: i32 = -1;

/// Null value for string table references.
pub const NULL_STRING: u32 = u32::MAX;

/// A packed NIF version number (`major.minor.patch.internal`, one byte each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NifVersion(pub u32);

impl NifVersion {
    /// The only version this tool repairs.
    pub const SUPPORTED: NifVersion = NifVersion::new(20, 6, 0, 0);

    pub const V5_0_0_1: NifVersion = NifVersion::new(5, 0, 0, 1);
    pub const V5_0_0_6: NifVersion = NifVersion::new(5, 0, 0, 6);
    pub const V10_0_1_0: NifVersion = NifVersion::new(10, 0, 1, 0);
    pub const V10_0_1_8: NifVersion = NifVersion::new(10, 0, 1, 8);
    pub const V20_0_0_3: NifVersion = NifVersion::new(20, 0, 0, 3);
    pub const V20_1_0_1: NifVersion = NifVersion::new(20, 1, 0, 1);
    pub const V20_2_0_5: NifVersion = NifVersion::new(20, 2, 0, 5);
    pub const V20_2_0_7: NifVersion = NifVersion::new(20, 2, 0, 7);
    pub const V20_9_0_1: NifVersion = NifVersion::new(20, 9, 0, 1);

    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u8, internal: u8) -> Self {
        NifVersion(u32::from_be_bytes([major, minor, patch, internal]))
    }

    /// Parse the dotted form used in the header line (`20.6.0.0`).
    #[must_use]
    pub fn parse_dotted(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('.').map(str::parse::<u8>);
        let major = parts.next()?.ok()?;
        let minor = parts.next()?.ok()?;
        let patch = parts.next()?.ok()?;
        let internal = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(NifVersion::new(major, minor, patch, internal))
    }

    #[must_use]
    pub fn is_supported(self) -> bool {
        self == Self::SUPPORTED
    }
}

impl fmt::Display for NifVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [major, minor, patch, internal] = self.0.to_be_bytes();
        write!(f, "{major}.{minor}.{patch}.{internal}")
    }
}

impl Serialize for NifVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A parsed view over the raw bytes of one NIF file.
///
/// Holds the header and the block table; block contents are decoded on
/// demand through cursors windowed to each block's declared extent.
#[derive(Debug)]
pub struct NifFile<'a> {
    data: &'a [u8],
    header: NifHeader,
}

impl<'a> NifFile<'a> {
    /// Parse the header and block table of a supported-version file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`], [`Error::UnsupportedFormat`] or
    /// [`Error::UnsupportedVersion`] if the file is not a 20.6.0.0 NIF, and
    /// [`Error::TruncatedBuffer`] if the block table does not fit the file.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header = NifHeader::parse(data)?;
        Self::from_header(data, header)
    }

    /// Wrap an already parsed header, rejecting unsupported versions.
    pub fn from_header(data: &'a [u8], header: NifHeader) -> Result<Self> {
        if !header.version.is_supported() {
            return Err(Error::UnsupportedVersion {
                found: header.version,
            });
        }
        Ok(Self { data, header })
    }

    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[must_use]
    pub fn header(&self) -> &NifHeader {
        &self.header
    }

    #[must_use]
    pub fn version(&self) -> NifVersion {
        self.header.version
    }

    /// Cursor restricted to one block's declared extent.
    pub fn block_cursor(&self, block: &BlockHeader) -> Result<NifCursor<'a>> {
        NifCursor::window(self.data, block.offset, block.size)
    }

    /// Resolve a block reference made by `from`. Null references yield `None`.
    pub fn resolve_ref(&self, from: usize, target: i32) -> Result<Option<&BlockHeader>> {
        if target == NULL_REF {
            return Ok(None);
        }
        usize::try_from(target)
            .ok()
            .and_then(|index| self.header.blocks.get(index))
            .map(Some)
            .ok_or(Error::InvalidBlockRef {
                block: from,
                target,
                count: self.header.blocks.len(),
            })
    }

    /// Resolve a string-table reference made by `from`. Null references
    /// yield `None`.
    pub fn string(&self, from: usize, index: u32) -> Result<Option<&str>> {
        if index == NULL_STRING {
            return Ok(None);
        }
        self.header
            .strings
            .get(index as usize)
            .map(|s| Some(s.as_str()))
            .ok_or(Error::InvalidStringIndex {
                block: from,
                index,
                count: self.header.strings.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_packing() {
        assert_eq!(NifVersion::SUPPORTED.0, 0x14060000);
        assert_eq!(NifVersion::SUPPORTED.to_string(), "20.6.0.0");
        assert!(NifVersion::V20_2_0_5 < NifVersion::SUPPORTED);
    }

    #[test]
    fn test_parse_dotted() {
        assert_eq!(NifVersion::parse_dotted("20.6.0.0"), Some(NifVersion::SUPPORTED));
        assert_eq!(NifVersion::parse_dotted("20.6.0"), None);
        assert_eq!(NifVersion::parse_dotted("20.6.0.0.1"), None);
        assert_eq!(NifVersion::parse_dotted("20.x.0.0"), None);
    }
}
