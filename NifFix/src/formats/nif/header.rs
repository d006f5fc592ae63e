//! NIF header and block table parsing

use super::blocks::BlockKind;
use super::cursor::NifCursor;
use super::{HEADER_SIGNATURE, NifVersion};
use crate::error::{Error, Result};

/// The header line is short; anything longer is not a NIF.
const MAX_HEADER_LINE: usize = 128;

/// From 20.2.0.5 the high bit of a block type index is a flag, not part
/// of the index.
const BLOCK_TYPE_FLAG: u16 = 0x8000;

/// Location and type of one block in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Position in the block table.
    pub index: usize,
    /// Index into [`NifHeader::block_types`].
    pub type_index: u16,
    /// Absolute offset of the block's first byte.
    pub offset: usize,
    /// Declared size in bytes.
    pub size: usize,
}

impl BlockHeader {
    /// Absolute offset one past the block's last byte.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Everything before the first block.
#[derive(Debug, Clone)]
pub struct NifHeader {
    /// The text line, without its terminating newline.
    pub header_line: String,
    pub version: NifVersion,
    pub user_version: u32,
    /// Raw block type names. `NiDataStream` names carry binary suffix bytes.
    pub block_types: Vec<Vec<u8>>,
    pub blocks: Vec<BlockHeader>,
    pub strings: Vec<String>,
    pub groups: Vec<u32>,
    /// Offset of the first block.
    pub blocks_start: usize,
    /// Offset one past the last block (start of the footer).
    pub blocks_end: usize,
}

impl NifHeader {
    /// Parse the header of any 20.2.0.5+ little-endian NIF.
    ///
    /// The version is not checked against [`NifVersion::SUPPORTED`] here so
    /// other files can still be inspected; see [`super::NifFile::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the signature line, version
    /// text, or block count is wrong, [`Error::UnsupportedFormat`] for
    /// big-endian files or files without per-block sizes, and
    /// [`Error::TruncatedBuffer`] if any table or block runs past the end.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let line_end = data
            .iter()
            .take(MAX_HEADER_LINE)
            .position(|&b| b == b'\n')
            .ok_or_else(|| malformed("no header line found"))?;
        let header_line = String::from_utf8_lossy(&data[..line_end]).into_owned();
        if !header_line.contains(HEADER_SIGNATURE) {
            return Err(malformed(format!(
                "expected '{HEADER_SIGNATURE}', found '{header_line}'"
            )));
        }

        let mut cursor = NifCursor::new(data);
        cursor.skip(line_end + 1)?;

        let version = NifVersion(cursor.read_u32()?);
        let text_version = header_line
            .rsplit(' ')
            .next()
            .and_then(NifVersion::parse_dotted)
            .ok_or_else(|| malformed(format!("no version in header line '{header_line}'")))?;
        if text_version != version {
            return Err(malformed(format!(
                "header line says {text_version} but binary version is {version}"
            )));
        }

        let little_endian = if version >= NifVersion::V20_0_0_3 {
            cursor.read_u8()? != 0
        } else {
            true
        };
        if !little_endian {
            return Err(Error::UnsupportedFormat {
                reason: "big-endian files are not supported".to_string(),
            });
        }

        let user_version = if version >= NifVersion::V10_0_1_8 {
            cursor.read_u32()?
        } else {
            0
        };

        let num_blocks = cursor.read_i32()?;
        let num_blocks = usize::try_from(num_blocks)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| malformed(format!("invalid block count {num_blocks}")))?;

        if version < NifVersion::V20_2_0_5 {
            return Err(Error::UnsupportedFormat {
                reason: format!("version {version} does not declare block sizes"),
            });
        }

        if version >= NifVersion::V20_9_0_1 {
            let metadata_size = cursor.read_count(1)?;
            cursor.skip(metadata_size)?;
        }

        let mut block_types = Vec::new();
        if version >= NifVersion::V5_0_0_1 {
            let num_types = cursor.read_u16()?;
            block_types.reserve(num_types as usize);
            for _ in 0..num_types {
                block_types.push(cursor.read_sized_bytes()?.to_vec());
            }
        }

        let mut type_indices = Vec::with_capacity(num_blocks.min(cursor.remaining() / 2));
        for block in 0..num_blocks {
            let type_index = cursor.read_u16()? & !BLOCK_TYPE_FLAG;
            if type_index as usize >= block_types.len() {
                return Err(Error::InvalidBlockType {
                    block,
                    type_index,
                    count: block_types.len(),
                });
            }
            type_indices.push(type_index);
        }

        let mut sizes = Vec::with_capacity(type_indices.len());
        for _ in 0..num_blocks {
            sizes.push(cursor.read_u32()? as usize);
        }

        let mut strings = Vec::new();
        if version >= NifVersion::V20_1_0_1 {
            let num_strings = cursor.read_count(4)?;
            let _max_string_length = cursor.read_u32()?;
            strings.reserve(num_strings);
            for _ in 0..num_strings {
                strings.push(cursor.read_sized_string()?);
            }
        }

        let mut groups = Vec::new();
        if version >= NifVersion::V5_0_0_6 {
            let num_groups = cursor.read_count(4)?;
            for _ in 0..num_groups {
                groups.push(cursor.read_u32()?);
            }
        }

        let blocks_start = cursor.absolute_position();
        let mut offset = blocks_start;
        let mut blocks = Vec::with_capacity(num_blocks);
        for (index, (type_index, size)) in type_indices.into_iter().zip(sizes).enumerate() {
            let end = offset
                .checked_add(size)
                .filter(|&end| end <= data.len())
                .ok_or(Error::TruncatedBuffer {
                    offset,
                    need: size,
                    len: data.len(),
                })?;
            blocks.push(BlockHeader {
                index,
                type_index,
                offset,
                size,
            });
            offset = end;
        }

        tracing::debug!(
            "NIF {version}: {} blocks, {} block types, {} strings, blocks at 0x{blocks_start:x}..0x{offset:x}",
            blocks.len(),
            block_types.len(),
            strings.len()
        );

        Ok(Self {
            header_line,
            version,
            user_version,
            block_types,
            blocks,
            strings,
            groups,
            blocks_start,
            blocks_end: offset,
        })
    }

    /// Raw type name of a block.
    #[must_use]
    pub fn raw_type_name(&self, block: &BlockHeader) -> &[u8] {
        self.block_types
            .get(block.type_index as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Printable type name of a block (suffix bytes escaped).
    #[must_use]
    pub fn type_name(&self, block: &BlockHeader) -> String {
        self.raw_type_name(block).escape_ascii().to_string()
    }

    #[must_use]
    pub fn block_kind(&self, block: &BlockHeader) -> BlockKind {
        BlockKind::classify(self.raw_type_name(block))
    }

    /// Number of blocks of each kind, as `(meshes, data streams)`.
    #[must_use]
    pub fn census(&self) -> (usize, usize) {
        self.blocks
            .iter()
            .fold((0, 0), |(meshes, streams), block| match self.block_kind(block) {
                BlockKind::Mesh => (meshes + 1, streams),
                BlockKind::DataStream(_) => (meshes, streams + 1),
                BlockKind::Other => (meshes, streams),
            })
    }
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedHeader {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One `NiNode` block of `body_len` bytes and one string.
    fn header_bytes(endian: u8, num_blocks: i32, type_index: u16, body_len: usize) -> Vec<u8> {
        let mut out = b"Gamebryo File Format, Version 20.6.0.0\n".to_vec();
        out.extend_from_slice(&NifVersion::SUPPORTED.0.to_le_bytes());
        out.push(endian);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&num_blocks.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&6u32.to_le_bytes());
        out.extend_from_slice(b"NiNode");
        for _ in 0..num_blocks.max(0) {
            out.extend_from_slice(&type_index.to_le_bytes());
        }
        for _ in 0..num_blocks.max(0) {
            out.extend_from_slice(&(body_len as u32).to_le_bytes());
        }
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&5u32.to_le_bytes());
        out.extend_from_slice(&5u32.to_le_bytes());
        out.extend_from_slice(b"INDEX");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend(std::iter::repeat_n(0u8, body_len * num_blocks.max(0) as usize));
        out
    }

    #[test]
    fn test_parse_block_table() {
        let data = header_bytes(1, 2, 0, 10);
        let header = NifHeader::parse(&data).unwrap();

        assert_eq!(header.header_line, "Gamebryo File Format, Version 20.6.0.0");
        assert_eq!(header.version, NifVersion::SUPPORTED);
        assert_eq!(header.strings, vec!["INDEX".to_string()]);
        assert_eq!(header.blocks.len(), 2);
        assert_eq!(header.blocks[0].offset, header.blocks_start);
        assert_eq!(header.blocks[1].offset, header.blocks[0].end());
        assert_eq!(header.blocks_end, data.len());
        assert_eq!(header.type_name(&header.blocks[1]), "NiNode");
        assert_eq!(header.census(), (0, 0));
    }

    #[test]
    fn test_type_index_flag_masked() {
        let data = header_bytes(1, 1, BLOCK_TYPE_FLAG, 4);
        let header = NifHeader::parse(&data).unwrap();
        assert_eq!(header.blocks[0].type_index, 0);
    }

    #[test]
    fn test_rejects_bad_headers() {
        assert!(matches!(
            NifHeader::parse(b"NetImmerse File Format, Version 4.0.0.2\n"),
            Err(Error::MalformedHeader { .. })
        ));
        assert!(matches!(
            NifHeader::parse(&header_bytes(0, 1, 0, 4)),
            Err(Error::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            NifHeader::parse(&header_bytes(1, 0, 0, 4)),
            Err(Error::MalformedHeader { .. })
        ));
        assert!(matches!(
            NifHeader::parse(&header_bytes(1, 1, 3, 4)),
            Err(Error::InvalidBlockType { type_index: 3, .. })
        ));
    }

    #[test]
    fn test_block_past_end_of_file() {
        let mut data = header_bytes(1, 1, 0, 16);
        data.truncate(data.len() - 1);
        assert!(matches!(
            NifHeader::parse(&data),
            Err(Error::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_text_and_binary_version_must_agree() {
        let mut data = header_bytes(1, 1, 0, 4);
        let at = data.iter().position(|&b| b == b'\n').unwrap() + 1;
        data[at..at + 4].copy_from_slice(&NifVersion::new(20, 3, 0, 9).0.to_le_bytes());
        assert!(matches!(
            NifHeader::parse(&data),
            Err(Error::MalformedHeader { .. })
        ));
    }
}
