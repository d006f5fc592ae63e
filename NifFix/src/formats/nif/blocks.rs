//! Typed block records
//!
//! Blocks are selected by their type name. Only the two types needed to
//! find index data get a typed layout; every other type is an opaque
//! extent that is never read.
//!
//! Field layouts follow the 20.6.0.0 object hierarchy:
//! `NiObjectNET -> NiAVObject -> NiRenderObject -> NiMesh`.

use serde::Serialize;

use super::cursor::NifCursor;
use super::header::BlockHeader;
use super::{NifFile, NifVersion};
use crate::error::{Error, Result, SkipReason};
use crate::winding::IndexWidth;

const NI_MESH: &[u8] = b"NiMesh";
const NI_DATA_STREAM: &[u8] = b"NiDataStream";

/// Translation (3 floats), rotation (3x3 floats) and scale.
const TRANSFORM_SIZE: usize = 4 * (3 + 9 + 1);

/// Bounding sphere: center (3 floats) and radius.
const BOUND_SIZE: usize = 4 * 4;

// =============================================================================
// BLOCK CLASSIFICATION
// =============================================================================

/// How a block type name is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Mesh,
    DataStream(DataStreamTag),
    /// Skipped using its declared size.
    Other,
}

impl BlockKind {
    #[must_use]
    pub fn classify(type_name: &[u8]) -> Self {
        if type_name == NI_MESH {
            BlockKind::Mesh
        } else if let Some(suffix) = type_name.strip_prefix(NI_DATA_STREAM) {
            BlockKind::DataStream(DataStreamTag::from_suffix(suffix))
        } else {
            BlockKind::Other
        }
    }
}

/// Usage and access flags encoded after the `NiDataStream` type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataStreamTag {
    pub usage: Option<DataStreamUsage>,
    pub access: Option<u8>,
}

impl DataStreamTag {
    fn from_suffix(suffix: &[u8]) -> Self {
        Self {
            usage: suffix.first().copied().map(DataStreamUsage::from),
            access: suffix.get(1).copied(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStreamUsage {
    VertexIndex,
    Vertex,
    ShaderConstant,
    User,
    DisplayList,
    Unknown(u8),
}

impl From<u8> for DataStreamUsage {
    fn from(value: u8) -> Self {
        match value {
            0 => DataStreamUsage::VertexIndex,
            1 => DataStreamUsage::Vertex,
            2 => DataStreamUsage::ShaderConstant,
            3 => DataStreamUsage::User,
            4 => DataStreamUsage::DisplayList,
            other => DataStreamUsage::Unknown(other),
        }
    }
}

/// A decoded block.
#[derive(Debug, Clone)]
pub enum Block {
    Mesh(NiMesh),
    DataStream(NiDataStream),
    Unknown { type_name: String, size: usize },
}

impl Block {
    /// Decode a block according to its type.
    pub fn read(file: &NifFile<'_>, block: &BlockHeader) -> Result<Self> {
        match file.header().block_kind(block) {
            BlockKind::Mesh => NiMesh::read(file, block).map(Block::Mesh),
            BlockKind::DataStream(_) => NiDataStream::read(file, block).map(Block::DataStream),
            BlockKind::Other => Ok(Block::Unknown {
                type_name: file.header().type_name(block),
                size: block.size,
            }),
        }
    }
}

/// Run a typed parse over one block's extent.
///
/// Reads past the extent become [`Error::BlockOverrun`]; bytes left over
/// are logged, since every layout here is expected to fill its block.
fn parse_block<T>(
    file: &NifFile<'_>,
    block: &BlockHeader,
    parse: impl FnOnce(&mut NifCursor<'_>, NifVersion) -> Result<T>,
) -> Result<T> {
    let mut cursor = file.block_cursor(block)?;
    let value = parse(&mut cursor, file.version()).map_err(|err| match err {
        Error::TruncatedBuffer { .. } => Error::BlockOverrun {
            block: block.index,
            type_name: file.header().type_name(block),
            size: block.size,
        },
        other => other,
    })?;
    if cursor.remaining() > 0 {
        tracing::warn!(
            "{} block {} has {} unparsed trailing bytes",
            file.header().type_name(block),
            block.index,
            cursor.remaining()
        );
    }
    Ok(value)
}

fn read_refs(cursor: &mut NifCursor<'_>) -> Result<Vec<i32>> {
    let count = cursor.read_count(4)?;
    (0..count).map(|_| cursor.read_i32()).collect()
}

// =============================================================================
// NiMesh
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshPrimitiveType {
    Triangles,
    TriStrips,
    Lines,
    LineStrips,
    Quads,
    Points,
    Other(u32),
}

impl MeshPrimitiveType {
    #[must_use]
    pub fn raw(self) -> u32 {
        match self {
            MeshPrimitiveType::Triangles => 0,
            MeshPrimitiveType::TriStrips => 1,
            MeshPrimitiveType::Lines => 2,
            MeshPrimitiveType::LineStrips => 3,
            MeshPrimitiveType::Quads => 4,
            MeshPrimitiveType::Points => 5,
            MeshPrimitiveType::Other(raw) => raw,
        }
    }
}

impl From<u32> for MeshPrimitiveType {
    fn from(value: u32) -> Self {
        match value {
            0 => MeshPrimitiveType::Triangles,
            1 => MeshPrimitiveType::TriStrips,
            2 => MeshPrimitiveType::Lines,
            3 => MeshPrimitiveType::LineStrips,
            4 => MeshPrimitiveType::Quads,
            5 => MeshPrimitiveType::Points,
            other => MeshPrimitiveType::Other(other),
        }
    }
}

/// A component semantic: string-table name plus semantic index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Semantic {
    pub name: u32,
    pub index: u32,
}

/// One entry of a mesh's data stream list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshStreamRef {
    pub stream: i32,
    pub per_instance: bool,
    pub submesh_to_region: Vec<u16>,
    pub semantics: Vec<Semantic>,
}

/// The parts of an `NiMesh` block needed to find its streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NiMesh {
    pub name: u32,
    pub primitive_type: MeshPrimitiveType,
    pub num_submeshes: u16,
    pub instancing_enabled: bool,
    pub streams: Vec<MeshStreamRef>,
    pub modifiers: Vec<i32>,
}

impl NiMesh {
    pub fn read(file: &NifFile<'_>, block: &BlockHeader) -> Result<Self> {
        let mesh = parse_block(file, block, Self::parse)?;

        // Validate string references up front so later lookups cannot fail
        file.string(block.index, mesh.name)?;
        for stream in &mesh.streams {
            for semantic in &stream.semantics {
                file.string(block.index, semantic.name)?;
            }
        }
        Ok(mesh)
    }

    fn parse(cursor: &mut NifCursor<'_>, version: NifVersion) -> Result<Self> {
        // NiObjectNET
        let name = cursor.read_u32()?;
        let _extra_data = read_refs(cursor)?;
        let _controller = cursor.read_i32()?;

        // NiAVObject
        let _flags = cursor.read_u16()?;
        cursor.skip(TRANSFORM_SIZE)?;
        let _properties = read_refs(cursor)?;
        if version >= NifVersion::V10_0_1_0 {
            let _collision = cursor.read_i32()?;
        }

        // NiRenderObject material data
        if version >= NifVersion::V20_2_0_5 {
            let num_materials = cursor.read_count(8)?;
            cursor.skip(num_materials * 4)?; // material names
            cursor.skip(num_materials * 4)?; // material extra data
            let _active_material = cursor.read_i32()?;
        }
        if version >= NifVersion::V20_2_0_7 {
            let _material_needs_update = cursor.read_bool()?;
        }

        // NiMesh
        let primitive_type = MeshPrimitiveType::from(cursor.read_u32()?);
        let num_submeshes = cursor.read_u16()?;
        let instancing_enabled = cursor.read_bool()?;
        cursor.skip(BOUND_SIZE)?;

        let num_streams = cursor.read_count(4)?;
        let mut streams = Vec::with_capacity(num_streams);
        for _ in 0..num_streams {
            streams.push(Self::parse_stream_ref(cursor)?);
        }
        let modifiers = read_refs(cursor)?;

        Ok(Self {
            name,
            primitive_type,
            num_submeshes,
            instancing_enabled,
            streams,
            modifiers,
        })
    }

    fn parse_stream_ref(cursor: &mut NifCursor<'_>) -> Result<MeshStreamRef> {
        let stream = cursor.read_i32()?;
        let per_instance = cursor.read_bool()?;
        let num_regions = cursor.read_u16()?;
        let submesh_to_region = (0..num_regions)
            .map(|_| cursor.read_u16())
            .collect::<Result<Vec<_>>>()?;
        let num_components = cursor.read_count(8)?;
        let semantics = (0..num_components)
            .map(|_| {
                Ok(Semantic {
                    name: cursor.read_u32()?,
                    index: cursor.read_u32()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MeshStreamRef {
            stream,
            per_instance,
            submesh_to_region,
            semantics,
        })
    }
}

// =============================================================================
// NiDataStream
// =============================================================================

/// Packed component format: `(count << 16) | (size << 8) | type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ComponentFormat(pub u32);

impl ComponentFormat {
    pub const INT16_1: ComponentFormat = ComponentFormat(0x00010211);
    pub const UINT16_1: ComponentFormat = ComponentFormat(0x00010215);
    pub const INT32_1: ComponentFormat = ComponentFormat(0x00010421);
    pub const UINT32_1: ComponentFormat = ComponentFormat(0x00010425);
    pub const FLOAT32_3: ComponentFormat = ComponentFormat(0x00030435);

    /// Values per element.
    #[must_use]
    pub fn count(self) -> usize {
        ((self.0 >> 16) & 0xFF) as usize
    }

    /// Bytes per value.
    #[must_use]
    pub fn size(self) -> usize {
        ((self.0 >> 8) & 0xFF) as usize
    }

    /// Bytes per element.
    #[must_use]
    pub fn stride(self) -> usize {
        self.count() * self.size()
    }

    /// Whether the value type is a plain (non-normalized) integer.
    #[must_use]
    pub fn is_integer(self) -> bool {
        // INT8 0x01..=0x04, UINT8 0x05..=0x08, INT16 0x11..=0x14,
        // UINT16 0x15..=0x18, INT32 0x21..=0x24, UINT32 0x25..=0x28
        matches!(self.0 & 0xFF, 0x01..=0x08 | 0x11..=0x18 | 0x21..=0x28)
    }
}

/// A contiguous run of elements addressed by a submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub start: u32,
    pub count: u32,
}

/// The header of an `NiDataStream` block and the location of its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NiDataStream {
    pub tag: DataStreamTag,
    pub stream_size: usize,
    pub cloning_behavior: u32,
    pub regions: Vec<Region>,
    pub components: Vec<ComponentFormat>,
    /// Absolute offset of the first payload byte.
    pub payload_offset: usize,
    pub streamable: bool,
}

impl NiDataStream {
    pub fn read(file: &NifFile<'_>, block: &BlockHeader) -> Result<Self> {
        let tag = match file.header().block_kind(block) {
            BlockKind::DataStream(tag) => tag,
            _ => DataStreamTag {
                usage: None,
                access: None,
            },
        };
        parse_block(file, block, |cursor, _version| Self::parse(cursor, tag))
    }

    fn parse(cursor: &mut NifCursor<'_>, tag: DataStreamTag) -> Result<Self> {
        let stream_size = cursor.read_u32()? as usize;
        let cloning_behavior = cursor.read_u32()?;

        let num_regions = cursor.read_count(8)?;
        let mut regions = Vec::with_capacity(num_regions);
        for _ in 0..num_regions {
            regions.push(Region {
                start: cursor.read_u32()?,
                count: cursor.read_u32()?,
            });
        }

        let num_components = cursor.read_count(4)?;
        let mut components = Vec::with_capacity(num_components);
        for _ in 0..num_components {
            components.push(ComponentFormat(cursor.read_u32()?));
        }

        // The raw array follows the last component format directly, no padding
        let payload_offset = cursor.absolute_position();
        cursor.skip(stream_size)?;
        let streamable = cursor.read_bool()?;

        Ok(Self {
            tag,
            stream_size,
            cloning_behavior,
            regions,
            components,
            payload_offset,
            streamable,
        })
    }

    /// Width of one index, if this stream holds a single integer index
    /// component of 2 or 4 bytes.
    pub fn index_width(&self) -> std::result::Result<IndexWidth, SkipReason> {
        let [format] = self.components.as_slice() else {
            return Err(SkipReason::UnsupportedComponentFormat {
                format: self.components.first().map_or(0, |f| f.0),
                components: self.components.len(),
            });
        };
        if format.count() != 1 || !format.is_integer() {
            return Err(SkipReason::UnsupportedComponentFormat {
                format: format.0,
                components: 1,
            });
        }
        IndexWidth::from_bytes(format.size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_block_types() {
        assert_eq!(BlockKind::classify(b"NiMesh"), BlockKind::Mesh);
        assert_eq!(BlockKind::classify(b"NiMeshModifier"), BlockKind::Other);
        assert_eq!(BlockKind::classify(b"NiNode"), BlockKind::Other);
        assert_eq!(
            BlockKind::classify(b"NiDataStream\x00\x05"),
            BlockKind::DataStream(DataStreamTag {
                usage: Some(DataStreamUsage::VertexIndex),
                access: Some(5),
            })
        );
        assert_eq!(
            BlockKind::classify(b"NiDataStream"),
            BlockKind::DataStream(DataStreamTag {
                usage: None,
                access: None,
            })
        );
    }

    #[test]
    fn test_component_format_fields() {
        let format = ComponentFormat::UINT16_1;
        assert_eq!((format.count(), format.size(), format.stride()), (1, 2, 2));
        assert!(format.is_integer());

        let position = ComponentFormat::FLOAT32_3;
        assert_eq!((position.count(), position.size(), position.stride()), (3, 4, 12));
        assert!(!position.is_integer());
    }

    fn stream_with(components: Vec<ComponentFormat>) -> NiDataStream {
        NiDataStream {
            tag: DataStreamTag {
                usage: Some(DataStreamUsage::VertexIndex),
                access: Some(1),
            },
            stream_size: 12,
            cloning_behavior: 0,
            regions: Vec::new(),
            components,
            payload_offset: 0,
            streamable: true,
        }
    }

    #[test]
    fn test_index_width() {
        assert_eq!(
            stream_with(vec![ComponentFormat::UINT16_1]).index_width(),
            Ok(IndexWidth::U16)
        );
        assert_eq!(
            stream_with(vec![ComponentFormat::INT32_1]).index_width(),
            Ok(IndexWidth::U32)
        );
        // UINT8_1
        assert_eq!(
            stream_with(vec![ComponentFormat(0x00010105)]).index_width(),
            Err(SkipReason::UnsupportedElementWidth { width: 1 })
        );
        assert!(matches!(
            stream_with(vec![ComponentFormat::FLOAT32_3]).index_width(),
            Err(SkipReason::UnsupportedComponentFormat { .. })
        ));
        assert!(matches!(
            stream_with(Vec::new()).index_width(),
            Err(SkipReason::UnsupportedComponentFormat { components: 0, .. })
        ));
    }
}
