//! Read-only NIF summaries
//!
//! Reports what the fixer would see in a file without changing anything.
//! Headers of unsupported 20.x versions are still summarized; stream
//! location only runs on supported files.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::formats::nif::{
    Block, BlockHeader, LocatedStream, NifFile, NifHeader, NifVersion, SkippedStream,
    locate_index_streams,
};
use crate::winding::{Triangle, read_triangles};

/// One row of the block listing.
#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub index: usize,
    pub type_name: String,
    pub offset: usize,
    pub size: usize,
    /// Short description of typed blocks, or the decode error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// First triangle of a located region and what fixing would turn it into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindingPreview {
    pub stream: usize,
    pub region: usize,
    pub current: Triangle,
    pub fixed: Triangle,
}

#[derive(Debug, Clone, Serialize)]
pub struct NifSummary {
    pub header_line: String,
    pub version: NifVersion,
    pub user_version: u32,
    pub supported: bool,
    pub file_size: usize,
    pub block_count: usize,
    pub string_count: usize,
    pub mesh_count: usize,
    pub data_stream_count: usize,
    /// Block type name -> number of blocks.
    pub block_types: BTreeMap<String, usize>,
    pub blocks: Vec<BlockSummary>,
    pub located: Vec<LocatedStream>,
    pub skipped: Vec<SkippedStream>,
    pub previews: Vec<WindingPreview>,
}

/// Summarize a NIF file on disk.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the file cannot be read, and the same
/// header errors as [`inspect_nif_bytes`].
pub fn inspect_nif(path: &Path) -> Result<NifSummary> {
    let data = std::fs::read(path)?;
    inspect_nif_bytes(&data)
}

/// Summarize NIF bytes.
///
/// # Errors
///
/// Returns an error if the header or block table cannot be parsed, or if
/// a supported file is structurally corrupt.
pub fn inspect_nif_bytes(data: &[u8]) -> Result<NifSummary> {
    let header = NifHeader::parse(data)?;
    let (mesh_count, data_stream_count) = header.census();

    let mut block_types = BTreeMap::new();
    for block in &header.blocks {
        *block_types.entry(header.type_name(block)).or_insert(0) += 1;
    }

    let mut summary = NifSummary {
        header_line: header.header_line.clone(),
        version: header.version,
        user_version: header.user_version,
        supported: header.version.is_supported(),
        file_size: data.len(),
        block_count: header.blocks.len(),
        string_count: header.strings.len(),
        mesh_count,
        data_stream_count,
        block_types,
        blocks: Vec::new(),
        located: Vec::new(),
        skipped: Vec::new(),
        previews: Vec::new(),
    };

    if !summary.supported {
        summary.blocks = header
            .blocks
            .iter()
            .map(|block| BlockSummary {
                index: block.index,
                type_name: header.type_name(block),
                offset: block.offset,
                size: block.size,
                detail: None,
            })
            .collect();
        return Ok(summary);
    }

    let file = NifFile::from_header(data, header)?;
    summary.blocks = file
        .header()
        .blocks
        .iter()
        .map(|block| BlockSummary {
            index: block.index,
            type_name: file.header().type_name(block),
            offset: block.offset,
            size: block.size,
            detail: describe_block(&file, block),
        })
        .collect();

    let scan = locate_index_streams(&file)?;
    for located in &scan.located {
        let triangles = read_triangles(data, &located.descriptor)?;
        if let Some(&current) = triangles.first() {
            summary.previews.push(WindingPreview {
                stream: located.stream,
                region: located.region,
                current,
                fixed: current.reversed(),
            });
        }
    }
    summary.located = scan.located;
    summary.skipped = scan.skipped;
    Ok(summary)
}

fn describe_block(file: &NifFile<'_>, block: &BlockHeader) -> Option<String> {
    match Block::read(file, block) {
        Ok(Block::Mesh(mesh)) => {
            let name = file
                .string(block.index, mesh.name)
                .ok()
                .flatten()
                .unwrap_or("<unnamed>");
            Some(format!(
                "'{name}', {:?}, {} streams, {} submeshes",
                mesh.primitive_type,
                mesh.streams.len(),
                mesh.num_submeshes
            ))
        }
        Ok(Block::DataStream(stream)) => Some(format!(
            "{:?}, {} bytes, {} regions, {} components at 0x{:x}",
            stream.tag.usage,
            stream.stream_size,
            stream.regions.len(),
            stream.components.len(),
            stream.payload_offset
        )),
        Ok(Block::Unknown { .. }) => None,
        Err(e) => Some(format!("error: {e}")),
    }
}
