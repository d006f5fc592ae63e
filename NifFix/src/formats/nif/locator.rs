//! Resolve `NiMesh` stream references to index-stream descriptors

use std::collections::HashSet;

use serde::Serialize;

use super::blocks::{BlockKind, MeshPrimitiveType, MeshStreamRef, NiDataStream, NiMesh, Region};
use super::header::BlockHeader;
use super::{INDEX_SEMANTIC, NifFile};
use crate::error::{Result, SkipReason};
use crate::winding::IndexStreamDescriptor;

/// An index region ready for mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocatedStream {
    /// Block index of the owning `NiMesh`.
    pub mesh: usize,
    /// Block index of the `NiDataStream`.
    pub stream: usize,
    /// Region number within the stream.
    pub region: usize,
    pub descriptor: IndexStreamDescriptor,
}

/// An index stream (or region) that was found but left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStream {
    pub mesh: usize,
    pub stream: usize,
    /// `None` when the whole stream was skipped.
    pub region: Option<usize>,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Result of scanning one file for index streams.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamScan {
    pub located: Vec<LocatedStream>,
    pub skipped: Vec<SkippedStream>,
}

impl StreamScan {
    /// No region is eligible for mutation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.located.is_empty()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.located
            .iter()
            .map(|s| s.descriptor.triangle_count())
            .sum()
    }

    fn skip(&mut self, mesh: usize, stream: usize, region: Option<usize>, reason: SkipReason) {
        tracing::warn!(
            "Skipping INDEX stream {stream} of mesh {mesh}{}: {reason}",
            region.map(|r| format!(" region {r}")).unwrap_or_default()
        );
        self.skipped.push(SkippedStream {
            mesh,
            stream,
            region,
            reason,
        });
    }
}

/// Find every triangle-index region referenced by an `NiMesh` in `file`.
///
/// Blocks are visited in file order. A data stream shared by several meshes
/// is reported once, under the first mesh that references it.
///
/// # Errors
///
/// Fails only on structural problems: a mesh or referenced data stream
/// that overruns its block, or a reference outside the block or string
/// table. Streams that merely cannot be fixed are recorded in
/// [`StreamScan::skipped`].
pub fn locate_index_streams(file: &NifFile<'_>) -> Result<StreamScan> {
    let mut scan = StreamScan::default();

    if !file.header().strings.iter().any(|s| s == INDEX_SEMANTIC) {
        tracing::debug!("No '{INDEX_SEMANTIC}' string in string table");
        return Ok(scan);
    }

    let mut seen = HashSet::new();
    for block in &file.header().blocks {
        if file.header().block_kind(block) != BlockKind::Mesh {
            continue;
        }
        let mesh = NiMesh::read(file, block)?;
        tracing::debug!(
            "Mesh {}: {:?}, {} streams",
            block.index,
            mesh.primitive_type,
            mesh.streams.len()
        );

        for stream_ref in &mesh.streams {
            if !is_index_stream(file, block, stream_ref)? {
                continue;
            }
            let Some(target) = file.resolve_ref(block.index, stream_ref.stream)? else {
                continue;
            };
            // A stream is only claimed by a mesh that can actually fix it
            if mesh.primitive_type != MeshPrimitiveType::Triangles {
                scan.skip(
                    block.index,
                    target.index,
                    None,
                    SkipReason::NotTriangleList {
                        primitive: mesh.primitive_type.raw(),
                    },
                );
                continue;
            }
            if !seen.insert(target.index) {
                tracing::debug!("Stream {} already handled", target.index);
                continue;
            }
            locate_in_stream(file, block, target, &mut scan)?;
        }
    }

    tracing::debug!(
        "Located {} index regions ({} triangles), skipped {}",
        scan.located.len(),
        scan.triangle_count(),
        scan.skipped.len()
    );
    Ok(scan)
}

fn is_index_stream(
    file: &NifFile<'_>,
    mesh: &BlockHeader,
    stream_ref: &MeshStreamRef,
) -> Result<bool> {
    for semantic in &stream_ref.semantics {
        if file.string(mesh.index, semantic.name)? == Some(INDEX_SEMANTIC) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn locate_in_stream(
    file: &NifFile<'_>,
    mesh_block: &BlockHeader,
    target: &BlockHeader,
    scan: &mut StreamScan,
) -> Result<()> {
    let (mesh_index, stream_index) = (mesh_block.index, target.index);

    if !matches!(file.header().block_kind(target), BlockKind::DataStream(_)) {
        scan.skip(
            mesh_index,
            stream_index,
            None,
            SkipReason::NotADataStream {
                type_name: file.header().type_name(target),
            },
        );
        return Ok(());
    }

    let stream = NiDataStream::read(file, target)?;
    let width = match stream.index_width() {
        Ok(width) => width,
        Err(reason) => {
            scan.skip(mesh_index, stream_index, None, reason);
            return Ok(());
        }
    };
    let capacity = stream.stream_size / width.bytes();

    let regions = if stream.regions.is_empty() {
        vec![Region {
            start: 0,
            count: u32::try_from(capacity).unwrap_or(u32::MAX),
        }]
    } else {
        stream.regions.clone()
    };

    let mut order: Vec<usize> = (0..regions.len()).collect();
    order.sort_by_key(|&i| (regions[i].start, regions[i].count));

    let mut covered_end = 0usize;
    let mut previous: Option<Region> = None;
    for region_index in order {
        let region = regions[region_index];
        let (start, count) = (region.start as usize, region.count as usize);

        if count == 0 {
            continue;
        }
        if start.saturating_add(count) > capacity {
            scan.skip(
                mesh_index,
                stream_index,
                Some(region_index),
                SkipReason::RegionOutOfBounds {
                    start,
                    count,
                    capacity,
                },
            );
            continue;
        }
        if previous == Some(region) {
            tracing::debug!(
                "Stream {stream_index} region {region_index} duplicates a previous region"
            );
            continue;
        }
        if start < covered_end {
            scan.skip(
                mesh_index,
                stream_index,
                Some(region_index),
                SkipReason::OverlappingRegion { start, count },
            );
            continue;
        }

        let offset = stream.payload_offset + start * width.bytes();
        match IndexStreamDescriptor::new(offset, width, count) {
            Ok(descriptor) => {
                tracing::debug!(
                    "Mesh {mesh_index} -> INDEX stream {stream_index} region {region_index}: {} {width} triangles at 0x{offset:x}",
                    descriptor.triangle_count()
                );
                scan.located.push(LocatedStream {
                    mesh: mesh_index,
                    stream: stream_index,
                    region: region_index,
                    descriptor,
                });
                covered_end = start + count;
                previous = Some(region);
            }
            Err(reason) => scan.skip(mesh_index, stream_index, Some(region_index), reason),
        }
    }
    Ok(())
}
