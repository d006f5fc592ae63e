//! Synthetic NIF files for integration tests.
//!
//! Builds byte-exact 20.x files containing `NiMesh` / `NiDataStream`
//! blocks plus arbitrary opaque blocks, and records where each index
//! payload lands so tests can read it back.

#![allow(dead_code)]

/// Type name of a 16-bit vertex-index stream (usage 0, access 1).
pub const INDEX_STREAM_TYPE: &[u8] = b"NiDataStream\x00\x01";

pub const UINT16_1: u32 = 0x0001_0215;
pub const UINT32_1: u32 = 0x0001_0425;
pub const FLOAT32_3: u32 = 0x0003_0435;

pub const TRIANGLES: u32 = 0;
pub const TRI_STRIPS: u32 = 1;

/// One stream entry of a mesh.
pub struct MeshStream {
    pub block: i32,
    /// String-table indices of the component semantics.
    pub semantics: Vec<u32>,
}

pub struct MeshSpec {
    pub name: u32,
    pub primitive: u32,
    pub streams: Vec<MeshStream>,
}

pub struct StreamSpec {
    pub format: u32,
    pub regions: Vec<(u32, u32)>,
    pub payload: Vec<u8>,
}

pub enum BlockSpec {
    Mesh(MeshSpec),
    Stream(StreamSpec),
    Opaque { type_name: Vec<u8>, body: Vec<u8> },
}

/// Builder for a whole file.
pub struct NifBuilder {
    version: (u8, u8, u8, u8),
    strings: Vec<String>,
    blocks: Vec<BlockSpec>,
}

/// A built file and the absolute offset of each data stream's payload,
/// keyed by block index.
pub struct BuiltNif {
    pub bytes: Vec<u8>,
    pub payloads: Vec<(usize, usize)>,
}

impl BuiltNif {
    pub fn payload_offset(&self, block: usize) -> usize {
        self.payloads
            .iter()
            .find(|(b, _)| *b == block)
            .map(|(_, offset)| *offset)
            .expect("block is a data stream")
    }
}

impl Default for NifBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NifBuilder {
    pub fn new() -> Self {
        Self {
            version: (20, 6, 0, 0),
            strings: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn version(mut self, major: u8, minor: u8, patch: u8, internal: u8) -> Self {
        self.version = (major, minor, patch, internal);
        self
    }

    /// Add a string, returning its index.
    pub fn string(&mut self, s: &str) -> u32 {
        if let Some(pos) = self.strings.iter().position(|existing| existing == s) {
            return pos as u32;
        }
        self.strings.push(s.to_string());
        (self.strings.len() - 1) as u32
    }

    /// Add a block, returning its index.
    pub fn block(&mut self, block: BlockSpec) -> i32 {
        self.blocks.push(block);
        (self.blocks.len() - 1) as i32
    }

    pub fn mesh(&mut self, primitive: u32, streams: Vec<MeshStream>) -> i32 {
        let name = self.string("TestMesh");
        self.block(BlockSpec::Mesh(MeshSpec {
            name,
            primitive,
            streams,
        }))
    }

    pub fn stream(&mut self, format: u32, regions: Vec<(u32, u32)>, payload: Vec<u8>) -> i32 {
        self.block(BlockSpec::Stream(StreamSpec {
            format,
            regions,
            payload,
        }))
    }

    pub fn opaque(&mut self, type_name: &[u8], body: Vec<u8>) -> i32 {
        self.block(BlockSpec::Opaque {
            type_name: type_name.to_vec(),
            body,
        })
    }

    pub fn build(&self) -> BuiltNif {
        let (a, b, c, d) = self.version;
        let mut out = Vec::new();
        let line = format!("Gamebryo File Format, Version {a}.{b}.{c}.{d}\n");
        out.extend_from_slice(line.as_bytes());
        put_u32(&mut out, u32::from_be_bytes([a, b, c, d]));
        out.push(1); // little endian
        put_u32(&mut out, 0); // user version
        put_u32(&mut out, self.blocks.len() as u32);

        let mut type_names: Vec<Vec<u8>> = Vec::new();
        let mut type_indices = Vec::new();
        let mut bodies = Vec::new();
        let mut payload_starts = Vec::new();
        for block in &self.blocks {
            let (type_name, body, payload_start) = match block {
                BlockSpec::Mesh(mesh) => (b"NiMesh".to_vec(), mesh_body(mesh), None),
                BlockSpec::Stream(stream) => {
                    let (body, start) = stream_body(stream);
                    (INDEX_STREAM_TYPE.to_vec(), body, Some(start))
                }
                BlockSpec::Opaque { type_name, body } => (type_name.clone(), body.clone(), None),
            };
            let type_index = match type_names.iter().position(|t| *t == type_name) {
                Some(pos) => pos,
                None => {
                    type_names.push(type_name);
                    type_names.len() - 1
                }
            };
            type_indices.push(type_index as u16);
            bodies.push(body);
            payload_starts.push(payload_start);
        }

        put_u16(&mut out, type_names.len() as u16);
        for name in &type_names {
            put_u32(&mut out, name.len() as u32);
            out.extend_from_slice(name);
        }
        for index in &type_indices {
            put_u16(&mut out, *index);
        }
        for body in &bodies {
            put_u32(&mut out, body.len() as u32);
        }

        put_u32(&mut out, self.strings.len() as u32);
        put_u32(
            &mut out,
            self.strings.iter().map(String::len).max().unwrap_or(0) as u32,
        );
        for s in &self.strings {
            put_u32(&mut out, s.len() as u32);
            out.extend_from_slice(s.as_bytes());
        }
        put_u32(&mut out, 0); // groups

        let mut payloads = Vec::new();
        for (index, (body, payload_start)) in bodies.iter().zip(payload_starts).enumerate() {
            if let Some(start) = payload_start {
                payloads.push((index, out.len() + start));
            }
            out.extend_from_slice(body);
        }

        // Footer: one root, block 0
        put_u32(&mut out, 1);
        put_i32(&mut out, 0);

        BuiltNif {
            bytes: out,
            payloads,
        }
    }
}

fn mesh_body(mesh: &MeshSpec) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, mesh.name);
    put_u32(&mut out, 0); // extra data
    put_i32(&mut out, -1); // controller
    put_u16(&mut out, 14); // flags
    out.extend_from_slice(&[0u8; 52]); // transform
    put_u32(&mut out, 0); // properties
    put_i32(&mut out, -1); // collision
    put_u32(&mut out, 0); // materials
    put_i32(&mut out, -1); // active material
    out.push(0); // material needs update
    put_u32(&mut out, mesh.primitive);
    put_u16(&mut out, 1); // submeshes
    out.push(0); // instancing
    out.extend_from_slice(&[0u8; 16]); // bound
    put_u32(&mut out, mesh.streams.len() as u32);
    for stream in &mesh.streams {
        put_i32(&mut out, stream.block);
        out.push(0); // per instance
        put_u16(&mut out, 1);
        put_u16(&mut out, 0); // submesh 0 -> region 0
        put_u32(&mut out, stream.semantics.len() as u32);
        for name in &stream.semantics {
            put_u32(&mut out, *name);
            put_u32(&mut out, 0);
        }
    }
    put_u32(&mut out, 0); // modifiers
    out
}

fn stream_body(stream: &StreamSpec) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    put_u32(&mut out, stream.payload.len() as u32);
    put_u32(&mut out, 0); // cloning behavior
    put_u32(&mut out, stream.regions.len() as u32);
    for (start, count) in &stream.regions {
        put_u32(&mut out, *start);
        put_u32(&mut out, *count);
    }
    put_u32(&mut out, 1);
    put_u32(&mut out, stream.format);
    let payload_start = out.len();
    out.extend_from_slice(&stream.payload);
    out.push(1); // streamable
    (out, payload_start)
}

pub fn u16_indices(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn u32_indices(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn read_u16s(bytes: &[u8], offset: usize, count: usize) -> Vec<u16> {
    bytes[offset..offset + count * 2]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}

pub fn read_u32s(bytes: &[u8], offset: usize, count: usize) -> Vec<u32> {
    bytes[offset..offset + count * 4]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// One mesh with one 16-bit INDEX stream holding `indices`.
pub fn single_mesh_u16(indices: &[u16]) -> (NifBuilder, usize) {
    let mut nif = NifBuilder::new();
    let index = nif.string("INDEX");
    let stream = 1;
    nif.mesh(
        TRIANGLES,
        vec![MeshStream {
            block: stream,
            semantics: vec![index],
        }],
    );
    let count = indices.len() as u32;
    nif.stream(UINT16_1, vec![(0, count)], u16_indices(indices));
    (nif, stream as usize)
}
