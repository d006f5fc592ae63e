//! Triangle winding reversal
//!
//! An index stream is a flat array of 16- or 32-bit little-endian indices,
//! three per triangle. Reversing the winding of `(i0, i1, i2)` writes
//! `(i2, i1, i0)`: the face normal flips, the index values and `i1` stay
//! where they are, and applying the swap twice restores the input.
//!
//! The width travels with the descriptor as an [`IndexWidth`], so a stream
//! can only ever be read at the width its format declared.

use std::fmt;
use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::{Error, Result, SkipReason};

/// Width of a single index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }

    /// # Errors
    ///
    /// Returns [`SkipReason::UnsupportedElementWidth`] for anything but 2 or 4.
    pub fn from_bytes(width: usize) -> std::result::Result<Self, SkipReason> {
        match width {
            2 => Ok(IndexWidth::U16),
            4 => Ok(IndexWidth::U32),
            width => Err(SkipReason::UnsupportedElementWidth { width }),
        }
    }

    fn read(self, bytes: &[u8]) -> u32 {
        match self {
            IndexWidth::U16 => u32::from(LittleEndian::read_u16(bytes)),
            IndexWidth::U32 => LittleEndian::read_u32(bytes),
        }
    }
}

impl fmt::Display for IndexWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bytes() * 8)
    }
}

/// Location of a triangle list inside a file buffer.
///
/// Only constructible with an element count divisible by three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndexStreamDescriptor {
    offset: usize,
    width: IndexWidth,
    element_count: usize,
}

impl IndexStreamDescriptor {
    /// # Errors
    ///
    /// Returns [`SkipReason::NonTriangleIndexCount`] if `element_count` is
    /// not a multiple of three.
    pub fn new(
        offset: usize,
        width: IndexWidth,
        element_count: usize,
    ) -> std::result::Result<Self, SkipReason> {
        if element_count % 3 != 0 {
            return Err(SkipReason::NonTriangleIndexCount {
                count: element_count,
            });
        }
        Ok(Self {
            offset,
            width,
            element_count,
        })
    }

    /// Absolute offset of the first index.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn width(&self) -> IndexWidth {
        self.width
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.element_count / 3
    }

    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.element_count * self.width.bytes()
    }

    /// Byte range covered by this stream.
    #[must_use]
    pub fn byte_range(&self) -> Range<usize> {
        self.offset..self.offset + self.byte_len()
    }

    fn bounds(&self, len: usize) -> Result<Range<usize>> {
        let range = self.byte_range();
        if range.end > len {
            return Err(Error::TruncatedBuffer {
                offset: self.offset,
                need: self.byte_len(),
                len,
            });
        }
        Ok(range)
    }
}

/// One triangle, indices in stream order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Triangle {
    pub i0: u32,
    pub i1: u32,
    pub i2: u32,
}

impl Triangle {
    #[must_use]
    pub const fn new(i0: u32, i1: u32, i2: u32) -> Self {
        Self { i0, i1, i2 }
    }

    /// The same triangle with opposite winding.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            i0: self.i2,
            i1: self.i1,
            i2: self.i0,
        }
    }
}

impl From<(u32, u32, u32)> for Triangle {
    fn from((i0, i1, i2): (u32, u32, u32)) -> Self {
        Self::new(i0, i1, i2)
    }
}

/// Decode the triangles addressed by `stream`.
///
/// # Errors
///
/// Returns [`Error::TruncatedBuffer`] if the stream extends past `buf`.
pub fn read_triangles(buf: &[u8], stream: &IndexStreamDescriptor) -> Result<Vec<Triangle>> {
    let width = stream.width();
    let w = width.bytes();
    let region = &buf[stream.bounds(buf.len())?];
    Ok(region
        .chunks_exact(3 * w)
        .map(|tri| {
            Triangle::new(
                width.read(&tri[..w]),
                width.read(&tri[w..2 * w]),
                width.read(&tri[2 * w..]),
            )
        })
        .collect())
}

/// Reverse the winding of every triangle addressed by `stream`, in place.
///
/// Bytes outside [`IndexStreamDescriptor::byte_range`] are never touched,
/// and nothing is touched at all if the range does not fit in `buf`.
///
/// # Returns
///
/// The number of triangles rewritten.
///
/// # Errors
///
/// Returns [`Error::TruncatedBuffer`] if the stream extends past `buf`.
pub fn reverse_winding(buf: &mut [u8], stream: &IndexStreamDescriptor) -> Result<usize> {
    let w = stream.width().bytes();
    let range = stream.bounds(buf.len())?;
    for tri in buf[range].chunks_exact_mut(3 * w) {
        let (first, rest) = tri.split_at_mut(w);
        first.swap_with_slice(&mut rest[w..]);
    }
    Ok(stream.triangle_count())
}
