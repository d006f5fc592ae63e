//! Bounds-checked little-endian reader over a NIF byte buffer

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Read cursor over a byte slice. All reads are little-endian.
///
/// A cursor may cover a window of a larger file (a single block); `base`
/// is the absolute offset of the window so errors and offsets stay
/// file-relative.
#[derive(Debug, Clone)]
pub struct NifCursor<'a> {
    data: &'a [u8],
    base: usize,
    pos: usize,
}

impl<'a> NifCursor<'a> {
    /// Cursor over a whole file.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, base: 0, pos: 0 }
    }

    /// Cursor over `data[start..start + len]`, reporting absolute offsets.
    pub fn window(data: &'a [u8], start: usize, len: usize) -> Result<Self> {
        let end = start.checked_add(len).ok_or(Error::TruncatedBuffer {
            offset: start,
            need: len,
            len: data.len(),
        })?;
        let slice = data.get(start..end).ok_or(Error::TruncatedBuffer {
            offset: start,
            need: len,
            len: data.len(),
        })?;
        Ok(Self {
            data: slice,
            base: start,
            pos: 0,
        })
    }

    /// Position relative to the start of this cursor's window.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute position in the file.
    #[must_use]
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    /// Bytes left in the window.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read a slice of `n` bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// NIF `bool` (one byte since 4.1.0.1).
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    /// Read a `u32` count and convert it to a length.
    ///
    /// Counts larger than the remaining bytes can never be satisfied, so
    /// they are rejected before any allocation is sized from them.
    pub fn read_count(&mut self, min_item_size: usize) -> Result<usize> {
        let offset = self.absolute_position();
        let count = self.read_u32()? as usize;
        let need = count.saturating_mul(min_item_size.max(1));
        if need > self.remaining() {
            return Err(Error::TruncatedBuffer {
                offset,
                need,
                len: self.base + self.data.len(),
            });
        }
        Ok(count)
    }

    /// Read a length-prefixed (`u32`) string. Trailing NULs are dropped and
    /// invalid UTF-8 is replaced rather than rejected.
    pub fn read_sized_string(&mut self) -> Result<String> {
        let len = self.read_count(1)?;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes)
            .trim_end_matches('\0')
            .to_string())
    }

    /// Read a length-prefixed string, keeping every byte (block type names
    /// such as `NiDataStream\x01\x05` embed binary suffixes).
    pub fn read_sized_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_count(1)?;
        self.read_bytes(len)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::TruncatedBuffer {
                offset: self.absolute_position(),
                need: n,
                len: self.base + self.data.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0xFF];
        let mut cursor = NifCursor::new(&data);
        assert_eq!(cursor.read_u16().unwrap(), 0x0201);
        assert_eq!(cursor.read_u32().unwrap(), 0x0605_0403);
        assert!(cursor.read_bool().unwrap());
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_is_truncated() {
        let data = [0u8; 3];
        let mut cursor = NifCursor::new(&data);
        cursor.skip(2).unwrap();
        match cursor.read_u16() {
            Err(Error::TruncatedBuffer { offset, need, len }) => {
                assert_eq!((offset, need, len), (2, 2, 3));
            }
            other => panic!("expected TruncatedBuffer, got {other:?}"),
        }
        // A failed read does not move the cursor
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_window_reports_absolute_offsets() {
        let data = [0u8; 16];
        let mut cursor = NifCursor::window(&data, 10, 4).unwrap();
        cursor.skip(4).unwrap();
        assert_eq!(cursor.absolute_position(), 14);
        assert!(matches!(
            cursor.read_u8(),
            Err(Error::TruncatedBuffer { offset: 14, .. })
        ));
        assert!(NifCursor::window(&data, 10, 7).is_err());
    }

    #[test]
    fn test_oversized_count_is_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&1000u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        let mut cursor = NifCursor::new(&data);
        assert!(cursor.read_count(4).is_err());
    }

    #[test]
    fn test_sized_string_trims_nul() {
        let mut data = Vec::new();
        data.extend_from_slice(&6u32.to_le_bytes());
        data.extend_from_slice(b"NiMesh");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(b"AB\0");
        let mut cursor = NifCursor::new(&data);
        assert_eq!(cursor.read_sized_string().unwrap(), "NiMesh");
        assert_eq!(cursor.read_sized_string().unwrap(), "AB");
    }
}
