//! Bounds-checked binary reading over an in-memory buffer.
//!
//! [`ByteCursor`] is the only way the decoder touches raw bytes. Every read
//! either returns exactly the requested bytes or fails with
//! [`Error::UnexpectedEnd`]; every seek either lands inside the buffer or
//! fails with [`Error::InvalidOffset`].

use crate::common::error::{Error, Result};
use zerocopy::{F32, FromBytes, I16, I32, LE, U16, U32};

/// Little-endian reader with a movable position.
///
/// A cursor may be a window onto a larger buffer (see [`ByteCursor::sub_cursor`]);
/// error offsets are always reported relative to the outermost buffer so they
/// point at the right place in the file.
///
/// # Examples
///
/// ```
/// use emf_raster::common::binary::ByteCursor;
/// let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
/// let mut cursor = ByteCursor::new(&data);
/// assert_eq!(cursor.read_u16().unwrap(), 0x1234);
/// assert_eq!(cursor.read_u32().unwrap(), 0x12345678);
/// assert!(cursor.read_u8().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Offset of `data[0]` inside the outermost buffer
    base: usize,
}

macro_rules! read_le {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $wire:ty) => {
        $(#[$meta])*
        #[inline]
        pub fn $name(&mut self) -> Result<$ty> {
            Ok(self.read_struct::<$wire>()?.get())
        }
    };
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Position relative to the start of this cursor's buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Position relative to the start of the outermost buffer.
    #[inline]
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    /// Total length of this cursor's buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the position and the end of the buffer.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether every byte has been consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn unexpected_end(&self, needed: usize) -> Error {
        Error::UnexpectedEnd {
            offset: self.absolute_position(),
            needed,
            available: self.remaining(),
        }
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.unexpected_end(n));
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read a fixed-size structure laid out exactly as on disk.
    ///
    /// Structures are `#[repr(C)]` with little-endian fields; the copy makes
    /// the read independent of the buffer's alignment.
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEnd {
            offset: self.absolute_position() - size,
            needed: size,
            available: bytes.len(),
        })
    }

    /// Read `count` consecutive fixed-size structures.
    pub fn read_array<T: FromBytes>(&mut self, count: usize) -> Result<Vec<T>> {
        let Some(total) = count.checked_mul(std::mem::size_of::<T>()) else {
            return Err(self.unexpected_end(usize::MAX));
        };
        if total > self.remaining() {
            return Err(self.unexpected_end(total));
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_struct::<T>()?);
        }
        Ok(items)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    read_le!(
        /// Read a little-endian u16.
        read_u16, u16, U16<LE>
    );
    read_le!(
        /// Read a little-endian i16.
        read_i16, i16, I16<LE>
    );
    read_le!(
        /// Read a little-endian u32.
        read_u32, u32, U32<LE>
    );
    read_le!(
        /// Read a little-endian i32.
        read_i32, i32, I32<LE>
    );
    read_le!(
        /// Read a little-endian IEEE 754 single.
        read_f32, f32, F32<LE>
    );

    /// Move the position by `delta` bytes in either direction.
    ///
    /// Landing exactly on the end of the buffer is allowed; anything before
    /// the start or past the end is rejected and the position is unchanged.
    pub fn seek_relative(&mut self, delta: i64) -> Result<()> {
        let target = self.pos as i64 + delta;
        if target < 0 || target as usize > self.data.len() {
            return Err(Error::InvalidOffset {
                from: self.absolute_position(),
                delta,
                len: self.base + self.data.len(),
            });
        }
        self.pos = target as usize;
        Ok(())
    }

    /// Move to an absolute position within this cursor's buffer.
    pub fn seek_to(&mut self, position: usize) -> Result<()> {
        self.seek_relative(position as i64 - self.pos as i64)
    }

    /// A cursor over `len` bytes starting at `start` (relative to this buffer).
    ///
    /// Fails with [`Error::UnexpectedEnd`] when the window does not fit.
    pub fn sub_cursor(&self, start: usize, len: usize) -> Result<ByteCursor<'a>> {
        let end = start.checked_add(len);
        match end {
            Some(end) if end <= self.data.len() => Ok(ByteCursor {
                data: &self.data[start..end],
                pos: 0,
                base: self.base + start,
            }),
            _ => Err(Error::UnexpectedEnd {
                offset: self.base + start,
                needed: len,
                available: self.data.len().saturating_sub(start),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use zerocopy::FromBytes;

    #[derive(Debug, FromBytes)]
    #[repr(C)]
    struct Pair {
        a: u32,
        b: i32,
    }

    #[test]
    fn test_scalar_reads() {
        let data = [0xFF, 0xFF, 0x00, 0x00, 0x80, 0x3F, 0x2A];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_i16().unwrap(), -1);
        assert_eq!(cursor.read_f32().unwrap(), 1.0);
        assert_eq!(cursor.read_u8().unwrap(), 42);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_struct_read() {
        let data = [1, 0, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF];
        let mut cursor = ByteCursor::new(&data);
        let pair: Pair = cursor.read_struct().unwrap();
        assert_eq!(pair.a, 1);
        assert_eq!(pair.b, -2);
    }

    #[test]
    fn test_short_read_reports_position() {
        let data = [0u8; 6];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u32().unwrap();
        match cursor.read_u32() {
            Err(Error::UnexpectedEnd {
                offset,
                needed,
                available,
            }) => {
                assert_eq!((offset, needed, available), (4, 4, 2));
            },
            other => panic!("expected UnexpectedEnd, got {other:?}"),
        }
        // A failed read does not move the cursor
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_seek_bounds() {
        let data = [0u8; 8];
        let mut cursor = ByteCursor::new(&data);
        cursor.seek_relative(8).unwrap();
        assert!(cursor.is_exhausted());
        cursor.seek_relative(-3).unwrap();
        assert_eq!(cursor.position(), 5);

        assert!(matches!(
            cursor.seek_relative(-6),
            Err(Error::InvalidOffset { .. })
        ));
        assert!(matches!(
            cursor.seek_relative(4),
            Err(Error::InvalidOffset { .. })
        ));
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn test_sub_cursor_reports_absolute_offsets() {
        let data = [0u8; 16];
        let outer = ByteCursor::new(&data);
        let mut inner = outer.sub_cursor(10, 4).unwrap();
        inner.read_u16().unwrap();
        match inner.read_u32() {
            Err(Error::UnexpectedEnd { offset, .. }) => assert_eq!(offset, 12),
            other => panic!("expected UnexpectedEnd, got {other:?}"),
        }
        assert!(matches!(
            outer.sub_cursor(12, 8),
            Err(Error::UnexpectedEnd { .. })
        ));
        assert!(outer.sub_cursor(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_read_array() {
        let data = [1, 0, 2, 0, 3, 0];
        let mut cursor = ByteCursor::new(&data);
        let values: Vec<U16<LE>> = cursor.read_array(3).unwrap();
        assert_eq!(values.iter().map(|v| v.get()).collect::<Vec<_>>(), [1, 2, 3]);

        let mut cursor = ByteCursor::new(&data);
        assert!(cursor.read_array::<U32<LE>>(2).is_err());
        assert!(cursor.read_array::<U32<LE>>(usize::MAX).is_err());
        assert_eq!(cursor.position(), 0);
    }

    proptest! {
        #[test]
        fn reads_never_overrun(data in proptest::collection::vec(any::<u8>(), 0..64), sizes in proptest::collection::vec(0usize..12, 0..16)) {
            let mut cursor = ByteCursor::new(&data);
            for size in sizes {
                let before = cursor.position();
                match cursor.read_bytes(size) {
                    Ok(bytes) => prop_assert_eq!(bytes.len(), size),
                    Err(Error::UnexpectedEnd { .. }) => prop_assert_eq!(cursor.position(), before),
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
                prop_assert!(cursor.position() <= data.len());
            }
        }
    }
}
