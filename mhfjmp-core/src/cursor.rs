//! Bounds-checked little-endian access to container bytes.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
}

/// Random-access reader over a fully loaded buffer.
///
/// Reads never return partial data: anything that would run past the end of
/// the buffer fails with [`Error::OutOfBounds`] and leaves the position where
/// it was.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Moves the cursor. Seeking to exactly the end of the buffer is allowed.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<usize> {
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => self.pos as i64,
        };
        let target = base.checked_add(offset).filter(|t| *t >= 0 && *t as usize <= self.data.len());
        match target {
            Some(t) => {
                self.pos = t as usize;
                Ok(self.pos)
            }
            None => Err(Error::OutOfBounds {
                offset: base.saturating_add(offset).max(0) as usize,
                len: 0,
                size: self.data.len(),
            }),
        }
    }

    #[inline]
    pub fn seek_to(&mut self, offset: u32) -> Result<usize> {
        self.seek(offset as i64, SeekOrigin::Start)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let bytes = &self.data[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(Error::OutOfBounds { offset: self.pos, len: n, size: self.data.len() }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Reads the bytes of a NUL-terminated string at `offset` without moving
    /// the cursor. The terminator is not included; a string running into the
    /// end of the buffer is returned as is.
    pub fn read_cstring_at(&mut self, offset: u32) -> Result<&'a [u8]> {
        self.peek_at(offset, |cur| {
            let data: &'a [u8] = cur.data;
            let rest = &data[cur.pos..];
            let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
            Ok(&rest[..end])
        })
    }

    /// Runs `f` with the cursor moved to `offset`, then restores the previous
    /// position whatever `f` returned.
    pub fn peek_at<T>(&mut self, offset: u32, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.pos;
        self.seek_to(offset)?;
        let out = f(self);
        self.pos = saved;
        out
    }
}

/// Output buffer written at explicit offsets.
///
/// The layout planner sizes it up front; writing past its end is
/// [`Error::LayoutOverflow`].
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_len(len: usize) -> Self {
        Self { buf: vec![0; len] }
    }

    /// Fixed writer of `len` bytes starting with a copy of `template`.
    pub fn from_template(template: &[u8], len: usize) -> Result<Self> {
        let mut w = Self::with_len(len);
        w.write_bytes(0, template)?;
        Ok(w)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    fn slot(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(Error::LayoutOverflow { offset, len, size: self.buf.len() })?;
        if end > self.buf.len() {
            return Err(Error::LayoutOverflow { offset, len, size: self.buf.len() });
        }
        Ok(&mut self.buf[offset..end])
    }

    pub fn write_u8(&mut self, offset: usize, v: u8) -> Result<()> {
        self.slot(offset, 1)?[0] = v;
        Ok(())
    }

    pub fn write_u16(&mut self, offset: usize, v: u16) -> Result<()> {
        LittleEndian::write_u16(self.slot(offset, 2)?, v);
        Ok(())
    }

    pub fn write_u32(&mut self, offset: usize, v: u32) -> Result<()> {
        LittleEndian::write_u32(self.slot(offset, 4)?, v);
        Ok(())
    }

    pub fn write_f32(&mut self, offset: usize, v: f32) -> Result<()> {
        LittleEndian::write_f32(self.slot(offset, 4)?, v);
        Ok(())
    }

    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.slot(offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }
}
