//! Seekable, endian-aware reader over an in-memory buffer.

use std::io::SeekFrom;

use super::primitive::{Endian, Primitive};
use crate::error::{Error, Result};

/// Read cursor over a byte slice.
///
/// Every read checks bounds up front, so a failed read leaves the position
/// untouched.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self { data, pos: 0, endian }
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left from the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// The full underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn ensure(&self, at: usize, need: usize) -> Result<()> {
        if at.checked_add(need).is_none_or(|end| end > self.data.len()) {
            return Err(Error::UnexpectedEof {
                offset: at,
                need,
                remaining: self.data.len().saturating_sub(at),
            });
        }
        Ok(())
    }

    /// Move the cursor. Seeking exactly to the end is allowed; beyond it is not.
    pub fn seek(&mut self, from: SeekFrom) -> Result<usize> {
        let len = self.data.len() as i64;
        let target = match from {
            SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            SeekFrom::Current(delta) => (self.pos as i64).saturating_add(delta),
            SeekFrom::End(delta) => len.saturating_add(delta),
        };
        if target < 0 || target > len {
            return Err(Error::SeekOutOfRange {
                target,
                len: self.data.len(),
            });
        }
        self.pos = target as usize;
        Ok(self.pos)
    }

    /// Seek to an absolute position.
    pub fn seek_to(&mut self, pos: usize) -> Result<()> {
        self.seek(SeekFrom::Start(pos as u64)).map(|_| ())
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(self.pos, n)?;
        self.pos += n;
        Ok(())
    }

    /// Read `n` bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(self.pos, n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a value in the cursor's byte order.
    pub fn read<T: Primitive>(&mut self) -> Result<T> {
        self.read_as(self.endian)
    }

    /// Read a value in an explicit byte order, ignoring the cursor's own.
    pub fn read_as<T: Primitive>(&mut self, endian: Endian) -> Result<T> {
        let bytes = self.read_bytes(T::SIZE)?;
        Ok(T::decode(bytes, endian))
    }

    /// Read a value without advancing.
    pub fn peek<T: Primitive>(&self) -> Result<T> {
        self.read_at(self.pos)
    }

    /// Read a value at an absolute offset without moving the cursor.
    pub fn read_at<T: Primitive>(&self, offset: usize) -> Result<T> {
        self.ensure(offset, T::SIZE)?;
        Ok(T::decode(&self.data[offset..offset + T::SIZE], self.endian))
    }

    /// Read a 4-byte tag.
    pub fn read_magic(&mut self) -> Result<[u8; 4]> {
        self.read::<[u8; 4]>()
    }

    /// Advance to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - self.pos % alignment) % alignment;
        self.skip(padding)
    }

    /// Read a NUL-terminated single-byte string at `offset`, scanning at most
    /// `max_len` bytes. Does not move the cursor.
    pub fn read_cstring_at(&self, offset: usize, max_len: usize) -> Result<String> {
        if offset >= self.data.len() {
            return Err(Error::OffsetOutOfRange {
                offset,
                len: self.data.len(),
            });
        }
        let end = offset.saturating_add(max_len).min(self.data.len());
        let window = &self.data[offset..end];
        let text = window
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect();
        Ok(text)
    }
}
