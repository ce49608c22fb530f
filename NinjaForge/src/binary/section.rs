//! Generic section decoding and encoding
//!
//! A section is an array of records addressed by a `(count, offset)` pair,
//! with the offset relative to the container base. Three shapes occur:
//!
//! - fixed-stride arrays ([`read_section`], [`write_section`])
//! - offset arrays pointing at individually placed records ([`read_indirect`])
//! - variable-length records packed back to back with padding between them
//!   ([`read_padded`], [`write_padded`])
//!
//! Padded blocks align *between* records only. Files in the wild do not carry
//! padding after the final record, so neither side reads or writes it.

use serde::Serialize;
use tracing::trace;

use super::cursor::ByteCursor;
use super::relocation::{OffsetTable, Slot};
use super::writer::ByteWriter;
use crate::error::{Error, Result};

/// Count and base-relative offset of a section, as stored in a root struct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionRef {
    pub count: u32,
    pub offset: u32,
}

impl SectionRef {
    #[must_use]
    pub fn new(count: u32, offset: u32) -> Self {
        Self { count, offset }
    }

    /// Read a `count` then `offset` pair.
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let count = cursor.read()?;
        let offset = cursor.read()?;
        Ok(Self { count, offset })
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Absolute placement of one decoded section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionInfo {
    pub name: String,
    /// Absolute offset in the buffer.
    pub offset: usize,
    pub count: usize,
    /// Bytes covered by the section.
    pub size: usize,
}

impl SectionInfo {
    pub fn new(name: impl Into<String>, offset: usize, count: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            offset,
            count,
            size,
        }
    }

    /// End offset (exclusive).
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Resolve `base + offset` and check that `size` bytes fit after it.
pub fn checked_target(cursor: &ByteCursor, base: usize, offset: u32, size: usize) -> Result<usize> {
    let target = base.saturating_add(offset as usize);
    if target.checked_add(size).is_none_or(|end| end > cursor.len()) {
        return Err(Error::OffsetOutOfRange {
            offset: target,
            len: cursor.len(),
        });
    }
    Ok(target)
}

/// Read `section.count` fixed-stride records.
///
/// The whole span is validated before the first read. `read_one` is called at
/// the start of each element; bytes it leaves unread within the stride are
/// skipped.
pub fn read_section<'a, T, F>(
    cursor: &mut ByteCursor<'a>,
    base: usize,
    section: SectionRef,
    stride: usize,
    mut read_one: F,
) -> Result<Vec<T>>
where
    F: FnMut(&mut ByteCursor<'a>) -> Result<T>,
{
    if section.is_empty() {
        return Ok(Vec::new());
    }
    let count = section.count as usize;
    let total = count.checked_mul(stride).ok_or(Error::OffsetOutOfRange {
        offset: base.saturating_add(section.offset as usize),
        len: cursor.len(),
    })?;
    let start = checked_target(cursor, base, section.offset, total)?;
    trace!("section at {start:#x}: {count} x {stride:#x} bytes");

    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let element = start + i * stride;
        cursor.seek_to(element)?;
        items.push(read_one(cursor)?);
        debug_assert!(
            cursor.position() <= element + stride,
            "record reader overran its stride"
        );
    }
    cursor.seek_to(start + total)?;
    Ok(items)
}

/// Read an offset array and decode each non-zero target.
///
/// Zero entries are empty slots: they are skipped without calling `read_one`.
pub fn read_indirect<'a, T, F>(
    cursor: &mut ByteCursor<'a>,
    base: usize,
    section: SectionRef,
    mut read_one: F,
) -> Result<Vec<T>>
where
    F: FnMut(&mut ByteCursor<'a>) -> Result<T>,
{
    if section.is_empty() || section.offset == 0 {
        return Ok(Vec::new());
    }
    let count = section.count as usize;
    let table = checked_target(cursor, base, section.offset, count.saturating_mul(4))?;
    cursor.seek_to(table)?;
    let offsets = (0..count)
        .map(|_| cursor.read::<u32>())
        .collect::<Result<Vec<_>>>()?;

    let mut items = Vec::with_capacity(count);
    for (i, offset) in offsets.into_iter().enumerate() {
        if offset == 0 {
            trace!("indirect entry {i} at {table:#x} is empty");
            continue;
        }
        let target = checked_target(cursor, base, offset, 1)?;
        cursor.seek_to(target)?;
        items.push(read_one(cursor)?);
    }
    Ok(items)
}

/// Read `count` variable-length records packed back to back, aligning the
/// cursor after every record except the last.
pub fn read_padded<'a, T, F>(
    cursor: &mut ByteCursor<'a>,
    count: usize,
    alignment: usize,
    mut read_one: F,
) -> Result<Vec<T>>
where
    F: FnMut(&mut ByteCursor<'a>) -> Result<T>,
{
    let mut items = Vec::with_capacity(count.min(cursor.remaining()));
    for i in 0..count {
        items.push(read_one(cursor)?);
        if i + 1 < count {
            cursor.align(alignment)?;
        }
    }
    Ok(items)
}

/// Write records back to back, padding to `alignment` between records but
/// never after the last one.
pub fn write_padded<I, F>(writer: &mut ByteWriter, items: I, alignment: usize, mut write_one: F) -> Result<()>
where
    I: IntoIterator,
    F: FnMut(&mut ByteWriter, I::Item) -> Result<()>,
{
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            writer.align(alignment);
        }
        write_one(writer, item)?;
    }
    Ok(())
}

/// Align, point `slot` at the section start and write fixed records.
///
/// An empty section leaves `slot` as the zero sentinel and writes nothing.
pub fn write_section<I, F>(
    writer: &mut ByteWriter,
    offsets: &mut OffsetTable,
    slot: Slot,
    alignment: usize,
    items: I,
    mut write_one: F,
) -> Result<usize>
where
    I: IntoIterator,
    F: FnMut(&mut ByteWriter, &mut OffsetTable, I::Item) -> Result<()>,
{
    let mut items = items.into_iter().peekable();
    if items.peek().is_none() {
        offsets.fill_null(slot);
        return Ok(0);
    }
    writer.align(alignment);
    offsets.fill_here(slot, writer);
    let mut count = 0;
    for item in items {
        write_one(writer, offsets, item)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::Endian;

    fn be_words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn test_read_section_preserves_order_and_skips_tail() {
        // Stride 8, but only the first word of each record is read.
        let data = be_words(&[0, 0, 10, 0xAA, 20, 0xBB, 30, 0xCC]);
        let mut cursor = ByteCursor::new(&data, Endian::Big);
        let values = read_section(&mut cursor, 0, SectionRef::new(3, 8), 8, |c| c.read::<u32>()).unwrap();
        assert_eq!(values, vec![10, 20, 30]);
        assert_eq!(cursor.position(), 32);
    }

    #[test]
    fn test_read_section_validates_span() {
        let data = be_words(&[0, 0, 0, 0]);
        let mut cursor = ByteCursor::new(&data, Endian::Big);
        let err = read_section(&mut cursor, 0, SectionRef::new(3, 8), 4, |c| c.read::<u32>()).unwrap_err();
        assert!(matches!(err, Error::OffsetOutOfRange { offset: 8, len: 16 }));
    }

    #[test]
    fn test_read_indirect_skips_zero_offsets() {
        // Offset table at 0: [0x0C, 0, 0x10], records at 0x0C and 0x10.
        let data = be_words(&[0x0C, 0, 0x10, 7, 9]);
        let mut cursor = ByteCursor::new(&data, Endian::Big);
        let mut calls = 0;
        let values = read_indirect(&mut cursor, 0, SectionRef::new(3, 0x20), |c| {
            calls += 1;
            c.read::<u32>()
        });
        // A table outside the buffer is an error, not an empty section.
        assert!(values.is_err());
        assert_eq!(calls, 0);

        let data = be_words(&[0, 0x10, 0, 0x14, 7, 9]);
        let mut cursor = ByteCursor::new(&data, Endian::Big);
        let values = read_indirect(&mut cursor, 0, SectionRef::new(3, 4), |c| {
            calls += 1;
            c.read::<u32>()
        })
        .unwrap();
        assert_eq!(values, vec![7, 9]);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_read_indirect_rejects_out_of_range_entry() {
        let data = be_words(&[0x40]);
        let mut cursor = ByteCursor::new(&data, Endian::Big);
        let values = read_indirect(&mut cursor, 0, SectionRef::new(1, 0), |c| c.read::<u32>());
        // Offset 0 for the table itself means no section.
        assert_eq!(values.unwrap(), Vec::<u32>::new());

        let data = be_words(&[0, 0x40]);
        let mut cursor = ByteCursor::new(&data, Endian::Big);
        let err = read_indirect(&mut cursor, 0, SectionRef::new(1, 4), |c| c.read::<u32>()).unwrap_err();
        assert!(matches!(err, Error::OffsetOutOfRange { offset: 0x40, .. }));
    }

    #[test]
    fn test_padded_alignment_is_asymmetric() {
        let mut writer = ByteWriter::new(Endian::Big);
        let records: [&[u8]; 3] = [&[1, 2, 3], &[4], &[5, 6]];
        write_padded(&mut writer, records, 4, |w, bytes| {
            w.write_bytes(bytes);
            Ok(())
        })
        .unwrap();
        // No trailing padding after the last record.
        assert_eq!(writer.as_bytes(), &[1, 2, 3, 0, 4, 0, 0, 0, 5, 6]);

        // Reading must not require padding after the final record either.
        let mut cursor = ByteCursor::new(writer.as_bytes(), Endian::Big);
        let lengths = [3usize, 1, 2];
        let mut next = lengths.iter();
        let read = read_padded(&mut cursor, 3, 4, |c| {
            let n = *next.next().unwrap_or(&0);
            c.read_bytes(n).map(<[u8]>::to_vec)
        })
        .unwrap();
        assert_eq!(read, vec![vec![1, 2, 3], vec![4], vec![5, 6]]);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_write_section_empty_is_null() {
        let mut writer = ByteWriter::new(Endian::Little);
        let mut offsets = OffsetTable::new();
        let slot = offsets.reserve(&mut writer);
        writer.write(1u8);
        let count = write_section(&mut writer, &mut offsets, slot, 16, Vec::<u32>::new(), |w, _, v| {
            w.write(v);
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 0);
        assert_eq!(writer.len(), 5);
        assert!(offsets.finish().is_empty());
    }

    #[test]
    fn test_write_section_aligns_and_fills() {
        let mut writer = ByteWriter::new(Endian::Little);
        let mut offsets = OffsetTable::new();
        let slot = offsets.reserve(&mut writer);
        writer.write(1u8);
        write_section(&mut writer, &mut offsets, slot, 16, [5u32, 6], |w, _, v| {
            w.write(v);
            Ok(())
        })
        .unwrap();
        assert_eq!(writer.len(), 24);
        let cursor = ByteCursor::new(writer.as_bytes(), Endian::Little);
        assert_eq!(cursor.read_at::<u32>(0).unwrap(), 16);
        assert_eq!(offsets.finish(), vec![0]);
    }
}
