//! Shared, deduplicated string storage
//!
//! Encode side: records hand in a reserved offset slot per string field. Each
//! distinct string is written once, and every slot that referenced it is filled
//! with the same position. Decode side: every offset is resolved on its own,
//! so aliased strings come back as independent values.

use indexmap::IndexMap;

use super::cursor::ByteCursor;
use super::relocation::{OffsetTable, Slot};
use super::writer::ByteWriter;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct StringTable {
    entries: IndexMap<String, Vec<Slot>>,
}

impl StringTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `slot` to `value`, adding the string if it is new.
    ///
    /// # Errors
    /// `NonAsciiString` or `InteriorNul` if `value` cannot be stored as a
    /// NUL-terminated single-byte string.
    pub fn intern(&mut self, value: &str, slot: Slot) -> Result<()> {
        check_storable(value)?;
        self.entries.entry(value.to_string()).or_default().push(slot);
        Ok(())
    }

    /// Reserve a slot at the writer position and intern `value` into it.
    pub fn intern_new(
        &mut self,
        value: &str,
        offsets: &mut OffsetTable,
        writer: &mut ByteWriter,
    ) -> Result<()> {
        check_storable(value)?;
        let slot = offsets.reserve(writer);
        self.intern(value, slot)
    }

    /// Number of distinct strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many slots reference `value`.
    pub fn reference_count(&self, value: &str) -> usize {
        self.entries.get(value).map_or(0, Vec::len)
    }

    /// Append every string (NUL terminated) in first-interned order and fill
    /// its slots. Returns each string's position.
    pub fn write(self, offsets: &mut OffsetTable, writer: &mut ByteWriter) -> IndexMap<String, u32> {
        let mut positions = IndexMap::with_capacity(self.entries.len());
        for (value, slots) in self.entries {
            let position = writer.position() as u32;
            writer.write_bytes(value.as_bytes());
            writer.write(0u8);
            for slot in slots {
                offsets.fill(slot, writer, position);
            }
            positions.insert(value, position);
        }
        positions
    }
}

fn check_storable(value: &str) -> Result<()> {
    if !value.is_ascii() {
        return Err(Error::NonAsciiString(value.to_string()));
    }
    if value.contains('\0') {
        return Err(Error::InteriorNul(value.to_string()));
    }
    Ok(())
}

/// Resolve a string offset relative to `base`.
pub fn resolve_string(cursor: &ByteCursor, base: usize, offset: u32, max_len: usize) -> Result<String> {
    let target = base.saturating_add(offset as usize);
    if offset == 0 || target >= cursor.len() {
        return Err(Error::OffsetOutOfRange {
            offset: target,
            len: cursor.len(),
        });
    }
    cursor.read_cstring_at(target, max_len)
}

/// Resolve an optional string: zero means absent.
pub fn resolve_optional_string(
    cursor: &ByteCursor,
    base: usize,
    offset: u32,
    max_len: usize,
) -> Result<Option<String>> {
    if offset == 0 {
        return Ok(None);
    }
    resolve_string(cursor, base, offset, max_len).map(Some)
}
