//! Offset slots and relocation blocks.
//!
//! Writers reserve a 4-byte slot wherever an offset will go, write the data it
//! points at later, and then fill the slot. Every filled slot is recorded as a
//! pointer position, and the sorted list of positions is emitted as the
//! container's relocation block (NOF0 for NIFL, POF0 for ARC).

use byteorder::{BigEndian, ByteOrder};

use super::cursor::ByteCursor;
use super::primitive::Endian;
use super::writer::ByteWriter;
use crate::error::{Error, Result};

/// Handle to a reserved offset slot.
///
/// Consumed by [`OffsetTable::fill`], [`OffsetTable::fill_here`] or
/// [`OffsetTable::fill_null`], so a slot cannot be settled twice.
#[must_use = "reserved offset slots must be filled before the offset table is finished"]
#[derive(Debug)]
pub struct Slot {
    id: usize,
}

#[derive(Debug)]
struct SlotState {
    position: usize,
    settled: bool,
}

/// Arena of reserved slots plus the positions of every pointer written so far.
#[derive(Debug, Default)]
pub struct OffsetTable {
    slots: Vec<SlotState>,
    pointers: Vec<u32>,
    outstanding: usize,
}

impl OffsetTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a zero placeholder at the writer's position and return its handle.
    pub fn reserve(&mut self, writer: &mut ByteWriter) -> Slot {
        let position = writer.position();
        writer.write(0u32);
        self.slots.push(SlotState {
            position,
            settled: false,
        });
        self.outstanding += 1;
        Slot {
            id: self.slots.len() - 1,
        }
    }

    fn settle(&mut self, slot: Slot) -> usize {
        let state = &mut self.slots[slot.id];
        assert!(
            !state.settled,
            "offset slot at {:#x} settled twice",
            state.position
        );
        state.settled = true;
        self.outstanding -= 1;
        state.position
    }

    /// Patch `value` into the slot and record it as a relocated pointer.
    pub fn fill(&mut self, slot: Slot, writer: &mut ByteWriter, value: u32) {
        let position = self.settle(slot);
        writer.patch_u32(position, value);
        self.pointers.push(position as u32);
    }

    /// Fill the slot with the writer's current position.
    pub fn fill_here(&mut self, slot: Slot, writer: &mut ByteWriter) {
        let value = writer.position() as u32;
        self.fill(slot, writer, value);
    }

    /// Leave the slot as the zero sentinel. Not relocated.
    pub fn fill_null(&mut self, slot: Slot) {
        self.settle(slot);
    }

    /// Write an offset whose value is already known and record it.
    pub fn write_pointer(&mut self, writer: &mut ByteWriter, value: u32) {
        self.pointers.push(writer.position() as u32);
        writer.write(value);
    }

    /// Number of reserved slots not yet filled.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Sorted, deduplicated pointer positions.
    ///
    /// # Panics
    /// Panics if any reserved slot was never filled.
    #[must_use]
    pub fn finish(self) -> Vec<u32> {
        if self.outstanding > 0 {
            let unfilled: Vec<String> = self
                .slots
                .iter()
                .filter(|s| !s.settled)
                .map(|s| format!("{:#x}", s.position))
                .collect();
            panic!(
                "{} offset slot(s) never filled: {}",
                self.outstanding,
                unfilled.join(", ")
            );
        }
        let mut pointers = self.pointers;
        pointers.sort_unstable();
        pointers.dedup();
        pointers
    }
}

const NOF0_MAGIC: &[u8; 4] = b"NOF0";

/// Encode a NOF0 chunk, zero padded to 16 bytes.
#[must_use]
pub fn encode_nof0(positions: &[u32]) -> Vec<u8> {
    let mut writer = ByteWriter::new(Endian::Little);
    writer.write_bytes(NOF0_MAGIC);
    writer.write(4 + 4 * positions.len() as u32);
    writer.write(positions.len() as u32);
    for &position in positions {
        writer.write(position);
    }
    writer.align(16);
    writer.into_bytes()
}

/// Decode a NOF0 chunk starting at the cursor position.
pub fn decode_nof0(cursor: &mut ByteCursor) -> Result<Vec<u32>> {
    let offset = cursor.position();
    let magic = cursor.read_magic()?;
    if &magic != NOF0_MAGIC {
        return Err(Error::InvalidChunkMagic {
            expected: "NOF0",
            found: magic,
            offset,
        });
    }
    let _size: u32 = cursor.read()?;
    let count = cursor.read::<u32>()? as usize;
    if count.saturating_mul(4) > cursor.remaining() {
        return Err(Error::UnexpectedEof {
            offset: cursor.position(),
            need: count.saturating_mul(4),
            remaining: cursor.remaining(),
        });
    }
    (0..count).map(|_| cursor.read::<u32>()).collect()
}

/// Encode positions as a raw POF0 block, zero padded to 4 bytes.
///
/// # Panics
/// Panics if positions are unsorted or not 4-byte aligned.
#[must_use]
pub fn encode_pof0(positions: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut last = 0u32;
    for &position in positions {
        assert!(
            position % 4 == 0 && position >= last,
            "POF0 position {position:#x} is misaligned or out of order"
        );
        let delta = (position - last) / 4;
        if delta < 0x40 {
            out.push(0x40 | delta as u8);
        } else if delta < 0x4000 {
            let mut buf = [0u8; 2];
            BigEndian::write_u16(&mut buf, 0x8000 | delta as u16);
            out.extend_from_slice(&buf);
        } else {
            let mut buf = [0u8; 4];
            BigEndian::write_u32(&mut buf, 0xC000_0000 | delta);
            out.extend_from_slice(&buf);
        }
        last = position;
    }
    out.resize(out.len().next_multiple_of(4), 0);
    out
}

/// Decode a raw POF0 block. A zero byte or the end of the slice terminates it.
pub fn decode_pof0(bytes: &[u8]) -> Result<Vec<u32>> {
    let mut positions = Vec::new();
    let mut position = 0u32;
    let mut i = 0;
    while i < bytes.len() {
        let width = match bytes[i] & 0xC0 {
            0x00 => break,
            0x40 => 1,
            0x80 => 2,
            _ => 4,
        };
        if i + width > bytes.len() {
            return Err(Error::UnexpectedEof {
                offset: i,
                need: width,
                remaining: bytes.len() - i,
            });
        }
        let delta = match width {
            1 => u32::from(bytes[i] & 0x3F),
            2 => u32::from(BigEndian::read_u16(&bytes[i..]) & 0x3FFF),
            _ => BigEndian::read_u32(&bytes[i..]) & 0x3FFF_FFFF,
        };
        position = position.wrapping_add(delta * 4);
        positions.push(position);
        i += width;
    }
    Ok(positions)
}
