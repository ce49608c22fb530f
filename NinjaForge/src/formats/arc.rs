//! ARC container envelope (big-endian, base 0x20)
//!
//! ```text
//! 0x00  file_size, relocation_offset, relocation_size, entry_count, 0, "0100", 0, 0
//! 0x20  body
//!       POF0 block at relocation_offset (packed relocation deltas)
//!       optional entry table: entry_count x (data_offset, name_offset), then names
//! ```

use tracing::debug;

use crate::binary::{checked_target, decode_pof0, encode_pof0, ByteCursor, ByteWriter, Endian, OffsetTable};
use crate::error::{Error, Result};

pub const ARC_BASE: usize = 0x20;
pub const ARC_VERSION: &[u8; 4] = b"0100";

const ENTRY_NAME_MAX_LEN: usize = 0x40;

/// Named entry in the trailing entry table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArcEntry {
    /// Body-relative offset of the entry data.
    pub data_offset: u32,
    pub name: String,
}

/// Decoded ARC header and trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcEnvelope {
    pub file_size: u32,
    /// POF0 offset relative to [`ARC_BASE`].
    pub relocation_offset: u32,
    pub relocation_size: u32,
    /// Relocated pointer positions relative to [`ARC_BASE`].
    pub relocations: Vec<u32>,
    pub entries: Vec<ArcEntry>,
}

/// Whether `data` looks like an ARC container.
pub fn is_arc(data: &[u8]) -> bool {
    data.len() >= ARC_BASE
        && &data[0x14..0x18] == ARC_VERSION
        && u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize == data.len()
}

impl ArcEnvelope {
    /// Parse the ARC header, its POF0 relocation block and the entry table.
    ///
    /// # Arguments
    /// * `data` - The whole container, starting at the header
    ///
    /// # Errors
    /// `UnsupportedFormat` if the version tag is missing, malformed-input
    /// errors if the relocation block or entry table lies outside the buffer.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data, Endian::Big);
        let version = cursor.read_at::<[u8; 4]>(0x14)?;
        if &version != ARC_VERSION {
            return Err(Error::UnsupportedFormat { magic: version });
        }

        let file_size: u32 = cursor.read()?;
        let relocation_offset: u32 = cursor.read()?;
        let relocation_size: u32 = cursor.read()?;
        let entry_count: u32 = cursor.read()?;

        let block_start = checked_target(&cursor, ARC_BASE, relocation_offset, relocation_size as usize)?;
        let block = &data[block_start..block_start + relocation_size as usize];
        let relocations = decode_pof0(block)?;
        for &position in &relocations {
            checked_target(&cursor, ARC_BASE, position, 4)?;
        }

        let mut entries = Vec::with_capacity(entry_count as usize);
        if entry_count > 0 {
            let table_start = block_start + relocation_size as usize;
            let table_size = (entry_count as usize).saturating_mul(8);
            let table = checked_target(&cursor, table_start, 0, table_size)?;
            cursor.seek_to(table)?;
            let names_base = table + table_size;
            for _ in 0..entry_count {
                let data_offset = cursor.read()?;
                let name_offset = cursor.read::<u32>()? as usize;
                let name = cursor.read_cstring_at(names_base + name_offset, ENTRY_NAME_MAX_LEN)?;
                entries.push(ArcEntry { data_offset, name });
            }
        }

        debug!(
            "ARC container: {file_size:#x} bytes, {} relocations, {} entries",
            relocations.len(),
            entries.len()
        );

        Ok(Self {
            file_size,
            relocation_offset,
            relocation_size,
            relocations,
            entries,
        })
    }
}

/// Wrap a finished body: align it, append POF0 and prepend the header.
///
/// # Panics
/// Panics if any reserved offset slot was left unfilled.
#[must_use]
pub fn finish_arc(mut body: ByteWriter, offsets: OffsetTable) -> Vec<u8> {
    body.align(4);
    let relocation_offset = body.position() as u32;
    let relocations = offsets.finish();
    let pof0 = encode_pof0(&relocations);

    let file_size = (ARC_BASE + body.len() + pof0.len()) as u32;
    let mut out = ByteWriter::new(Endian::Big);
    out.write(file_size);
    out.write(relocation_offset);
    out.write(pof0.len() as u32);
    out.write(0u32);
    out.write(0u32);
    out.write_bytes(ARC_VERSION);
    out.write_zeros(8);
    out.write_bytes(body.as_bytes());
    out.write_bytes(&pof0);

    debug!(
        "wrote ARC container: {file_size:#x} bytes, {} relocations",
        relocations.len()
    );
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut body = ByteWriter::new(Endian::Big);
        let mut offsets = OffsetTable::new();
        body.write(1u32);
        let slot = offsets.reserve(&mut body);
        body.write(0xABu8);
        offsets.fill(slot, &mut body, 0);
        finish_arc(body, offsets)
    }

    #[test]
    fn test_header_fields() {
        let data = sample();
        assert!(is_arc(&data));
        assert_eq!(&data[0x14..0x18], b"0100");
        // Body is 9 bytes, aligned to 12; POF0 is one byte padded to 4.
        assert_eq!(data.len(), 0x20 + 12 + 4);

        let envelope = ArcEnvelope::read(&data).unwrap();
        assert_eq!(envelope.file_size as usize, data.len());
        assert_eq!(envelope.relocation_offset, 12);
        assert_eq!(envelope.relocations, vec![4]);
        assert!(envelope.entries.is_empty());
    }

    #[test]
    fn test_entry_table() {
        let mut data = sample();
        data[0x0C..0x10].copy_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&0x10u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"stage01\0");
        let size = data.len() as u32;
        data[0..4].copy_from_slice(&size.to_be_bytes());

        let envelope = ArcEnvelope::read(&data).unwrap();
        assert_eq!(
            envelope.entries,
            vec![ArcEntry {
                data_offset: 0x10,
                name: "stage01".to_string(),
            }]
        );
    }

    #[test]
    fn test_relocation_block_out_of_range() {
        let mut data = sample();
        data[4..8].copy_from_slice(&0x100u32.to_be_bytes());
        assert!(ArcEnvelope::read(&data).unwrap_err().is_malformed());
        assert!(!is_arc(&data[..0x10]));
    }
}
