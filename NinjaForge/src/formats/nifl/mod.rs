//! NIFL container envelope (little-endian, base 0x20)
//!
//! ```text
//! 0x00  NIFL header   "NIFL", 0x18, 1, base, nof0_offset, nof0_offset + base, nof0_size, 0
//! 0x20  REL0 header   "REL0", rel0_size, root_offset, 0
//! 0x30  root struct, sections, string table, zero padded to 16
//!       NOF0 chunk    relocation positions, relative to base
//!       NEND chunk    "NEND", 8, 0, 0
//! ```
//!
//! Files pulled out by some extraction tools carry a 0x60-byte pre-header in
//! front of the NIFL tag, and standalone `aqo`/`tro` files may carry a bare
//! 4-byte type prefix. Both are detected and skipped on read, never written.

pub mod package;

use tracing::debug;

use crate::binary::{
    checked_target, decode_nof0, encode_nof0, ByteCursor, ByteWriter, Endian, OffsetTable, StringTable,
};
use crate::error::{Error, Result};

pub const NIFL_MAGIC: &[u8; 4] = b"NIFL";
pub const VTBF_MAGIC: &[u8; 4] = b"VTBF";
const REL0_MAGIC: &[u8; 4] = b"REL0";
const NEND_MAGIC: &[u8; 4] = b"NEND";

/// Offsets in the body are relative to this position from the container start.
pub const NIFL_BASE: usize = 0x20;
/// Size of the REL0 header at the start of the body.
pub const REL0_SIZE: usize = 0x10;
/// Size of the vendor pre-header some tools prepend.
pub const PRE_HEADER_SIZE: usize = 0x60;
/// Size of the bare type prefix on standalone model files.
pub const TYPE_PREFIX_SIZE: usize = 4;

const PRE_HEADER_TAGS: [&[u8; 4]; 4] = [b"aqp\0", b"aqn\0", b"trp\0", b"trn\0"];
const TYPE_PREFIX_TAGS: [&[u8; 4]; 2] = [b"aqo\0", b"tro\0"];

/// Length of whatever precedes the container tag at the start of `data`:
/// [`PRE_HEADER_SIZE`], [`TYPE_PREFIX_SIZE`], or 0.
pub fn pre_header_size(data: &[u8]) -> usize {
    let Some(tag) = data.get(..4) else {
        return 0;
    };
    let is_one_of = |tags: &[&[u8; 4]]| tags.iter().any(|known| tag == known.as_slice());

    if is_one_of(&PRE_HEADER_TAGS) && data.len() >= PRE_HEADER_SIZE + 4 {
        PRE_HEADER_SIZE
    } else if is_one_of(&TYPE_PREFIX_TAGS) && data.len() >= TYPE_PREFIX_SIZE + 4 {
        TYPE_PREFIX_SIZE
    } else {
        0
    }
}

/// Container tag after any pre-header.
pub fn container_magic(data: &[u8]) -> Option<[u8; 4]> {
    let start = pre_header_size(data);
    data.get(start..start + 4)
        .map(|tag| [tag[0], tag[1], tag[2], tag[3]])
}

/// Decoded NIFL envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NiflHeader {
    /// Absolute position of the NIFL tag (after any pre-header).
    pub start: usize,
    /// Absolute position all body offsets are relative to.
    pub base: usize,
    /// Root struct offset, relative to `base`.
    pub root_offset: u32,
    /// NOF0 chunk offset, relative to `base`.
    pub nof0_offset: u32,
    /// Relocated pointer positions, relative to `base`.
    pub relocations: Vec<u32>,
    /// Container length from `start` through the NEND chunk.
    pub size: usize,
}

impl NiflHeader {
    /// Parse the envelope and its relocation table.
    ///
    /// # Errors
    /// `UnsupportedFormat` if the tag is not NIFL, `NotImplemented` for VTBF,
    /// and malformed-input errors for broken chunks or offsets.
    pub fn read(data: &[u8]) -> Result<Self> {
        let start = pre_header_size(data);
        let mut cursor = ByteCursor::new(data, Endian::Little);
        cursor.seek_to(start)?;

        let magic = cursor.read_magic()?;
        if &magic == VTBF_MAGIC {
            return Err(Error::NotImplemented {
                feature: "VTBF tagged-stream containers",
            });
        }
        if &magic != NIFL_MAGIC {
            return Err(Error::UnsupportedFormat { magic });
        }

        let _header_size: u32 = cursor.read()?;
        let _version: u32 = cursor.read()?;
        let base_offset = cursor.read::<u32>()? as usize;
        let nof0_offset: u32 = cursor.read()?;
        let _nof0_absolute: u32 = cursor.read()?;
        let nof0_size = cursor.read::<u32>()? as usize;
        let base = start + base_offset;

        let rel0_at = checked_target(&cursor, base, 0, REL0_SIZE)?;
        cursor.seek_to(rel0_at)?;
        let rel0 = cursor.read_magic()?;
        if &rel0 != REL0_MAGIC {
            return Err(Error::InvalidChunkMagic {
                expected: "REL0",
                found: rel0,
                offset: rel0_at,
            });
        }
        let _rel0_size: u32 = cursor.read()?;
        let root_offset: u32 = cursor.read()?;

        let nof0_at = checked_target(&cursor, base, nof0_offset, 12)?;
        cursor.seek_to(nof0_at)?;
        let relocations = decode_nof0(&mut cursor)?;
        for &position in &relocations {
            checked_target(&cursor, base, position, 4)?;
        }

        let size = (nof0_at + nof0_size + 0x10).min(data.len()) - start;
        debug!(
            "NIFL container at {start:#x}: base {base:#x}, root {root_offset:#x}, {} relocations",
            relocations.len()
        );

        Ok(Self {
            start,
            base,
            root_offset,
            nof0_offset,
            relocations,
            size,
        })
    }

    /// Absolute position of the root struct.
    pub fn root_position(&self) -> usize {
        self.base + self.root_offset as usize
    }

    /// Four-byte type tag at the start of the root struct.
    pub fn root_tag(&self, data: &[u8]) -> Result<[u8; 4]> {
        ByteCursor::new(data, Endian::Little).read_at::<[u8; 4]>(self.root_position())
    }
}

/// Body under construction plus its offset and string bookkeeping.
///
/// The REL0 header is written up front; the root struct starts at
/// [`REL0_SIZE`]. [`NiflBuilder::finish`] appends the string table and
/// wraps the body in the NIFL header and trailer chunks.
#[derive(Debug)]
pub struct NiflBuilder {
    pub writer: ByteWriter,
    pub offsets: OffsetTable,
    pub strings: StringTable,
}

impl NiflBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut writer = ByteWriter::new(Endian::Little);
        let mut offsets = OffsetTable::new();
        writer.write_bytes(REL0_MAGIC);
        writer.write(0u32);
        offsets.write_pointer(&mut writer, REL0_SIZE as u32);
        writer.write(0u32);
        Self {
            writer,
            offsets,
            strings: StringTable::new(),
        }
    }

    /// Write strings, relocation and end chunks, and prepend the header.
    ///
    /// # Panics
    /// Panics if any reserved offset slot was left unfilled.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        let Self {
            mut writer,
            mut offsets,
            strings,
        } = self;

        strings.write(&mut offsets, &mut writer);
        writer.align(16);

        let nof0_offset = writer.position() as u32;
        writer.patch_u32(4, nof0_offset - 8);
        let relocations = offsets.finish();
        let nof0 = encode_nof0(&relocations);

        let mut out = ByteWriter::new(Endian::Little);
        out.write_bytes(NIFL_MAGIC);
        out.write(0x18u32);
        out.write(1u32);
        out.write(NIFL_BASE as u32);
        out.write(nof0_offset);
        out.write(nof0_offset + NIFL_BASE as u32);
        out.write(nof0.len() as u32);
        out.write(0u32);
        out.write_bytes(writer.as_bytes());
        out.write_bytes(&nof0);
        out.write_bytes(NEND_MAGIC);
        out.write(8u32);
        out.write_zeros(8);

        debug!(
            "wrote NIFL container: {:#x} bytes, {} relocations",
            out.len(),
            relocations.len()
        );
        out.into_bytes()
    }
}

impl Default for NiflBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_container() -> Vec<u8> {
        let mut builder = NiflBuilder::new();
        builder.writer.write_bytes(b"TEST");
        builder.finish()
    }

    #[test]
    fn test_envelope_layout() {
        let data = empty_container();
        assert_eq!(&data[0..4], b"NIFL");
        assert_eq!(&data[0x20..0x24], b"REL0");
        // Body: REL0 (0x10) + tag (4), padded to 0x20.
        assert_eq!(u32::from_le_bytes(data[0x10..0x14].try_into().unwrap()), 0x20);
        assert_eq!(u32::from_le_bytes(data[0x24..0x28].try_into().unwrap()), 0x18);
        assert_eq!(&data[0x40..0x44], b"NOF0");
        assert_eq!(&data[data.len() - 0x10..data.len() - 0x0C], b"NEND");

        let header = NiflHeader::read(&data).unwrap();
        assert_eq!(header.base, 0x20);
        assert_eq!(header.root_offset, 0x10);
        assert_eq!(header.relocations, vec![0x08]);
        assert_eq!(header.size, data.len());
        assert_eq!(&header.root_tag(&data).unwrap(), b"TEST");
    }

    #[test]
    fn test_pre_header_shifts_base() {
        let mut data = b"aqp\0".to_vec();
        data.resize(PRE_HEADER_SIZE, 0);
        data.extend(empty_container());

        assert_eq!(pre_header_size(&data), PRE_HEADER_SIZE);
        assert_eq!(container_magic(&data), Some(*b"NIFL"));
        let header = NiflHeader::read(&data).unwrap();
        assert_eq!(header.start, 0x60);
        assert_eq!(header.base, 0x80);
        assert_eq!(&header.root_tag(&data).unwrap(), b"TEST");
    }

    #[test]
    fn test_type_prefix_is_skipped() {
        for prefix in [b"aqo\0", b"tro\0"] {
            let mut data = prefix.to_vec();
            data.extend(empty_container());

            assert_eq!(pre_header_size(&data), TYPE_PREFIX_SIZE);
            assert_eq!(container_magic(&data), Some(*b"NIFL"));
            let header = NiflHeader::read(&data).unwrap();
            assert_eq!(header.start, 4);
            assert_eq!(header.base, 0x24);
            assert_eq!(header.size, data.len() - 4);
            assert_eq!(&header.root_tag(&data).unwrap(), b"TEST");
        }
        // A lone prefix with nothing after it is not skipped.
        assert_eq!(pre_header_size(b"aqo\0"), 0);
    }

    #[test]
    fn test_unknown_and_unsupported_magic() {
        let mut data = empty_container();
        data[0..4].copy_from_slice(b"VTBF");
        assert!(matches!(NiflHeader::read(&data), Err(Error::NotImplemented { .. })));

        data[0..4].copy_from_slice(b"ABCD");
        assert!(matches!(
            NiflHeader::read(&data),
            Err(Error::UnsupportedFormat { magic }) if &magic == b"ABCD"
        ));
    }

    #[test]
    fn test_relocation_table_past_end() {
        let mut data = empty_container();
        data[0x10..0x14].copy_from_slice(&0x400u32.to_le_bytes());
        assert!(matches!(NiflHeader::read(&data), Err(Error::OffsetOutOfRange { .. })));
    }
}
