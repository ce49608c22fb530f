//! Low-level binary layer shared by every container family
//!
//! - [`ByteCursor`] / [`ByteWriter`]: endian-aware reads and writes
//! - [`OffsetTable`]: reserved offset slots and relocation blocks (NOF0/POF0)
//! - [`StringTable`]: deduplicated string storage
//! - [`section`]: generic fixed, indirect and padded section codecs

pub mod cursor;
pub mod primitive;
pub mod relocation;
pub mod section;
pub mod string_table;
pub mod writer;

pub use cursor::ByteCursor;
pub use primitive::{Endian, Primitive};
pub use relocation::{decode_nof0, decode_pof0, encode_nof0, encode_pof0, OffsetTable, Slot};
pub use section::{
    checked_target, read_indirect, read_padded, read_section, write_padded, write_section, SectionInfo,
    SectionRef,
};
pub use string_table::{resolve_optional_string, resolve_string, StringTable};
pub use writer::ByteWriter;
