//! Model packages: several NIFL model containers in one buffer
//!
//! ```text
//! "afp\0", file_count, 0, 0
//! per entry: payload_size, 0, 0, 0, payload (whole NIFL container), pad to 16
//! ```
//!
//! Entries are decoded in order at an advancing offset. The last entry's
//! trailing padding is optional on read. A vendor pre-header in front of the
//! `afp` tag is skipped, as for single containers.

use std::path::Path;

use tracing::debug;

use crate::binary::{read_padded, ByteCursor, ByteWriter, Endian, SectionInfo};
use crate::error::{Error, Result};
use crate::formats::model::{parse_model_with_sections, serialize_model, Model};

pub const PACKAGE_MAGIC: &[u8; 4] = b"afp\0";

const PACKAGE_HEADER_SIZE: usize = 0x10;
const ENTRY_HEADER_SIZE: usize = 0x10;

/// Read a model package from disk.
///
/// # Arguments
/// * `path` - Path to an `afp` package, with or without a vendor pre-header
///
/// # Returns
/// The models in entry order.
///
/// # Errors
/// Returns an error if the file cannot be read or any entry fails to decode.
pub fn read_package<P: AsRef<Path>>(path: P) -> Result<Vec<Model>> {
    let data = std::fs::read(path)?;
    parse_package_bytes(&data)
}

/// Parse a package from memory.
///
/// # Errors
/// `UnsupportedFormat` if the buffer is not a package, `InvalidPackage` if
/// an entry overruns the buffer, and any model decoding error.
pub fn parse_package_bytes(data: &[u8]) -> Result<Vec<Model>> {
    parse_package_with_sections(data).map(|(models, _)| models)
}

/// Parse a package. Section offsets of each entry are reported as absolute
/// positions in `data`.
///
/// # Errors
/// Same as [`parse_package_bytes`].
pub fn parse_package_with_sections(data: &[u8]) -> Result<(Vec<Model>, Vec<SectionInfo>)> {
    let mut cursor = ByteCursor::new(data, Endian::Little);
    cursor.seek_to(super::pre_header_size(data))?;
    let magic = cursor.read_magic()?;
    if &magic != PACKAGE_MAGIC {
        return Err(Error::UnsupportedFormat { magic });
    }
    let file_count = cursor.read::<u32>()? as usize;
    cursor.skip(8)?;
    if file_count.saturating_mul(ENTRY_HEADER_SIZE) > cursor.remaining() {
        return Err(Error::InvalidPackage {
            message: format!("{file_count} entries cannot fit in {:#x} bytes", data.len()),
        });
    }

    let mut sections = Vec::new();
    let mut index = 0;
    let models = read_padded(&mut cursor, file_count, 16, |c| {
        let entry_start = c.position();
        let payload_size = c.read::<u32>()? as usize;
        c.skip(12)?;
        let payload_start = c.position();
        let payload = c.read_bytes(payload_size).map_err(|_| Error::InvalidPackage {
            message: format!(
                "entry {index} at {entry_start:#x} declares {payload_size:#x} bytes, {:#x} remain",
                data.len() - payload_start
            ),
        })?;
        let (model, entry_sections) = parse_model_with_sections(payload)?;
        sections.push(SectionInfo::new(
            format!("entry[{index}]"),
            entry_start,
            1,
            ENTRY_HEADER_SIZE + payload_size,
        ));
        sections.extend(entry_sections.into_iter().map(|s| SectionInfo {
            name: format!("entry[{index}].{}", s.name),
            offset: s.offset + payload_start,
            ..s
        }));
        index += 1;
        Ok(model)
    })?;

    debug!("package: {} models", models.len());
    Ok((models, sections))
}

/// Write a model package to disk.
///
/// # Arguments
/// * `models` - Models to store, one entry each
/// * `path` - Output file path
///
/// # Errors
/// Returns an error if a model fails to encode or the file cannot be written.
pub fn write_package<P: AsRef<Path>>(models: &[Model], path: P) -> Result<()> {
    let bytes = serialize_package(models)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize models into a package. Every entry is padded to 16 bytes.
///
/// # Errors
/// Returns an error if any model fails to encode.
pub fn serialize_package(models: &[Model]) -> Result<Vec<u8>> {
    let mut writer = ByteWriter::new(Endian::Little);
    writer.write_bytes(PACKAGE_MAGIC);
    writer.write(models.len() as u32);
    writer.write_zeros(8);
    debug_assert_eq!(writer.len(), PACKAGE_HEADER_SIZE);

    for model in models {
        let payload = serialize_model(model)?;
        writer.write(payload.len() as u32);
        writer.write_zeros(12);
        writer.write_bytes(&payload);
        writer.align(16);
    }
    Ok(writer.into_bytes())
}
