//! Event script writing

use std::path::Path;

use super::EventFile;
use crate::binary::{write_padded, ByteWriter, Endian, OffsetTable, StringTable};
use crate::error::Result;
use crate::formats::arc::finish_arc;

/// Write an event script file to disk.
///
/// # Arguments
/// * `file` - Event file to encode
/// * `path` - Output file path
///
/// # Errors
/// Returns an error if the file fails to encode or cannot be written.
pub fn write_event<P: AsRef<Path>>(file: &EventFile, path: P) -> Result<()> {
    let bytes = serialize_event(file)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize an event file into an ARC container.
///
/// Containers start on 4-byte boundaries. Within a container, scripts are
/// padded to 4 bytes between records only; the string table follows the
/// final script directly.
///
/// # Errors
/// `UnknownOpcode` or `PayloadMismatch` for an invalid script, and
/// `NonAsciiString` or `InteriorNul` for an unstorable name.
pub fn serialize_event(file: &EventFile) -> Result<Vec<u8>> {
    for script in file.containers.iter().flat_map(|c| &c.scripts) {
        script.validate()?;
    }

    let mut body = ByteWriter::new(Endian::Big);
    let mut offsets = OffsetTable::new();
    let mut strings = StringTable::new();

    body.write(file.containers.len() as u32);
    offsets.write_pointer(&mut body, 8);
    let container_slots: Vec<_> = file.containers.iter().map(|_| offsets.reserve(&mut body)).collect();

    for (container, slot) in file.containers.iter().zip(container_slots) {
        body.align(4);
        offsets.fill_here(slot, &mut body);
        body.write(container.value_00);
        body.write(container.value_04);
        body.write(container.value_08);
        body.write(container.scripts.len() as u32);

        let table_slot = offsets.reserve(&mut body);
        if container.scripts.is_empty() {
            offsets.fill_null(table_slot);
            continue;
        }
        offsets.fill_here(table_slot, &mut body);
        let script_slots: Vec<_> = container.scripts.iter().map(|_| offsets.reserve(&mut body)).collect();

        write_padded(&mut body, container.scripts.iter().zip(script_slots), 4, |w, (script, slot)| {
            offsets.fill_here(slot, w);
            strings.intern_new(&script.name, &mut offsets, w)?;
            w.write(script.value_04);
            if script.payload.is_empty() {
                w.write(0u32);
            } else {
                let payload_at = w.position() as u32 + 4;
                offsets.write_pointer(w, payload_at);
            }
            script.payload.write(w);
            Ok(())
        })?;
    }

    strings.write(&mut offsets, &mut body);
    Ok(finish_arc(body, offsets))
}
