//! Event script reading

use std::path::Path;

use tracing::{debug, trace};

use super::opcodes::{opcode_layout, Payload};
use super::{EventContainer, EventFile, Script, OPCODE_NAME_MAX_LEN};
use crate::binary::{read_indirect, resolve_string, ByteCursor, Endian, SectionInfo, SectionRef};
use crate::error::Result;
use crate::formats::arc::{ArcEnvelope, ARC_BASE};

const CONTAINER_SIZE: usize = 0x14;
const SCRIPT_HEADER_SIZE: usize = 0x0C;

/// Read an event script file from disk.
///
/// # Arguments
/// * `path` - Path to an ARC event file
///
/// # Returns
/// The decoded containers and their scripts.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid event file.
pub fn read_event<P: AsRef<Path>>(path: P) -> Result<EventFile> {
    let data = std::fs::read(path)?;
    parse_event_bytes(&data)
}

/// Parse an event file from bytes.
///
/// # Errors
/// `UnsupportedFormat` if the ARC envelope is missing, `UnknownOpcode` for
/// an unregistered script name, and malformed-input errors for offsets
/// outside the buffer.
pub fn parse_event_bytes(data: &[u8]) -> Result<EventFile> {
    parse_event_with_sections(data).map(|(file, _)| file)
}

/// Parse an event file and report where its tables and records sit.
///
/// # Errors
/// Same as [`parse_event_bytes`].
pub fn parse_event_with_sections(data: &[u8]) -> Result<(EventFile, Vec<SectionInfo>)> {
    let envelope = ArcEnvelope::read(data)?;
    let mut cursor = ByteCursor::new(data, Endian::Big);
    cursor.seek_to(ARC_BASE)?;
    let container_table = SectionRef::read(&mut cursor)?;

    let mut sections = Vec::new();
    if !container_table.is_empty() {
        sections.push(SectionInfo::new(
            "container_offsets",
            ARC_BASE + container_table.offset as usize,
            container_table.count as usize,
            container_table.count as usize * 4,
        ));
    }

    let mut container_index = 0;
    let containers = read_indirect(&mut cursor, ARC_BASE, container_table, |c| {
        let start = c.position();
        let value_00 = c.read()?;
        let value_04 = c.read()?;
        let value_08 = c.read()?;
        let scripts_ref = SectionRef {
            count: c.read()?,
            offset: c.read()?,
        };
        sections.push(SectionInfo::new(
            format!("container[{container_index}]"),
            start,
            1,
            CONTAINER_SIZE,
        ));
        if !scripts_ref.is_empty() && scripts_ref.offset != 0 {
            sections.push(SectionInfo::new(
                format!("container[{container_index}].script_offsets"),
                ARC_BASE + scripts_ref.offset as usize,
                scripts_ref.count as usize,
                scripts_ref.count as usize * 4,
            ));
        }

        let mut script_index = 0;
        let scripts = read_indirect(c, ARC_BASE, scripts_ref, |c| {
            let start = c.position();
            let script = read_script(c)?;
            sections.push(SectionInfo::new(
                format!("container[{container_index}].script[{script_index}]"),
                start,
                1,
                SCRIPT_HEADER_SIZE + script.payload.layout().size(),
            ));
            script_index += 1;
            Ok(script)
        })?;
        trace!("container {container_index}: {} scripts", scripts.len());
        container_index += 1;

        Ok(EventContainer {
            value_00,
            value_04,
            value_08,
            scripts,
        })
    })?;

    let file = EventFile { containers };
    debug!(
        "event file: {} containers, {} scripts, {} relocations",
        file.containers.len(),
        file.script_count(),
        envelope.relocations.len()
    );
    Ok((file, sections))
}

/// Header, then the opcode name, then the payload that name selects.
fn read_script(cursor: &mut ByteCursor) -> Result<Script> {
    let name_offset: u32 = cursor.read()?;
    let value_04 = cursor.read()?;
    let _data_offset: u32 = cursor.read()?;

    let name = resolve_string(cursor, ARC_BASE, name_offset, OPCODE_NAME_MAX_LEN)?;
    let layout = opcode_layout(&name)?;
    let payload = Payload::read(cursor, layout)?;

    Ok(Script {
        name,
        value_04,
        payload,
    })
}
