//! Model container reading

use std::path::Path;

use tracing::{debug, warn};

use super::document::{FaceSet, Material, Mesh, Model, Topology, VertexLayout, VertexSet};
use super::{MATERIAL_SIZE, MESH_SIZE, MODEL_TAG, NAME_MAX_LEN, VERTEX_SET_SIZE};
use crate::binary::{
    checked_target, read_padded, read_section, resolve_optional_string, resolve_string, ByteCursor, Endian,
    SectionInfo, SectionRef,
};
use crate::error::{Error, Result};
use crate::formats::nifl::NiflHeader;

/// Read a model container from disk.
///
/// # Arguments
/// * `path` - Path to a NIFL model, optionally behind a pre-header or type prefix
///
/// # Returns
/// The decoded model.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid model container.
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    let data = std::fs::read(path)?;
    parse_model_bytes(&data)
}

/// Parse a model container from bytes.
///
/// # Errors
/// `InvalidChunkMagic` if the root tag is not `OBJC`, `StrideTooSmall` or
/// `InvalidVertexSet` for inconsistent vertex sets, and malformed-input
/// errors for offsets or counts that leave the buffer.
pub fn parse_model_bytes(data: &[u8]) -> Result<Model> {
    parse_model_with_sections(data).map(|(model, _)| model)
}

/// Parse a model and report where each section sits in the buffer.
///
/// Section offsets are absolute positions in `data`.
///
/// # Errors
/// Same as [`parse_model_bytes`].
pub fn parse_model_with_sections(data: &[u8]) -> Result<(Model, Vec<SectionInfo>)> {
    let header = NiflHeader::read(data)?;
    let base = header.base;
    let mut cursor = ByteCursor::new(data, Endian::Little);
    let mut sections = Vec::new();

    let root = checked_target(&cursor, base, header.root_offset, 0x2C)?;
    cursor.seek_to(root)?;
    let tag = cursor.read_magic()?;
    if &tag != MODEL_TAG {
        return Err(Error::InvalidChunkMagic {
            expected: "OBJC",
            found: tag,
            offset: root,
        });
    }
    let version = cursor.read()?;
    let bounding_radius = cursor.read()?;
    let vertex_set_ref = SectionRef::read(&mut cursor)?;
    let face_set_ref = SectionRef::read(&mut cursor)?;
    let mesh_ref = SectionRef::read(&mut cursor)?;
    let material_ref = SectionRef::read(&mut cursor)?;
    sections.push(SectionInfo::new("root", root, 1, 0x2C));

    let headers = read_section(&mut cursor, base, vertex_set_ref, VERTEX_SET_SIZE, read_vertex_set_header)?;
    push_fixed(&mut sections, "vertex_sets", base, vertex_set_ref, VERTEX_SET_SIZE);

    let mut vertex_sets = Vec::with_capacity(headers.len());
    for (index, set_header) in headers.iter().enumerate() {
        vertex_sets.push(read_vertex_set(&mut cursor, base, index, set_header, &mut sections)?);
    }

    let face_sets = if face_set_ref.is_empty() {
        Vec::new()
    } else {
        let start = checked_target(&cursor, base, face_set_ref.offset, 8)?;
        cursor.seek_to(start)?;
        let sets = read_padded(&mut cursor, face_set_ref.count as usize, 4, read_face_set)?;
        sections.push(SectionInfo::new("face_sets", start, sets.len(), cursor.position() - start));
        sets
    };

    let meshes = read_section(&mut cursor, base, mesh_ref, MESH_SIZE, |c| {
        Ok(Mesh {
            vertex_set: c.read()?,
            face_set: c.read()?,
            material: c.read()?,
            flags: c.read()?,
        })
    })?;
    push_fixed(&mut sections, "meshes", base, mesh_ref, MESH_SIZE);

    let materials = read_section(&mut cursor, base, material_ref, MATERIAL_SIZE, |c| read_material(c, base))?;
    push_fixed(&mut sections, "materials", base, material_ref, MATERIAL_SIZE);

    debug!(
        "model: {} vertex sets, {} face sets, {} meshes, {} materials",
        vertex_sets.len(),
        face_sets.len(),
        meshes.len(),
        materials.len()
    );

    Ok((
        Model {
            version,
            bounding_radius,
            vertex_sets,
            face_sets,
            meshes,
            materials,
        },
        sections,
    ))
}

fn push_fixed(sections: &mut Vec<SectionInfo>, name: &str, base: usize, section: SectionRef, stride: usize) {
    if !section.is_empty() {
        let count = section.count as usize;
        sections.push(SectionInfo::new(
            name,
            base + section.offset as usize,
            count,
            count * stride,
        ));
    }
}

struct VertexSetHeader {
    layout: u32,
    stride: u32,
    vertex_count: u32,
    vertex_offset: u32,
    palette_count: u32,
    palette_offset: u32,
}

fn read_vertex_set_header(cursor: &mut ByteCursor) -> Result<VertexSetHeader> {
    Ok(VertexSetHeader {
        layout: cursor.read()?,
        stride: cursor.read()?,
        vertex_count: cursor.read()?,
        vertex_offset: cursor.read()?,
        palette_count: cursor.read()?,
        palette_offset: cursor.read()?,
    })
}

fn read_vertex_set(
    cursor: &mut ByteCursor,
    base: usize,
    index: usize,
    header: &VertexSetHeader,
    sections: &mut Vec<SectionInfo>,
) -> Result<VertexSet> {
    let layout = VertexLayout::from_bits_truncate(header.layout);
    if layout.bits() != header.layout {
        warn!(
            "vertex set {index}: ignoring unknown layout bits {:#x}",
            header.layout & !VertexLayout::all().bits()
        );
    }
    if layout.is_empty() && (header.stride != 0 || header.vertex_count != 0) {
        return Err(Error::InvalidVertexSet {
            index,
            message: format!(
                "{} vertices of stride {} with no known attribute",
                header.vertex_count, header.stride
            ),
        });
    }
    let layout_size = layout.vertex_size();
    if header.stride < layout_size {
        return Err(Error::StrideTooSmall {
            stride: header.stride,
            layout_size,
        });
    }

    let mut set = VertexSet {
        layout,
        stride: header.stride,
        ..VertexSet::default()
    };

    let count = header.vertex_count as usize;
    let stride = header.stride as usize;
    if count > 0 {
        let data_size = count.saturating_mul(stride);
        let start = checked_target(cursor, base, header.vertex_offset, data_size)?;
        sections.push(SectionInfo::new(format!("vertex_data[{index}]"), start, count, data_size));

        for vertex in 0..count {
            cursor.seek_to(start + vertex * stride)?;
            if layout.contains(VertexLayout::POSITION) {
                set.positions.push(cursor.read()?);
            }
            if layout.contains(VertexLayout::NORMAL) {
                set.normals.push(cursor.read()?);
            }
            if layout.contains(VertexLayout::COLOR) {
                set.colors.push(cursor.read()?);
            }
            if layout.contains(VertexLayout::UV0) {
                set.uv0.push(cursor.read()?);
            }
            if layout.contains(VertexLayout::UV1) {
                set.uv1.push(cursor.read()?);
            }
            if layout.contains(VertexLayout::WEIGHTS) {
                set.weights.push(cursor.read()?);
            }
            if layout.contains(VertexLayout::BONE_INDICES) {
                set.bone_indices.push(cursor.read()?);
            }
        }
    }

    if header.palette_offset != 0 && header.palette_count > 0 {
        let palette = SectionRef::new(header.palette_count, header.palette_offset);
        set.bone_palette = read_section(cursor, base, palette, 2, |c| c.read::<u16>())?;
        push_fixed(sections, &format!("bone_palette[{index}]"), base, palette, 2);
    }

    Ok(set)
}

fn read_face_set(cursor: &mut ByteCursor) -> Result<FaceSet> {
    let topology = Topology::try_from(cursor.read::<u32>()?)?;
    let index_count = cursor.read::<u32>()? as usize;
    if index_count.saturating_mul(2) > cursor.remaining() {
        return Err(Error::UnexpectedEof {
            offset: cursor.position(),
            need: index_count.saturating_mul(2),
            remaining: cursor.remaining(),
        });
    }
    let indices = (0..index_count)
        .map(|_| cursor.read::<u16>())
        .collect::<Result<Vec<_>>>()?;
    Ok(FaceSet { topology, indices })
}

fn read_material(cursor: &mut ByteCursor, base: usize) -> Result<Material> {
    let name_offset: u32 = cursor.read()?;
    let texture_offset: u32 = cursor.read()?;
    let diffuse = cursor.read()?;
    let blend_mode = cursor.read()?;
    Ok(Material {
        name: resolve_string(cursor, base, name_offset, NAME_MAX_LEN)?,
        texture: resolve_optional_string(cursor, base, texture_offset, NAME_MAX_LEN)?,
        diffuse,
        blend_mode,
    })
}
