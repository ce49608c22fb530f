//! Model container writing

use std::path::Path;

use super::document::{Model, VertexLayout, VertexSet};
use super::MODEL_TAG;
use crate::binary::{write_padded, write_section, ByteWriter, OffsetTable, Slot};
use crate::error::Result;
use crate::formats::nifl::NiflBuilder;

/// Write a model container to disk.
///
/// # Arguments
/// * `model` - Model to encode
/// * `path` - Output file path
///
/// # Errors
/// Returns an error if the model fails to encode or the file cannot be written.
pub fn write_model<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let bytes = serialize_model(model)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a model into a NIFL container.
///
/// Layout after the root struct: vertex set records, each set's vertex data
/// and bone palette, face sets, meshes, materials, then the string table.
/// Every block starts on a 16-byte boundary except the face set records,
/// which are packed with 4-byte padding between them.
///
/// # Returns
/// The complete container, header through NEND chunk.
///
/// # Errors
/// `StrideTooSmall` or `InvalidVertexSet` if a vertex set does not match its
/// layout, `NonAsciiString` or `InteriorNul` for unstorable material names.
pub fn serialize_model(model: &Model) -> Result<Vec<u8>> {
    for (index, set) in model.vertex_sets.iter().enumerate() {
        set.validate(index)?;
    }

    let mut builder = NiflBuilder::new();
    let NiflBuilder {
        writer,
        offsets,
        strings,
    } = &mut builder;

    writer.write_bytes(MODEL_TAG);
    writer.write(model.version);
    writer.write(model.bounding_radius);
    let vertex_set_slot = write_count_and_reserve(writer, offsets, model.vertex_sets.len());
    let face_set_slot = write_count_and_reserve(writer, offsets, model.face_sets.len());
    let mesh_slot = write_count_and_reserve(writer, offsets, model.meshes.len());
    let material_slot = write_count_and_reserve(writer, offsets, model.materials.len());

    let mut data_slots = Vec::with_capacity(model.vertex_sets.len());
    write_section(writer, offsets, vertex_set_slot, 16, &model.vertex_sets, |w, o, set| {
        w.write(set.layout.bits());
        w.write(set.stride);
        w.write(set.vertex_count() as u32);
        let vertex_slot = o.reserve(w);
        w.write(set.bone_palette.len() as u32);
        let palette_slot = o.reserve(w);
        w.write_zeros(8);
        data_slots.push((vertex_slot, palette_slot));
        Ok(())
    })?;

    for (set, (vertex_slot, palette_slot)) in model.vertex_sets.iter().zip(data_slots) {
        if set.vertex_count() == 0 {
            offsets.fill_null(vertex_slot);
        } else {
            writer.align(16);
            offsets.fill_here(vertex_slot, writer);
            write_vertices(writer, set);
        }
        write_section(writer, offsets, palette_slot, 16, &set.bone_palette, |w, _, &bone| {
            w.write(bone);
            Ok(())
        })?;
    }

    if model.face_sets.is_empty() {
        offsets.fill_null(face_set_slot);
    } else {
        writer.align(16);
        offsets.fill_here(face_set_slot, writer);
        write_padded(writer, &model.face_sets, 4, |w, set| {
            w.write(set.topology.as_u32());
            w.write(set.indices.len() as u32);
            for &index in &set.indices {
                w.write(index);
            }
            Ok(())
        })?;
    }

    write_section(writer, offsets, mesh_slot, 16, &model.meshes, |w, _, mesh| {
        w.write(mesh.vertex_set);
        w.write(mesh.face_set);
        w.write(mesh.material);
        w.write(mesh.flags);
        Ok(())
    })?;

    write_section(writer, offsets, material_slot, 16, &model.materials, |w, o, material| {
        strings.intern_new(&material.name, o, w)?;
        match &material.texture {
            Some(texture) => strings.intern_new(texture, o, w)?,
            None => w.write(0u32),
        }
        w.write(material.diffuse);
        w.write(material.blend_mode);
        w.write(0u32);
        Ok(())
    })?;

    Ok(builder.finish())
}

fn write_count_and_reserve(writer: &mut ByteWriter, offsets: &mut OffsetTable, count: usize) -> Slot {
    writer.write(count as u32);
    offsets.reserve(writer)
}

fn write_vertices(writer: &mut ByteWriter, set: &VertexSet) {
    let stride = set.stride as usize;
    for i in 0..set.vertex_count() {
        let start = writer.position();
        if set.layout.contains(VertexLayout::POSITION) {
            writer.write(set.positions[i]);
        }
        if set.layout.contains(VertexLayout::NORMAL) {
            writer.write(set.normals[i]);
        }
        if set.layout.contains(VertexLayout::COLOR) {
            writer.write(set.colors[i]);
        }
        if set.layout.contains(VertexLayout::UV0) {
            writer.write(set.uv0[i]);
        }
        if set.layout.contains(VertexLayout::UV1) {
            writer.write(set.uv1[i]);
        }
        if set.layout.contains(VertexLayout::WEIGHTS) {
            writer.write(set.weights[i]);
        }
        if set.layout.contains(VertexLayout::BONE_INDICES) {
            writer.write(set.bone_indices[i]);
        }
        writer.write_zeros(stride - (writer.position() - start));
    }
}
