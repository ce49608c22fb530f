//! Skeleton containers (NIFL root tag `NDTR`)
//!
//! The root holds a bone count, the bone array offset and an effect count.
//! Each bone is a fixed 0x78-byte record; hierarchy links are stored both as a
//! parent index and as first-child / next-sibling indices (-1 for none).

use std::path::Path;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binary::{
    checked_target, read_section, resolve_string, write_section, ByteCursor, Endian, SectionInfo, SectionRef,
};
use crate::error::{Error, Result};
use crate::formats::nifl::{NiflBuilder, NiflHeader};

pub const SKELETON_TAG: &[u8; 4] = b"NDTR";

const ROOT_SIZE: usize = 0x10;
const BONE_SIZE: usize = 0x78;
const NAME_MAX_LEN: usize = 0x100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    pub flags: u16,
    #[serde(default)]
    pub unk: u16,
    /// Parent bone index, -1 for a root.
    pub parent: i32,
    pub first_child: i32,
    pub next_sibling: i32,
    pub position: Vec3,
    /// Euler angles in radians, XYZ order.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub inverse_bind: Mat4,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            name: String::new(),
            flags: 0,
            unk: 0,
            parent: -1,
            first_child: -1,
            next_sibling: -1,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            inverse_bind: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    #[serde(default)]
    pub effect_count: u32,
}

impl Skeleton {
    /// Index of the first bone named `name`.
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }
}

/// Read a skeleton container from disk.
///
/// # Arguments
/// * `path` - Path to a NIFL skeleton
///
/// # Returns
/// The decoded skeleton with bones in file order.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid skeleton container.
pub fn read_skeleton<P: AsRef<Path>>(path: P) -> Result<Skeleton> {
    let data = std::fs::read(path)?;
    parse_skeleton_bytes(&data)
}

/// Parse a skeleton container from bytes.
///
/// # Errors
/// `InvalidChunkMagic` for a wrong root tag, malformed-input errors for
/// offsets outside the buffer.
pub fn parse_skeleton_bytes(data: &[u8]) -> Result<Skeleton> {
    parse_skeleton_with_sections(data).map(|(skeleton, _)| skeleton)
}

/// Parse a skeleton and report where its sections sit in the buffer.
///
/// # Errors
/// Same as [`parse_skeleton_bytes`].
pub fn parse_skeleton_with_sections(data: &[u8]) -> Result<(Skeleton, Vec<SectionInfo>)> {
    let header = NiflHeader::read(data)?;
    let base = header.base;
    let mut cursor = ByteCursor::new(data, Endian::Little);

    let root = checked_target(&cursor, base, header.root_offset, ROOT_SIZE)?;
    cursor.seek_to(root)?;
    let tag = cursor.read_magic()?;
    if &tag != SKELETON_TAG {
        return Err(Error::InvalidChunkMagic {
            expected: "NDTR",
            found: tag,
            offset: root,
        });
    }
    let bone_ref = SectionRef::read(&mut cursor)?;
    let effect_count = cursor.read()?;

    let bones = read_section(&mut cursor, base, bone_ref, BONE_SIZE, |c| {
        let flags = c.read()?;
        let unk = c.read()?;
        let parent = c.read()?;
        let first_child = c.read()?;
        let next_sibling = c.read()?;
        let position = c.read()?;
        let rotation = c.read()?;
        let scale = c.read()?;
        let inverse_bind = c.read()?;
        let name_offset: u32 = c.read()?;
        Ok(Bone {
            name: resolve_string(c, base, name_offset, NAME_MAX_LEN)?,
            flags,
            unk,
            parent,
            first_child,
            next_sibling,
            position,
            rotation,
            scale,
            inverse_bind,
        })
    })?;

    let mut sections = vec![SectionInfo::new("root", root, 1, ROOT_SIZE)];
    if !bone_ref.is_empty() {
        sections.push(SectionInfo::new(
            "bones",
            base + bone_ref.offset as usize,
            bones.len(),
            bones.len() * BONE_SIZE,
        ));
    }
    debug!("skeleton: {} bones", bones.len());

    Ok((Skeleton { bones, effect_count }, sections))
}

/// Write a skeleton container to disk.
///
/// # Errors
/// Returns an error if the skeleton fails to encode or the file cannot be written.
pub fn write_skeleton<P: AsRef<Path>>(skeleton: &Skeleton, path: P) -> Result<()> {
    let bytes = serialize_skeleton(skeleton)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a skeleton into a NIFL container. Bone names share one string
/// table entry per distinct name.
///
/// # Errors
/// `NonAsciiString` or `InteriorNul` if a bone name cannot be stored.
pub fn serialize_skeleton(skeleton: &Skeleton) -> Result<Vec<u8>> {
    let mut builder = NiflBuilder::new();
    let NiflBuilder {
        writer,
        offsets,
        strings,
    } = &mut builder;

    writer.write_bytes(SKELETON_TAG);
    writer.write(skeleton.bones.len() as u32);
    let bone_slot = offsets.reserve(writer);
    writer.write(skeleton.effect_count);

    write_section(writer, offsets, bone_slot, 16, &skeleton.bones, |w, o, bone| {
        w.write(bone.flags);
        w.write(bone.unk);
        w.write(bone.parent);
        w.write(bone.first_child);
        w.write(bone.next_sibling);
        w.write(bone.position);
        w.write(bone.rotation);
        w.write(bone.scale);
        w.write(bone.inverse_bind);
        strings.intern_new(&bone.name, o, w)
    })?;

    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_bone_skeleton() -> Skeleton {
        Skeleton {
            bones: vec![
                Bone {
                    name: "root".to_string(),
                    first_child: 1,
                    ..Bone::default()
                },
                Bone {
                    name: "spine".to_string(),
                    parent: 0,
                    position: Vec3::new(0.0, 1.0, 0.0),
                    rotation: Vec3::new(0.0, 0.5, 0.0),
                    inverse_bind: Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
                    ..Bone::default()
                },
            ],
            effect_count: 0,
        }
    }

    #[test]
    fn test_skeleton_round_trip() {
        let skeleton = two_bone_skeleton();
        let bytes = serialize_skeleton(&skeleton).unwrap();
        assert_eq!(parse_skeleton_bytes(&bytes).unwrap(), skeleton);
    }

    #[test]
    fn test_bone_record_size() {
        let skeleton = two_bone_skeleton();
        let bytes = serialize_skeleton(&skeleton).unwrap();
        let (_, sections) = parse_skeleton_with_sections(&bytes).unwrap();
        let bones = &sections[1];
        assert_eq!(bones.size, 2 * 0x78);
        assert_eq!(bones.offset % 16, 0);
        // Names follow the bone array directly.
        assert_eq!(&bytes[bones.end()..bones.end() + 5], b"root\0");
    }

    #[test]
    fn test_duplicate_names_share_storage() {
        let mut skeleton = two_bone_skeleton();
        skeleton.bones[1].name = "root".to_string();
        let bytes = serialize_skeleton(&skeleton).unwrap();
        let (_, sections) = parse_skeleton_with_sections(&bytes).unwrap();
        let end = sections[1].end();
        assert_eq!(&bytes[end..end + 5], b"root\0");
        // Only one copy of the string, followed by padding.
        assert!(bytes[end + 5..end + 11].iter().all(|&b| b == 0));
        assert_eq!(parse_skeleton_bytes(&bytes).unwrap(), skeleton);
    }

    #[test]
    fn test_find_bone() {
        let skeleton = two_bone_skeleton();
        assert_eq!(skeleton.find_bone("spine"), Some(1));
        assert_eq!(skeleton.find_bone("tail"), None);
    }
}
