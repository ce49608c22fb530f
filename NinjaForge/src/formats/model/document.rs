//! Model records

use bitflags::bitflags;
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

bitflags! {
    /// Attributes interleaved in each vertex, in storage order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct VertexLayout: u32 {
        const POSITION     = 1 << 0;
        const NORMAL       = 1 << 1;
        const COLOR        = 1 << 2;
        const UV0          = 1 << 3;
        const UV1          = 1 << 4;
        const WEIGHTS      = 1 << 5;
        const BONE_INDICES = 1 << 6;
    }
}

impl VertexLayout {
    /// Bytes one vertex occupies with this layout.
    pub fn vertex_size(self) -> u32 {
        [
            (Self::POSITION, 12),
            (Self::NORMAL, 12),
            (Self::COLOR, 4),
            (Self::UV0, 8),
            (Self::UV1, 8),
            (Self::WEIGHTS, 16),
            (Self::BONE_INDICES, 4),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, size)| size)
        .sum()
    }
}

/// One vertex buffer with its attributes de-interleaved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VertexSet {
    pub layout: VertexLayout,
    /// Bytes per vertex on disk; at least `layout.vertex_size()`.
    pub stride: u32,
    #[serde(default)]
    pub positions: Vec<Vec3>,
    #[serde(default)]
    pub normals: Vec<Vec3>,
    #[serde(default)]
    pub colors: Vec<[u8; 4]>,
    #[serde(default)]
    pub uv0: Vec<Vec2>,
    #[serde(default)]
    pub uv1: Vec<Vec2>,
    #[serde(default)]
    pub weights: Vec<Vec4>,
    #[serde(default)]
    pub bone_indices: Vec<[u8; 4]>,
    /// Maps palette-local bone indices to skeleton bone indices.
    #[serde(default)]
    pub bone_palette: Vec<u16>,
}

impl VertexSet {
    /// A position-only vertex set with a tight stride.
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        Self {
            layout: VertexLayout::POSITION,
            stride: VertexLayout::POSITION.vertex_size(),
            positions,
            ..Self::default()
        }
    }

    fn attribute_lengths(&self) -> [(VertexLayout, &'static str, usize); 7] {
        [
            (VertexLayout::POSITION, "positions", self.positions.len()),
            (VertexLayout::NORMAL, "normals", self.normals.len()),
            (VertexLayout::COLOR, "colors", self.colors.len()),
            (VertexLayout::UV0, "uv0", self.uv0.len()),
            (VertexLayout::UV1, "uv1", self.uv1.len()),
            (VertexLayout::WEIGHTS, "weights", self.weights.len()),
            (VertexLayout::BONE_INDICES, "bone_indices", self.bone_indices.len()),
        ]
    }

    /// Length of the first attribute the layout declares.
    pub fn vertex_count(&self) -> usize {
        self.attribute_lengths()
            .iter()
            .find(|(flag, _, _)| self.layout.contains(*flag))
            .map_or(0, |(_, _, len)| *len)
    }

    /// Check that stride and attribute arrays agree with the layout.
    ///
    /// A set with no known attribute must also have a zero stride, since its
    /// vertex count cannot be recovered from any array.
    ///
    /// # Errors
    /// `StrideTooSmall` or `InvalidVertexSet` (with `index` as the set index).
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.layout.is_empty() && self.stride != 0 {
            return Err(Error::InvalidVertexSet {
                index,
                message: format!("stride {} with no known attribute", self.stride),
            });
        }
        let layout_size = self.layout.vertex_size();
        if self.stride < layout_size {
            return Err(Error::StrideTooSmall {
                stride: self.stride,
                layout_size,
            });
        }
        let count = self.vertex_count();
        for (flag, name, len) in self.attribute_lengths() {
            let expected = if self.layout.contains(flag) { count } else { 0 };
            if len != expected {
                return Err(Error::InvalidVertexSet {
                    index,
                    message: format!("{name} has {len} entries, expected {expected}"),
                });
            }
        }
        Ok(())
    }
}

/// How a face set's indices form triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Topology {
    #[default]
    TriangleList,
    TriangleStrip,
}

impl Topology {
    pub fn as_u32(self) -> u32 {
        match self {
            Topology::TriangleList => 0,
            Topology::TriangleStrip => 1,
        }
    }
}

impl TryFrom<u32> for Topology {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Topology::TriangleList),
            1 => Ok(Topology::TriangleStrip),
            _ => Err(Error::UnknownTopology { value }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaceSet {
    pub topology: Topology,
    pub indices: Vec<u16>,
}

/// Draw call: ties a vertex set and face set to a material by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertex_set: u32,
    pub face_set: u32,
    pub material: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub texture: Option<String>,
    pub diffuse: Vec4,
    #[serde(default)]
    pub blend_mode: u32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            texture: None,
            diffuse: Vec4::ONE,
            blend_mode: 0,
        }
    }
}

/// Decoded model container (root tag `OBJC`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Model {
    pub version: u32,
    pub bounding_radius: f32,
    pub vertex_sets: Vec<VertexSet>,
    pub face_sets: Vec<FaceSet>,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total vertices across all vertex sets.
    pub fn vertex_count(&self) -> usize {
        self.vertex_sets.iter().map(VertexSet::vertex_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_size() {
        assert_eq!(VertexLayout::POSITION.vertex_size(), 12);
        let skinned = VertexLayout::POSITION
            | VertexLayout::NORMAL
            | VertexLayout::UV0
            | VertexLayout::WEIGHTS
            | VertexLayout::BONE_INDICES;
        assert_eq!(skinned.vertex_size(), 12 + 12 + 8 + 16 + 4);
        assert_eq!(VertexLayout::empty().vertex_size(), 0);
    }

    #[test]
    fn test_vertex_set_validation() {
        let mut set = VertexSet::from_positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert_eq!(set.vertex_count(), 3);
        set.validate(0).unwrap();

        set.normals = vec![Vec3::Z];
        assert!(matches!(set.validate(2), Err(Error::InvalidVertexSet { index: 2, .. })));

        set.normals.clear();
        set.stride = 8;
        assert!(matches!(
            set.validate(0),
            Err(Error::StrideTooSmall { stride: 8, layout_size: 12 })
        ));
    }

    #[test]
    fn test_attributeless_set_needs_zero_stride() {
        VertexSet::default().validate(0).unwrap();

        let padded = VertexSet {
            stride: 16,
            ..VertexSet::default()
        };
        assert_eq!(padded.vertex_count(), 0);
        assert!(matches!(padded.validate(1), Err(Error::InvalidVertexSet { index: 1, .. })));
    }

    #[test]
    fn test_topology_discriminant() {
        assert_eq!(Topology::try_from(1).unwrap(), Topology::TriangleStrip);
        assert!(matches!(Topology::try_from(5), Err(Error::UnknownTopology { value: 5 })));
    }
}
