//! Model <-> generic triangle meshes

use std::collections::HashMap;

use glam::{Vec2, Vec3, Vec4};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::formats::model::{FaceSet, Material, Mesh, Model, Topology, VertexLayout, VertexSet};

/// A self-contained triangle mesh.
///
/// Every attribute array is either empty or as long as `positions`.
/// `bone_indices` refer to skeleton bones directly, not to a palette.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenericMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<[u8; 4]>,
    pub bone_weights: Vec<Vec4>,
    pub bone_indices: Vec<[u16; 4]>,
    pub faces: Vec<[u32; 3]>,
    /// Material index per face. Empty means every face uses material 0.
    pub material_ids: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericMaterial {
    pub name: String,
    pub texture: Option<String>,
    pub diffuse: Vec4,
}

impl From<&Material> for GenericMaterial {
    fn from(material: &Material) -> Self {
        Self {
            name: material.name.clone(),
            texture: material.texture.clone(),
            diffuse: material.diffuse,
        }
    }
}

/// Expand an index buffer into triangles.
///
/// Strips alternate winding per triangle; triangles that reuse a vertex are
/// dropped, which is how strips encode restarts.
pub fn triangulate(topology: Topology, indices: &[u16]) -> Vec<[u32; 3]> {
    match topology {
        Topology::TriangleList => indices
            .chunks_exact(3)
            .map(|t| [u32::from(t[0]), u32::from(t[1]), u32::from(t[2])])
            .collect(),
        Topology::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .filter(|(_, t)| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
            .map(|(i, t)| {
                let (a, b, c) = (u32::from(t[0]), u32::from(t[1]), u32::from(t[2]));
                if i & 1 == 1 {
                    [a, b, c]
                } else {
                    [c, b, a]
                }
            })
            .collect(),
    }
}

/// Split a model into one generic mesh per mesh record.
///
/// # Errors
/// `InvalidMesh` if a record points at a missing vertex set or face set, a
/// face uses a vertex the set does not have, or a bone index falls outside
/// the palette.
pub fn model_to_meshes(model: &Model) -> Result<Vec<GenericMesh>> {
    let mut meshes = Vec::with_capacity(model.meshes.len());

    for (index, record) in model.meshes.iter().enumerate() {
        let set = model
            .vertex_sets
            .get(record.vertex_set as usize)
            .ok_or_else(|| Error::InvalidMesh {
                index,
                message: format!("vertex set {} does not exist", record.vertex_set),
            })?;
        let face_set = model
            .face_sets
            .get(record.face_set as usize)
            .ok_or_else(|| Error::InvalidMesh {
                index,
                message: format!("face set {} does not exist", record.face_set),
            })?;

        let vertex_count = set.vertex_count();
        let faces = triangulate(face_set.topology, &face_set.indices);
        if let Some(bad) = faces.iter().flatten().find(|&&v| v as usize >= vertex_count) {
            return Err(Error::InvalidMesh {
                index,
                message: format!("face uses vertex {bad}, set has {vertex_count}"),
            });
        }

        let bone_indices = if set.bone_palette.is_empty() {
            set.bone_indices.iter().map(|b| b.map(u16::from)).collect()
        } else {
            set.bone_indices
                .iter()
                .map(|local| {
                    let mut global = [0u16; 4];
                    for (slot, &l) in global.iter_mut().zip(local) {
                        *slot = *set.bone_palette.get(l as usize).ok_or_else(|| Error::InvalidMesh {
                            index,
                            message: format!("bone index {l} outside palette of {}", set.bone_palette.len()),
                        })?;
                    }
                    Ok(global)
                })
                .collect::<Result<Vec<_>>>()?
        };

        let name = model
            .materials
            .get(record.material as usize)
            .map_or_else(|| format!("mesh_{index}"), |m| m.name.clone());
        trace!("mesh {index} ({name}): {vertex_count} vertices, {} faces", faces.len());

        meshes.push(GenericMesh {
            name,
            positions: set.positions.clone(),
            normals: set.normals.clone(),
            uvs: set.uv0.clone(),
            colors: set.colors.clone(),
            bone_weights: set.weights.clone(),
            bone_indices,
            material_ids: vec![record.material; faces.len()],
            faces,
        });
    }

    debug!("converted {} meshes", meshes.len());
    Ok(meshes)
}

/// Build a model from generic meshes.
///
/// Each mesh becomes one vertex set. Its faces are grouped by material id,
/// in order of first use, and each group gets its own face set and mesh
/// record pointing at that shared vertex set.
///
/// # Arguments
/// * `meshes` - Triangle meshes to convert
/// * `materials` - Materials the meshes' `material_ids` index into
///
/// # Returns
/// A model ready for [`serialize_model`](crate::formats::model::serialize_model).
///
/// # Errors
/// `InvalidMesh` if a mesh has more vertices than 16-bit indices can reach,
/// uses more than 256 distinct bones, has attribute arrays whose lengths
/// disagree with its positions, or has a material id count that is neither
/// zero nor its face count.
pub fn meshes_to_model(meshes: &[GenericMesh], materials: &[GenericMaterial]) -> Result<Model> {
    let mut model = Model {
        materials: materials
            .iter()
            .map(|m| Material {
                name: m.name.clone(),
                texture: m.texture.clone(),
                diffuse: m.diffuse,
                ..Material::default()
            })
            .collect(),
        ..Model::default()
    };

    for (index, mesh) in meshes.iter().enumerate() {
        let vertex_count = mesh.positions.len();
        if vertex_count > usize::from(u16::MAX) + 1 {
            return Err(Error::InvalidMesh {
                index,
                message: format!("{vertex_count} vertices exceed 16-bit indices"),
            });
        }

        let mut layout = VertexLayout::POSITION;
        for (flag, len) in [
            (VertexLayout::NORMAL, mesh.normals.len()),
            (VertexLayout::COLOR, mesh.colors.len()),
            (VertexLayout::UV0, mesh.uvs.len()),
            (VertexLayout::WEIGHTS, mesh.bone_weights.len()),
            (VertexLayout::BONE_INDICES, mesh.bone_indices.len()),
        ] {
            match len {
                0 => {}
                n if n == vertex_count => layout |= flag,
                n => {
                    return Err(Error::InvalidMesh {
                        index,
                        message: format!("{flag:?} has {n} entries, expected {vertex_count}"),
                    })
                }
            }
        }

        let (bone_palette, local_indices) = build_palette(index, &mesh.bone_indices)?;
        let groups = group_faces_by_material(index, mesh)?;

        let vertex_set = model.vertex_sets.len() as u32;
        model.vertex_sets.push(VertexSet {
            layout,
            stride: layout.vertex_size(),
            positions: mesh.positions.clone(),
            normals: mesh.normals.clone(),
            colors: mesh.colors.clone(),
            uv0: mesh.uvs.clone(),
            uv1: Vec::new(),
            weights: mesh.bone_weights.clone(),
            bone_indices: local_indices,
            bone_palette,
        });
        if groups.len() > 1 {
            trace!("mesh {index} ({}): split into {} materials", mesh.name, groups.len());
        }
        for (material, indices) in groups {
            model.meshes.push(Mesh {
                vertex_set,
                face_set: model.face_sets.len() as u32,
                material,
                flags: 0,
            });
            model.face_sets.push(FaceSet {
                topology: Topology::TriangleList,
                indices,
            });
        }
    }

    model.bounding_radius = meshes
        .iter()
        .flat_map(|m| &m.positions)
        .map(|p| p.length())
        .fold(0.0, f32::max);
    Ok(model)
}

/// Triangle-list indices per material id, in order of first use. A mesh
/// without faces still yields one empty group for material 0.
fn group_faces_by_material(index: usize, mesh: &GenericMesh) -> Result<IndexMap<u32, Vec<u16>>> {
    if !mesh.material_ids.is_empty() && mesh.material_ids.len() != mesh.faces.len() {
        return Err(Error::InvalidMesh {
            index,
            message: format!(
                "{} material ids for {} faces",
                mesh.material_ids.len(),
                mesh.faces.len()
            ),
        });
    }

    let vertex_count = mesh.positions.len();
    let mut groups: IndexMap<u32, Vec<u16>> = IndexMap::new();
    for (face_index, face) in mesh.faces.iter().enumerate() {
        let material = mesh.material_ids.get(face_index).copied().unwrap_or(0);
        let group = groups.entry(material).or_default();
        for &v in face {
            let local = u16::try_from(v)
                .ok()
                .filter(|&v| usize::from(v) < vertex_count)
                .ok_or_else(|| Error::InvalidMesh {
                    index,
                    message: format!("face uses vertex {v}, mesh has {vertex_count}"),
                })?;
            group.push(local);
        }
    }
    if groups.is_empty() {
        groups.insert(0, Vec::new());
    }
    Ok(groups)
}

/// Collect the distinct bones a mesh uses, in first-use order, and rewrite
/// the indices against that palette.
fn build_palette(index: usize, bone_indices: &[[u16; 4]]) -> Result<(Vec<u16>, Vec<[u8; 4]>)> {
    let mut palette = Vec::new();
    let mut lookup: HashMap<u16, u8> = HashMap::new();
    let mut local = Vec::with_capacity(bone_indices.len());

    for bones in bone_indices {
        let mut entry = [0u8; 4];
        for (slot, &bone) in entry.iter_mut().zip(bones) {
            *slot = match lookup.get(&bone) {
                Some(&l) => l,
                None => {
                    let l = u8::try_from(palette.len()).map_err(|_| Error::InvalidMesh {
                        index,
                        message: "more than 256 distinct bones".to_string(),
                    })?;
                    palette.push(bone);
                    lookup.insert(bone, l);
                    l
                }
            };
        }
        local.push(entry);
    }
    Ok((palette, local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_triangulate_list() {
        assert_eq!(
            triangulate(Topology::TriangleList, &[0, 1, 2, 2, 1, 3, 9]),
            vec![[0, 1, 2], [2, 1, 3]]
        );
    }

    #[test]
    fn test_triangulate_strip_alternates_and_drops_degenerates() {
        // 0 1 2 3 | 3 4 restart | 4 5 6
        let strip = [0, 1, 2, 3, 3, 4, 4, 5, 6];
        assert_eq!(
            triangulate(Topology::TriangleStrip, &strip),
            vec![[2, 1, 0], [1, 2, 3], [6, 5, 4]]
        );
    }

    fn skinned_model() -> Model {
        let mut set = VertexSet::from_positions(vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        set.layout |= VertexLayout::WEIGHTS | VertexLayout::BONE_INDICES;
        set.stride = set.layout.vertex_size();
        set.weights = vec![Vec4::X; 4];
        set.bone_indices = vec![[0, 0, 0, 0], [1, 0, 0, 0], [1, 1, 0, 0], [0, 1, 0, 0]];
        set.bone_palette = vec![7, 3];
        Model {
            vertex_sets: vec![set],
            face_sets: vec![FaceSet {
                topology: Topology::TriangleStrip,
                indices: vec![0, 1, 2, 3],
            }],
            meshes: vec![Mesh::default()],
            materials: vec![Material {
                name: "body".to_string(),
                ..Material::default()
            }],
            ..Model::default()
        }
    }

    #[test]
    fn test_model_to_meshes_maps_palette() {
        let meshes = model_to_meshes(&skinned_model()).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.name, "body");
        assert_eq!(mesh.faces, vec![[2, 1, 0], [1, 2, 3]]);
        assert_eq!(mesh.material_ids, vec![0, 0]);
        assert_eq!(mesh.bone_indices[1], [3, 7, 7, 7]);
        assert_eq!(mesh.bone_indices[2], [3, 3, 7, 7]);
    }

    #[test]
    fn test_model_to_meshes_rejects_bad_references() {
        let mut model = skinned_model();
        model.meshes[0].face_set = 4;
        assert!(matches!(model_to_meshes(&model), Err(Error::InvalidMesh { index: 0, .. })));

        let mut model = skinned_model();
        model.vertex_sets[0].bone_palette = vec![7];
        assert!(matches!(model_to_meshes(&model), Err(Error::InvalidMesh { .. })));

        let mut model = skinned_model();
        model.face_sets[0].indices = vec![0, 1, 8];
        assert!(matches!(model_to_meshes(&model), Err(Error::InvalidMesh { .. })));
    }

    #[test]
    fn test_meshes_to_model_and_back() {
        let original = model_to_meshes(&skinned_model()).unwrap();
        let materials = vec![GenericMaterial::from(&skinned_model().materials[0])];
        let model = meshes_to_model(&original, &materials).unwrap();

        let set = &model.vertex_sets[0];
        set.validate(0).unwrap();
        // Palette is rebuilt in first-use order.
        assert_eq!(set.bone_palette, vec![7, 3]);
        assert_eq!(model.face_sets[0].topology, Topology::TriangleList);
        assert!((model.bounding_radius - 1.0).abs() < f32::EPSILON);

        let again = model_to_meshes(&model).unwrap();
        assert_eq!(again, original);
    }

    #[test]
    fn test_meshes_to_model_splits_faces_by_material() {
        let quad = GenericMesh {
            name: "quad".to_string(),
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE],
            faces: vec![[0, 1, 2], [2, 1, 3], [0, 2, 3]],
            material_ids: vec![1, 0, 1],
            ..GenericMesh::default()
        };
        let materials = vec![
            GenericMaterial::from(&Material::default()),
            GenericMaterial::from(&Material {
                name: "trim".to_string(),
                ..Material::default()
            }),
        ];
        let model = meshes_to_model(&[quad], &materials).unwrap();

        assert_eq!(model.vertex_sets.len(), 1);
        assert_eq!(
            model.meshes,
            vec![
                Mesh {
                    vertex_set: 0,
                    face_set: 0,
                    material: 1,
                    flags: 0,
                },
                Mesh {
                    vertex_set: 0,
                    face_set: 1,
                    material: 0,
                    flags: 0,
                },
            ]
        );
        assert_eq!(model.face_sets[0].indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(model.face_sets[1].indices, vec![2, 1, 3]);

        let split = model_to_meshes(&model).unwrap();
        assert_eq!(split[0].name, "trim");
        assert_eq!(split[0].material_ids, vec![1, 1]);
        assert_eq!(split[1].material_ids, vec![0]);
    }

    #[test]
    fn test_meshes_to_model_rejects_short_material_ids() {
        let mesh = GenericMesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            faces: vec![[0, 1, 2], [2, 1, 0]],
            material_ids: vec![0],
            ..GenericMesh::default()
        };
        assert!(matches!(meshes_to_model(&[mesh], &[]), Err(Error::InvalidMesh { index: 0, .. })));
    }

    #[test]
    fn test_meshes_to_model_rejects_ragged_attributes() {
        let mesh = GenericMesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: vec![Vec3::Z],
            faces: vec![[0, 1, 2]],
            ..GenericMesh::default()
        };
        assert!(matches!(meshes_to_model(&[mesh], &[]), Err(Error::InvalidMesh { .. })));
    }

    #[test]
    fn test_meshes_to_model_rejects_wide_palette() {
        let mesh = GenericMesh {
            positions: vec![Vec3::ZERO; 100],
            bone_weights: vec![Vec4::ONE / 4.0; 100],
            bone_indices: (0..100u16).map(|i| [i * 4, i * 4 + 1, i * 4 + 2, i * 4 + 3]).collect(),
            ..GenericMesh::default()
        };
        assert!(matches!(meshes_to_model(&[mesh], &[]), Err(Error::InvalidMesh { .. })));
    }
}
