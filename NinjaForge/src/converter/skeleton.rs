//! Skeleton <-> generic bone hierarchy

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::formats::skeleton::{Bone, Skeleton};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericBone {
    pub name: String,
    pub parent: Option<usize>,
    /// Transform relative to the parent bone.
    pub local: Mat4,
    pub inverse_bind: Mat4,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenericSkeleton {
    pub bones: Vec<GenericBone>,
}

impl GenericSkeleton {
    /// Model-space transform of every bone.
    ///
    /// Parents are expected to precede their children; a bone whose parent
    /// comes later is treated as a root.
    pub fn world_transforms(&self) -> Vec<Mat4> {
        let mut world: Vec<Mat4> = Vec::with_capacity(self.bones.len());
        for (i, bone) in self.bones.iter().enumerate() {
            let transform = match bone.parent {
                Some(p) if p < i => world[p] * bone.local,
                _ => bone.local,
            };
            world.push(transform);
        }
        world
    }
}

pub fn skeleton_to_generic(skeleton: &Skeleton) -> GenericSkeleton {
    let bones = skeleton
        .bones
        .iter()
        .map(|bone| {
            let rotation = Quat::from_euler(EulerRot::XYZ, bone.rotation.x, bone.rotation.y, bone.rotation.z);
            GenericBone {
                name: bone.name.clone(),
                parent: usize::try_from(bone.parent).ok(),
                local: Mat4::from_scale_rotation_translation(bone.scale, rotation, bone.position),
                inverse_bind: bone.inverse_bind,
            }
        })
        .collect();
    GenericSkeleton { bones }
}

/// Build skeleton records from a generic hierarchy.
///
/// Child and sibling links are derived from the parent indices, children in
/// bone order. Roots are chained as siblings of each other.
pub fn generic_to_skeleton(generic: &GenericSkeleton) -> Skeleton {
    let mut bones: Vec<Bone> = generic
        .bones
        .iter()
        .map(|bone| {
            let (scale, rotation, position) = bone.local.to_scale_rotation_translation();
            let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
            Bone {
                name: bone.name.clone(),
                parent: bone.parent.map_or(-1, |p| p as i32),
                position,
                rotation: Vec3::new(x, y, z),
                scale,
                inverse_bind: bone.inverse_bind,
                ..Bone::default()
            }
        })
        .collect();

    let count = bones.len();
    // Last child seen per parent; index `count` collects the roots.
    let mut last_child: Vec<Option<usize>> = vec![None; count + 1];
    for (i, source) in generic.bones.iter().enumerate() {
        let parent = source.parent.filter(|&p| p < count).unwrap_or(count);
        match last_child[parent] {
            Some(prev) => bones[prev].next_sibling = i as i32,
            None if parent < count => bones[parent].first_child = i as i32,
            None => {}
        }
        last_child[parent] = Some(i);
    }

    Skeleton {
        bones,
        effect_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm() -> Skeleton {
        let bone = |name: &str, parent: i32, position: Vec3| Bone {
            name: name.to_string(),
            parent,
            position,
            rotation: Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            ..Bone::default()
        };
        Skeleton {
            bones: vec![
                bone("root", -1, Vec3::ZERO),
                bone("upper", 0, Vec3::X),
                bone("lower", 1, Vec3::X),
                bone("thumb", 0, Vec3::Y),
            ],
            effect_count: 0,
        }
    }

    #[test]
    fn test_links_recomputed_from_parents() {
        let skeleton = generic_to_skeleton(&skeleton_to_generic(&arm()));
        let links: Vec<_> = skeleton
            .bones
            .iter()
            .map(|b| (b.parent, b.first_child, b.next_sibling))
            .collect();
        assert_eq!(links, vec![(-1, 1, -1), (0, 2, 3), (1, -1, -1), (0, -1, -1)]);
    }

    #[test]
    fn test_roots_chain_as_siblings() {
        let generic = GenericSkeleton {
            bones: (0..3)
                .map(|i| GenericBone {
                    name: format!("root{i}"),
                    parent: None,
                    local: Mat4::IDENTITY,
                    inverse_bind: Mat4::IDENTITY,
                })
                .collect(),
        };
        let skeleton = generic_to_skeleton(&generic);
        let siblings: Vec<_> = skeleton.bones.iter().map(|b| b.next_sibling).collect();
        assert_eq!(siblings, vec![1, 2, -1]);
    }

    #[test]
    fn test_local_transform_survives_decomposition() {
        let generic = skeleton_to_generic(&arm());
        let back = skeleton_to_generic(&generic_to_skeleton(&generic));
        for (a, b) in generic.bones.iter().zip(&back.bones) {
            assert!(a.local.abs_diff_eq(b.local, 1e-5), "{}", a.name);
        }
    }

    #[test]
    fn test_world_transforms_compose() {
        let world = skeleton_to_generic(&arm()).world_transforms();
        // Each bone turns a quarter around Z, so "lower" sits at root + R(X) + R(R(X)).
        let lower = world[2].transform_point3(Vec3::ZERO);
        assert!(lower.abs_diff_eq(Vec3::new(-1.0, 1.0, 0.0), 1e-5), "{lower}");
    }
}
