//! Format-neutral views of decoded assets
//!
//! - [`mesh`]: flat triangle meshes with skeleton-global bone indices
//! - [`skeleton`]: bone hierarchy with matrix transforms
//!
//! These types are meant as the hand-off point to other geometry libraries;
//! nothing here touches container bytes.

pub mod mesh;
pub mod skeleton;

pub use mesh::{meshes_to_model, model_to_meshes, triangulate, GenericMaterial, GenericMesh};
pub use skeleton::{generic_to_skeleton, skeleton_to_generic, GenericBone, GenericSkeleton};
