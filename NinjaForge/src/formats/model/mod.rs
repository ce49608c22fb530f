//! Model containers (NIFL root tag `OBJC`)
//!
//! A model is four sections hanging off the root struct: vertex sets, face
//! sets, meshes and materials. Meshes refer to the others by index, so the
//! order of every section is part of the data.

mod document;
mod reader;
mod writer;

pub use document::{FaceSet, Material, Mesh, Model, Topology, VertexLayout, VertexSet};
pub use reader::{parse_model_bytes, parse_model_with_sections, read_model};
pub use writer::{serialize_model, write_model};

pub const MODEL_TAG: &[u8; 4] = b"OBJC";

const VERTEX_SET_SIZE: usize = 0x20;
const MESH_SIZE: usize = 0x10;
const MATERIAL_SIZE: usize = 0x20;
const NAME_MAX_LEN: usize = 0x100;
