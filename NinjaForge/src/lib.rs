//! # NinjaForge
//!
//! A pure-Rust codec for the relocatable binary containers used by a family of
//! console-era game assets: models, skeletons and multi-model packages in the
//! little-endian NIFL envelope, and event scripts in the big-endian ARC envelope.
//!
//! Every container pairs a body of records, where pointers are stored as
//! offsets from a base, with a compact relocation table listing the position
//! of each such offset. Decoding follows offsets with bounds checks; encoding
//! lays records out, backfills offsets and emits the relocation table.
//!
//! ## Quick Start
//!
//! ### Reading any container
//!
//! ```no_run
//! use ninjaforge::formats::{inspect, Asset};
//!
//! let asset = Asset::read("pl0000.aqp")?;
//! println!("decoded a {}", asset.kind());
//!
//! let info = inspect(&std::fs::read("pl0000.aqp")?)?;
//! for section in &info.sections {
//!     println!("{} at {:#x}", section.name, section.offset);
//! }
//! # Ok::<(), ninjaforge::Error>(())
//! ```
//!
//! ### Building an event script
//!
//! ```
//! use ninjaforge::formats::event::{serialize_event, parse_event_bytes, EventContainer, EventFile, Payload, Script};
//!
//! let file = EventFile {
//!     containers: vec![EventContainer {
//!         scripts: vec![Script::new("set_bgm", Payload::Short(7))?],
//!         ..EventContainer::default()
//!     }],
//! };
//! let bytes = serialize_event(&file)?;
//! assert_eq!(parse_event_bytes(&bytes)?, file);
//! # Ok::<(), ninjaforge::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `ninjaforge` command-line binary

pub mod batch;
pub mod binary;
pub mod converter;
pub mod error;
pub mod formats;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::binary::{ByteCursor, ByteWriter, Endian, OffsetTable, SectionInfo, StringTable};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::formats::{
        detect_format, inspect, relocations, round_trip, Asset, AssetKind, ContainerInfo,
    };
    pub use crate::formats::{
        Bone, EventContainer, EventFile, FaceSet, Material, Mesh, Model, Payload, Script, Skeleton,
        Topology, VertexLayout, VertexSet,
    };

    pub use crate::batch::{batch_process, find_asset_files, BatchOptions, BatchResult};
    pub use crate::converter::{
        generic_to_skeleton, meshes_to_model, model_to_meshes, skeleton_to_generic, GenericMesh,
        GenericSkeleton,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
