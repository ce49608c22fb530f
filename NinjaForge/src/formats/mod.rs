//! Container families and format detection
//!
//! - [`nifl`]: little-endian NIFL envelope, plus multi-model packages
//! - [`model`], [`skeleton`]: NIFL root structs
//! - [`arc`]: big-endian ARC envelope
//! - [`event`]: event scripts inside ARC

pub mod arc;
pub mod event;
pub mod model;
pub mod nifl;
pub mod skeleton;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binary::{Endian, SectionInfo};
use crate::error::{Error, Result};

pub use arc::{is_arc, ArcEntry, ArcEnvelope};
pub use event::{EventContainer, EventFile, Payload, PayloadLayout, Script};
pub use model::{FaceSet, Material, Mesh, Model, Topology, VertexLayout, VertexSet};
pub use nifl::NiflHeader;
pub use skeleton::{Bone, Skeleton};

/// Kind of asset a buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Model,
    Skeleton,
    Package,
    Event,
}

impl AssetKind {
    /// Container family the kind is stored in.
    pub fn family(self) -> &'static str {
        match self {
            AssetKind::Model | AssetKind::Skeleton => "NIFL",
            AssetKind::Package => "AFP",
            AssetKind::Event => "ARC",
        }
    }

    pub fn endian(self) -> Endian {
        match self {
            AssetKind::Event => Endian::Big,
            _ => Endian::Little,
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetKind::Model => "model",
            AssetKind::Skeleton => "skeleton",
            AssetKind::Package => "package",
            AssetKind::Event => "event",
        };
        write!(f, "{name}")
    }
}

/// Root tag of terrain collision containers, recognised but not decoded.
pub const COLLISION_TAG: &[u8; 4] = b"tcb\0";

/// Identify the asset in `data` by peeking its magic values.
///
/// Vendor pre-headers and type prefixes are looked through.
///
/// # Errors
/// `UnsupportedFormat` for unknown magic, `NotImplemented` for VTBF and for
/// terrain collision containers, and malformed-input errors if a NIFL envelope cannot be read far enough to
/// find its root tag.
pub fn detect_format(data: &[u8]) -> Result<AssetKind> {
    let Some(magic) = nifl::container_magic(data) else {
        return Err(Error::UnexpectedEof {
            offset: 0,
            need: 4,
            remaining: data.len(),
        });
    };

    if &magic == nifl::package::PACKAGE_MAGIC {
        return Ok(AssetKind::Package);
    }
    if &magic == nifl::VTBF_MAGIC {
        return Err(Error::NotImplemented {
            feature: "VTBF tagged-stream containers",
        });
    }
    if &magic == nifl::NIFL_MAGIC {
        let header = NiflHeader::read(data)?;
        let tag = header.root_tag(data)?;
        return match &tag {
            model::MODEL_TAG => Ok(AssetKind::Model),
            skeleton::SKELETON_TAG => Ok(AssetKind::Skeleton),
            COLLISION_TAG => Err(Error::NotImplemented {
                feature: "terrain collision (tcb) containers",
            }),
            _ => Err(Error::UnsupportedFormat { magic: tag }),
        };
    }
    if is_arc(data) {
        return Ok(AssetKind::Event);
    }
    Err(Error::UnsupportedFormat { magic })
}

/// A decoded asset of any supported kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Asset {
    Model(Model),
    Skeleton(Skeleton),
    Package(Vec<Model>),
    Event(EventFile),
}

impl Asset {
    /// Detect and decode.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let kind = detect_format(data)?;
        debug!("decoding {kind} ({} bytes)", data.len());
        Ok(match kind {
            AssetKind::Model => Asset::Model(model::parse_model_bytes(data)?),
            AssetKind::Skeleton => Asset::Skeleton(skeleton::parse_skeleton_bytes(data)?),
            AssetKind::Package => Asset::Package(nifl::package::parse_package_bytes(data)?),
            AssetKind::Event => Asset::Event(event::parse_event_bytes(data)?),
        })
    }

    /// Read and decode a file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::decode(&data)
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Asset::Model(model) => model::serialize_model(model),
            Asset::Skeleton(skeleton) => skeleton::serialize_skeleton(skeleton),
            Asset::Package(models) => nifl::package::serialize_package(models),
            Asset::Event(file) => event::serialize_event(file),
        }
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.encode()?)?;
        Ok(())
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Model(_) => AssetKind::Model,
            Asset::Skeleton(_) => AssetKind::Skeleton,
            Asset::Package(_) => AssetKind::Package,
            Asset::Event(_) => AssetKind::Event,
        }
    }
}

/// Decode, re-encode and decode again, failing if the asset changed.
///
/// Returns the decoded asset and the re-encoded bytes.
pub fn round_trip(data: &[u8]) -> Result<(Asset, Vec<u8>)> {
    let asset = Asset::decode(data)?;
    let encoded = asset.encode()?;
    let again = Asset::decode(&encoded)?;
    if again != asset {
        return Err(Error::RoundTripMismatch {
            kind: asset.kind().to_string(),
        });
    }
    Ok((asset, encoded))
}

/// Placement summary of a decoded container.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    pub kind: AssetKind,
    pub family: &'static str,
    pub endian: Endian,
    /// Absolute position body offsets are relative to (0 for packages).
    pub base: usize,
    pub file_size: usize,
    pub relocation_count: usize,
    pub sections: Vec<SectionInfo>,
}

/// Decode `data` and report its sections.
///
/// Every reported section lies within the buffer.
pub fn inspect(data: &[u8]) -> Result<ContainerInfo> {
    let kind = detect_format(data)?;
    let (base, relocation_count, sections) = match kind {
        AssetKind::Model => {
            let header = NiflHeader::read(data)?;
            let (_, sections) = model::parse_model_with_sections(data)?;
            (header.base, header.relocations.len(), sections)
        }
        AssetKind::Skeleton => {
            let header = NiflHeader::read(data)?;
            let (_, sections) = skeleton::parse_skeleton_with_sections(data)?;
            (header.base, header.relocations.len(), sections)
        }
        AssetKind::Package => {
            let (_, sections) = nifl::package::parse_package_with_sections(data)?;
            (0, relocations(data)?.len(), sections)
        }
        AssetKind::Event => {
            let envelope = ArcEnvelope::read(data)?;
            let (_, sections) = event::parse_event_with_sections(data)?;
            (arc::ARC_BASE, envelope.relocations.len(), sections)
        }
    };

    debug_assert!(sections.iter().all(|s| s.end() <= data.len()));
    Ok(ContainerInfo {
        kind,
        family: kind.family(),
        endian: kind.endian(),
        base,
        file_size: data.len(),
        relocation_count,
        sections,
    })
}

/// Relocation positions of any supported container, relative to its base.
///
/// For packages, the entries' tables are concatenated in entry order.
pub fn relocations(data: &[u8]) -> Result<Vec<u32>> {
    match detect_format(data)? {
        AssetKind::Model | AssetKind::Skeleton => Ok(NiflHeader::read(data)?.relocations),
        AssetKind::Event => Ok(ArcEnvelope::read(data)?.relocations),
        AssetKind::Package => {
            let (_, sections) = nifl::package::parse_package_with_sections(data)?;
            let mut positions = Vec::new();
            for entry in sections.iter().filter(|s| !s.name.contains('.')) {
                let payload = &data[entry.offset + 0x10..entry.end()];
                positions.extend(NiflHeader::read(payload)?.relocations);
            }
            Ok(positions)
        }
    }
}
