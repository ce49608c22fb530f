use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec3;
use ninjaforge::binary::{read_indirect, write_padded, SectionRef};
use ninjaforge::error::{ErrorCategory, MalformedKind};
use ninjaforge::formats::event::serialize_event;
use ninjaforge::formats::model::serialize_model;
use ninjaforge::formats::nifl::package::serialize_package;
use ninjaforge::formats::skeleton::serialize_skeleton;
use ninjaforge::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn triangle() -> Model {
    Model {
        vertex_sets: vec![VertexSet::from_positions(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ])],
        face_sets: vec![FaceSet {
            topology: Topology::TriangleList,
            indices: vec![0, 1, 2],
        }],
        meshes: vec![Mesh::default()],
        materials: vec![Material {
            name: "skin".to_string(),
            ..Material::default()
        }],
        ..Model::default()
    }
}

fn set_bgm() -> EventFile {
    EventFile {
        containers: vec![EventContainer {
            scripts: vec![Script::new("set_bgm", Payload::Short(7)).unwrap()],
            ..EventContainer::default()
        }],
    }
}

#[test]
fn test_triangle_model_round_trip() {
    let bytes = serialize_model(&triangle()).unwrap();
    let Asset::Model(decoded) = Asset::decode(&bytes).unwrap() else {
        panic!("expected a model");
    };

    let set = &decoded.vertex_sets[0];
    assert_eq!(set.stride, 12);
    assert_eq!(set.positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    assert_eq!(decoded.face_sets[0].indices, vec![0, 1, 2]);

    let again = Asset::decode(&Asset::Model(decoded.clone()).encode().unwrap()).unwrap();
    assert_eq!(again, Asset::Model(decoded));
}

#[test]
fn test_set_bgm_scenario() {
    let bytes = serialize_event(&set_bgm()).unwrap();
    let Asset::Event(decoded) = Asset::decode(&bytes).unwrap() else {
        panic!("expected an event file");
    };
    assert_eq!(decoded.containers[0].scripts[0].payload, Payload::Short(7));

    // Script record: name offset, int, data offset, then the 16-bit value.
    let script = 0x20 + 36;
    let name_offset = u32::from_be_bytes(bytes[script..script + 4].try_into().unwrap());
    let data_offset = u32::from_be_bytes(bytes[script + 8..script + 12].try_into().unwrap());
    assert_eq!(&bytes[script + 4..script + 8], &[0, 0, 0, 0]);
    assert_eq!(data_offset as usize + 0x20, script + 12);
    assert_eq!(&bytes[script + 12..script + 14], &[0x00, 0x07]);
    assert_eq!(&bytes[0x20 + name_offset as usize..][..8], b"set_bgm\0");
}

#[test]
fn test_every_kind_round_trips_structurally() {
    let skeleton = Skeleton {
        bones: vec![
            Bone {
                name: "root".to_string(),
                first_child: 1,
                ..Bone::default()
            },
            Bone {
                name: "spine".to_string(),
                parent: 0,
                position: Vec3::new(0.0, 1.5, 0.0),
                ..Bone::default()
            },
        ],
        effect_count: 2,
    };
    let assets = [
        Asset::Model(triangle()),
        Asset::Skeleton(skeleton),
        Asset::Package(vec![triangle(), Model::default(), triangle()]),
        Asset::Event(set_bgm()),
    ];

    for asset in assets {
        let bytes = asset.encode().unwrap();
        assert_eq!(detect_format(&bytes).unwrap(), asset.kind());
        let (decoded, encoded) = round_trip(&bytes).unwrap();
        assert_eq!(decoded, asset);
        assert_eq!(encoded, bytes, "{} re-encodes differently", asset.kind());
    }
}

#[test]
fn test_sections_stay_inside_buffer() {
    let buffers = [
        serialize_model(&triangle()).unwrap(),
        serialize_skeleton(&Skeleton::default()).unwrap(),
        serialize_package(&[triangle(), triangle()]).unwrap(),
        serialize_event(&set_bgm()).unwrap(),
    ];
    for bytes in &buffers {
        let info = inspect(bytes).unwrap();
        for section in &info.sections {
            assert!(section.end() <= bytes.len(), "{} overruns", section.name);
        }
        for position in relocations(bytes).unwrap() {
            assert_eq!(position % 4, 0);
        }
    }
}

#[test]
fn test_string_interning_is_idempotent() {
    let mut writer = ByteWriter::new(Endian::Little);
    let mut offsets = OffsetTable::new();
    let mut strings = StringTable::new();
    for _ in 0..5 {
        strings.intern_new("shared", &mut offsets, &mut writer).unwrap();
    }
    assert_eq!(strings.len(), 1);
    assert_eq!(strings.reference_count("shared"), 5);

    let positions = strings.write(&mut offsets, &mut writer);
    let relocated = offsets.finish();
    assert_eq!(relocated, vec![0, 4, 8, 12, 16]);

    let stored = positions["shared"];
    let bytes = writer.into_bytes();
    assert_eq!(&bytes[stored as usize..], b"shared\0");
    for slot in relocated {
        let slot = slot as usize;
        assert_eq!(u32::from_le_bytes(bytes[slot..slot + 4].try_into().unwrap()), stored);
    }
}

#[test]
#[should_panic(expected = "never filled")]
fn test_unfilled_slot_is_fatal() {
    let mut writer = ByteWriter::new(Endian::Big);
    let mut offsets = OffsetTable::new();
    let _slot = offsets.reserve(&mut writer);
    let _ = offsets.finish();
}

#[test]
fn test_zero_offsets_skip_reader() {
    // Table at 4: [0, 20, 0, 24]; targets hold 111 and 222.
    let words: [u32; 7] = [0xFFFF_FFFF, 0, 20, 0, 24, 111, 222];
    let data: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    let mut cursor = ByteCursor::new(&data, Endian::Big);

    let calls = AtomicUsize::new(0);
    let values = read_indirect(&mut cursor, 0, SectionRef::new(4, 4), |c| {
        calls.fetch_add(1, Ordering::SeqCst);
        c.read::<u32>()
    })
    .unwrap();
    assert_eq!(values, vec![111, 222]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_padding_only_between_records() {
    let records: [&[u8]; 3] = [&[1, 2, 3], &[4], &[5, 6, 7, 8, 9]];
    let mut writer = ByteWriter::new(Endian::Big);
    let mut starts = Vec::new();
    write_padded(&mut writer, records, 4, |w, record| {
        starts.push(w.position());
        w.write_bytes(record);
        Ok(())
    })
    .unwrap();

    assert_eq!(starts, vec![0, 4, 8]);
    // The last record is not padded.
    assert_eq!(writer.len(), 13);
}

#[test]
fn test_unknown_opcode_is_malformed_input() {
    let json = r#"{"kind":"event","data":{"containers":[{"scripts":[{"name":"moonwalk"}]}]}}"#;
    let asset: Asset = serde_json::from_str(json).unwrap();
    let err = asset.encode().unwrap_err();
    assert!(matches!(err, Error::UnknownOpcode { .. }));
    assert_eq!(
        err.category(),
        ErrorCategory::MalformedInput(MalformedKind::UnknownDiscriminant)
    );
}

#[test]
fn test_json_conversion_round_trip() {
    let asset = Asset::Event(set_bgm());
    let json = serde_json::to_string_pretty(&asset).unwrap();
    let back: Asset = serde_json::from_str(&json).unwrap();
    assert_eq!(back.encode().unwrap(), asset.encode().unwrap());
}

#[test]
fn test_generic_mesh_bridge() {
    let meshes = model_to_meshes(&triangle()).unwrap();
    assert_eq!(meshes.len(), 1);
    assert_eq!(meshes[0].name, "skin");
    assert_eq!(meshes[0].faces, vec![[0, 1, 2]]);

    let rebuilt = meshes_to_model(&meshes, &[]).unwrap();
    assert_eq!(rebuilt.vertex_sets, triangle().vertex_sets);
    assert_eq!(rebuilt.face_sets, triangle().face_sets);
}

#[test]
fn test_generic_skeleton_bridge() {
    let skeleton = Skeleton {
        bones: vec![
            Bone {
                name: "root".to_string(),
                ..Bone::default()
            },
            Bone {
                name: "head".to_string(),
                parent: 0,
                position: Vec3::Y,
                ..Bone::default()
            },
        ],
        effect_count: 0,
    };
    let generic = skeleton_to_generic(&skeleton);
    assert_eq!(generic.bones[1].parent, Some(0));

    let rebuilt = generic_to_skeleton(&generic);
    assert_eq!(rebuilt.bones[0].first_child, 1);
    assert!(rebuilt.bones[1].position.abs_diff_eq(Vec3::Y, 1e-6));
}

#[test]
fn test_batch_continues_past_bad_files() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("one.aqo"), serialize_model(&triangle()).unwrap()).unwrap();
    std::fs::write(dir.path().join("two.bin"), serialize_event(&set_bgm()).unwrap()).unwrap();
    std::fs::write(dir.path().join("three.aqo"), b"NIFL\x18\0\0\0").unwrap();
    std::fs::write(dir.path().join("four.aqo"), b"WAVE").unwrap();

    let options = BatchOptions::new().with_verify(true);
    let files = find_asset_files(dir.path(), &options);
    assert_eq!(files.len(), 4);

    let result = batch_process(&files, &options, |_| {});
    assert_eq!(result.success_count, 2);
    assert_eq!(result.fail_count, 2);
    assert_eq!(result.outcomes.len(), 4);
}
