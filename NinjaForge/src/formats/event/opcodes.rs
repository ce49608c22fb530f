//! Event opcode registry and payload layouts
//!
//! Every script record names its opcode with a string. The name selects the
//! payload layout that follows the record header. The set of names is closed:
//! an unlisted name is an error on both read and write.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::binary::{ByteCursor, ByteWriter};
use crate::error::{Error, Result};

/// Payload shape selected by an opcode name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadLayout {
    /// No payload bytes.
    Empty,
    /// One `i16`.
    Short,
    /// Four raw bytes.
    Bytes4,
    /// Eight raw bytes.
    Bytes8,
    /// One `i32`.
    Int,
    /// `f32` volume followed by two `i16`.
    VolumeFade,
    /// Two `i32`.
    IntPair,
    /// Three `f32`.
    Vector3,
    /// 32-byte race setup.
    Race,
    /// 8-byte minigame setup.
    Minigame,
}

impl PayloadLayout {
    /// Encoded payload size in bytes.
    pub fn size(self) -> usize {
        match self {
            PayloadLayout::Empty => 0,
            PayloadLayout::Short => 2,
            PayloadLayout::Bytes4 | PayloadLayout::Int => 4,
            PayloadLayout::Bytes8 | PayloadLayout::VolumeFade | PayloadLayout::IntPair | PayloadLayout::Minigame => 8,
            PayloadLayout::Vector3 => 12,
            PayloadLayout::Race => 32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PayloadLayout::Empty => "empty",
            PayloadLayout::Short => "short",
            PayloadLayout::Bytes4 => "4-byte",
            PayloadLayout::Bytes8 => "8-byte",
            PayloadLayout::Int => "int",
            PayloadLayout::VolumeFade => "volume fade",
            PayloadLayout::IntPair => "int pair",
            PayloadLayout::Vector3 => "vector3",
            PayloadLayout::Race => "race",
            PayloadLayout::Minigame => "minigame",
        }
    }
}

const OPCODE_TABLE: &[(PayloadLayout, &[&str])] = &[
    (PayloadLayout::Short, &["load_racer", "set_bgm", "msg", "bgm_play"]),
    (
        PayloadLayout::Bytes4,
        &[
            "gold_save",
            "load_p",
            "load_prisoner",
            "sunrate",
            "sw_off",
            "sw_on",
            "sw_chk_off",
            "sw_chk_on",
        ],
    ),
    (PayloadLayout::Bytes8, &["set"]),
    (
        PayloadLayout::Int,
        &["set_rescue", "prison_save", "spore", "hoverleaf", "blizzard", "se"],
    ),
    (PayloadLayout::VolumeFade, &["bgm_vol"]),
    (PayloadLayout::IntPair, &["talk", "load_stg_title", "set_talk_mode"]),
    (PayloadLayout::Vector3, &["sol"]),
    (PayloadLayout::Race, &["set_race"]),
    (PayloadLayout::Minigame, &["minigame"]),
    (
        PayloadLayout::Empty,
        &[
            "takeoff_suit",
            "start_race",
            "ms_boot",
            "ms_fail",
            "ms_success",
            "load_green_ene_demo",
            "load_o_cannon",
            "load_darkgate",
            "load_chicken",
            "load_goal",
            "load_ring",
            "load_mgleader",
            "load_gold",
            "load_bomb",
            "load_egg_suit",
            "always_true",
            "race",
        ],
    ),
    // Unused in shipped scripts; no payload observed.
    (
        PayloadLayout::Empty,
        &["wait_fake", "ptcl_test", "send", "wait", "bgm_stop", "se_pos"],
    ),
];

lazy_static::lazy_static! {
    static ref OPCODES: HashMap<&'static str, PayloadLayout> = {
        let mut m = HashMap::new();
        for (layout, names) in OPCODE_TABLE {
            for name in *names {
                m.insert(*name, *layout);
            }
        }
        m
    };
}

/// Payload layout for an opcode name.
///
/// # Errors
/// `UnknownOpcode` if the name is not registered.
pub fn opcode_layout(name: &str) -> Result<PayloadLayout> {
    OPCODES.get(name).copied().ok_or_else(|| Error::UnknownOpcode {
        name: name.to_string(),
    })
}

pub fn is_known_opcode(name: &str) -> bool {
    OPCODES.contains_key(name)
}

/// All registered opcode names, sorted.
pub fn known_opcodes() -> Vec<&'static str> {
    let mut names: Vec<_> = OPCODES.keys().copied().collect();
    names.sort_unstable();
    names
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RaceParams {
    /// AI behaviour preset; non-default values make the racer erratic.
    pub ai_setting: i16,
    pub unk_02: i16,
    pub animal_speed: f32,
    pub pre_race_message: i16,
    pub win_message: i16,
    pub lose_message: i16,
    pub unk_0e: i16,
    pub animal_scale: f32,
    pub animal_position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinigameParams {
    pub unk_00: u8,
    pub unk_01: u8,
    pub unk_02: u8,
    pub unk_03: u8,
    pub time_minutes: u8,
    pub time_seconds: u8,
    pub unk_06: u8,
    pub emblem_score_to_win: u8,
}

/// Decoded payload of one script record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "layout", content = "value", rename_all = "snake_case")]
pub enum Payload {
    #[default]
    Empty,
    Short(i16),
    Bytes4([u8; 4]),
    Bytes8([u8; 8]),
    Int(i32),
    VolumeFade { volume: f32, arg_0: i16, arg_1: i16 },
    IntPair(i32, i32),
    Vector3(Vec3),
    Race(RaceParams),
    Minigame(MinigameParams),
}

impl Payload {
    pub fn layout(&self) -> PayloadLayout {
        match self {
            Payload::Empty => PayloadLayout::Empty,
            Payload::Short(_) => PayloadLayout::Short,
            Payload::Bytes4(_) => PayloadLayout::Bytes4,
            Payload::Bytes8(_) => PayloadLayout::Bytes8,
            Payload::Int(_) => PayloadLayout::Int,
            Payload::VolumeFade { .. } => PayloadLayout::VolumeFade,
            Payload::IntPair(..) => PayloadLayout::IntPair,
            Payload::Vector3(_) => PayloadLayout::Vector3,
            Payload::Race(_) => PayloadLayout::Race,
            Payload::Minigame(_) => PayloadLayout::Minigame,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Read a payload of the given layout at the cursor.
    pub fn read(cursor: &mut ByteCursor, layout: PayloadLayout) -> Result<Self> {
        Ok(match layout {
            PayloadLayout::Empty => Payload::Empty,
            PayloadLayout::Short => Payload::Short(cursor.read()?),
            PayloadLayout::Bytes4 => Payload::Bytes4(cursor.read()?),
            PayloadLayout::Bytes8 => Payload::Bytes8(cursor.read()?),
            PayloadLayout::Int => Payload::Int(cursor.read()?),
            PayloadLayout::VolumeFade => Payload::VolumeFade {
                volume: cursor.read()?,
                arg_0: cursor.read()?,
                arg_1: cursor.read()?,
            },
            PayloadLayout::IntPair => Payload::IntPair(cursor.read()?, cursor.read()?),
            PayloadLayout::Vector3 => Payload::Vector3(cursor.read()?),
            PayloadLayout::Race => Payload::Race(RaceParams {
                ai_setting: cursor.read()?,
                unk_02: cursor.read()?,
                animal_speed: cursor.read()?,
                pre_race_message: cursor.read()?,
                win_message: cursor.read()?,
                lose_message: cursor.read()?,
                unk_0e: cursor.read()?,
                animal_scale: cursor.read()?,
                animal_position: cursor.read()?,
            }),
            PayloadLayout::Minigame => {
                let [unk_00, unk_01, unk_02, unk_03, time_minutes, time_seconds, unk_06, emblem_score_to_win] =
                    cursor.read::<[u8; 8]>()?;
                Payload::Minigame(MinigameParams {
                    unk_00,
                    unk_01,
                    unk_02,
                    unk_03,
                    time_minutes,
                    time_seconds,
                    unk_06,
                    emblem_score_to_win,
                })
            }
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        match *self {
            Payload::Empty => {}
            Payload::Short(value) => writer.write(value),
            Payload::Bytes4(bytes) => writer.write(bytes),
            Payload::Bytes8(bytes) => writer.write(bytes),
            Payload::Int(value) => writer.write(value),
            Payload::VolumeFade { volume, arg_0, arg_1 } => {
                writer.write(volume);
                writer.write(arg_0);
                writer.write(arg_1);
            }
            Payload::IntPair(a, b) => {
                writer.write(a);
                writer.write(b);
            }
            Payload::Vector3(value) => writer.write(value),
            Payload::Race(race) => {
                writer.write(race.ai_setting);
                writer.write(race.unk_02);
                writer.write(race.animal_speed);
                writer.write(race.pre_race_message);
                writer.write(race.win_message);
                writer.write(race.lose_message);
                writer.write(race.unk_0e);
                writer.write(race.animal_scale);
                writer.write(race.animal_position);
            }
            Payload::Minigame(game) => writer.write([
                game.unk_00,
                game.unk_01,
                game.unk_02,
                game.unk_03,
                game.time_minutes,
                game.time_seconds,
                game.unk_06,
                game.emblem_score_to_win,
            ]),
        }
    }
}
