//! Event script containers (ARC family)
//!
//! ```text
//! body  container_count, array_offset (= 8), container_count x container offset
//! container  value_00, value_04, value_08, script_count, scripts_offset
//!            script_count x script offset (0 = empty slot)
//! script     name_offset, value_04, data_offset (0 when no payload), payload
//! ```
//!
//! The payload layout is chosen by the script's opcode name, see [`opcodes`].

pub mod opcodes;
mod reader;
mod writer;

use serde::{Deserialize, Serialize};

pub use opcodes::{
    is_known_opcode, known_opcodes, opcode_layout, MinigameParams, Payload, PayloadLayout, RaceParams,
};
pub use reader::{parse_event_bytes, parse_event_with_sections, read_event};
pub use writer::{serialize_event, write_event};

use crate::error::{Error, Result};

/// Longest opcode name the reader scans for.
pub const OPCODE_NAME_MAX_LEN: usize = 0x20;

/// One scripted call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    #[serde(default)]
    pub value_04: i32,
    #[serde(default)]
    pub payload: Payload,
}

impl Script {
    /// Build a script, checking the payload against the opcode registry.
    ///
    /// # Errors
    /// `UnknownOpcode` or `PayloadMismatch`.
    pub fn new(name: impl Into<String>, payload: Payload) -> Result<Self> {
        let script = Self {
            name: name.into(),
            value_04: 0,
            payload,
        };
        script.validate()?;
        Ok(script)
    }

    /// Check the name is registered and the payload matches its layout.
    pub fn validate(&self) -> Result<()> {
        let expected = opcode_layout(&self.name)?;
        if self.payload.layout() != expected {
            return Err(Error::PayloadMismatch {
                name: self.name.clone(),
                expected: expected.name(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventContainer {
    #[serde(default)]
    pub value_00: i32,
    #[serde(default)]
    pub value_04: i32,
    #[serde(default)]
    pub value_08: i32,
    pub scripts: Vec<Script>,
}

/// Decoded event script file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventFile {
    pub containers: Vec<EventContainer>,
}

impl EventFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total scripts across all containers.
    pub fn script_count(&self) -> usize {
        self.containers.iter().map(|c| c.scripts.len()).sum()
    }
}
