use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::error::{ItemError, Result};

/// Request header: opcode (1) + item id (2 LE) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Item payload capacity every request and response is padded to.
///
/// Both ends must agree on it: the device echoes a response of exactly
/// `HEADER_SIZE + DEFAULT_PAYLOAD_CAPACITY` bytes.
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 130;

/// Item request opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Opcode {
    /// Read an item value.
    ReadItem = 0x26,
    /// Write an item value.
    WriteItem = 0x27,
}

impl Opcode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x26 => Some(Opcode::ReadItem),
            0x27 => Some(Opcode::WriteItem),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::ReadItem => f.write_str("read"),
            Opcode::WriteItem => f.write_str("write"),
        }
    }
}

/// 16-bit key naming one configuration value on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ItemId(pub u16);

impl ItemId {
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl From<u16> for ItemId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses decimal (`1877`) or hex (`0x0755`) notation.
impl FromStr for ItemId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16)?,
            None => s.parse()?,
        };
        Ok(Self(value))
    }
}

/// Fixed-size request buffer: opcode, item id, zero-padded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    opcode: Opcode,
    bytes: Vec<u8>,
}

impl CommandBuffer {
    /// Build a read request; the payload region is all zeros.
    pub fn read(id: ItemId, payload_capacity: usize) -> Self {
        Self::with_header(Opcode::ReadItem, id, payload_capacity)
    }

    /// Build a write request carrying `data`, zero-padded to capacity.
    pub fn write(id: ItemId, data: &[u8], payload_capacity: usize) -> Result<Self> {
        if data.len() > payload_capacity {
            return Err(ItemError::ValueTooLarge {
                size: data.len(),
                max: payload_capacity,
            });
        }
        let mut cmd = Self::with_header(Opcode::WriteItem, id, payload_capacity);
        cmd.bytes[HEADER_SIZE..HEADER_SIZE + data.len()].copy_from_slice(data);
        Ok(cmd)
    }

    fn with_header(opcode: Opcode, id: ItemId, payload_capacity: usize) -> Self {
        let mut bytes = vec![0u8; HEADER_SIZE + payload_capacity];
        bytes[0] = opcode.as_u8();
        bytes[1..HEADER_SIZE].copy_from_slice(&id.to_le_bytes());
        Self { opcode, bytes }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn item_id(&self) -> ItemId {
        ItemId(u16::from_le_bytes([self.bytes[1], self.bytes[2]]))
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total size on the wire before framing (header + payload capacity).
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Item id carried in bytes 1..3 of a decoded response, if present.
pub fn echoed_item_id(response: &[u8]) -> Option<ItemId> {
    match response {
        [_, lo, hi, ..] => Some(ItemId(u16::from_le_bytes([*lo, *hi]))),
        _ => None,
    }
}
