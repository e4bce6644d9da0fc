use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bitfield;
use crate::core_api::{AttributeValue, Attributes, CoreError, CoreErrorCode};
use crate::reader;

pub const MAX_FIELD_BITS: u32 = 32;

const EDIT_BIN_BLOCK_SIZE: usize = 156;
const EDIT_BIN_START_OFFSET: usize = 888;
const PLAYER_DATA_BLOCK_SIZE: usize = 64;

const EDIT_BIN_FIELDS: [(&str, u32); 34] = [
    ("Attack", 7),
    ("Defense", 7),
    ("Balance", 7),
    ("Stamina", 7),
    ("Top Speed", 7),
    ("Acceleration", 7),
    ("Response", 7),
    ("Agility", 7),
    ("Dribble Accuracy", 7),
    ("Dribble Speed", 7),
    ("Short Pass Accuracy", 7),
    ("Short Pass Speed", 7),
    ("Long Pass Accuracy", 7),
    ("Long Pass Speed", 7),
    ("Shot Accuracy", 7),
    ("Shot Power", 7),
    ("Shot Technique", 7),
    ("Free Kick Accuracy", 7),
    ("Swerve", 7),
    ("Heading", 7),
    ("Jump", 7),
    ("Technique", 7),
    ("Aggression", 7),
    ("Mentality", 7),
    ("Goalkeeping Skills", 7),
    ("Team Work", 7),
    ("Weak Foot Accuracy", 4),
    ("Weak Foot Frequency", 4),
    ("Form", 4),
    ("Injury Resistance", 4),
    ("Registered Position", 5),
    ("Consistency", 2),
    // one bit per position, kept as a single mask
    ("Playable Positions", 22),
    ("Special Abilities", 30),
];

const PLAYER_DATA_FIELDS: [(&str, usize, ByteWidth); 5] = [
    ("attack", 0x10, ByteWidth::U8),
    ("defense", 0x11, ByteWidth::U8),
    ("stamina", 0x12, ByteWidth::U8),
    ("top_speed", 0x13, ByteWidth::U8),
    ("dribble_accuracy", 0x14, ByteWidth::U8),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDescriptor {
    pub name: String,
    pub bits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteWidth {
    U8,
    U16,
    U32,
}

impl ByteWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlatField {
    pub name: String,
    pub offset: usize,
    pub width: ByteWidth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPacking {
    /// Consecutive fields from bit 0 of the block, no padding.
    Bits(Vec<FieldDescriptor>),
    /// Fields at fixed byte offsets, little-endian.
    Bytes(Vec<FlatField>),
}

/// Where one field lives inside its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    Bits { start_bit: usize, width: u32 },
    Bytes { offset: usize, width: ByteWidth },
}

impl FieldLocation {
    pub fn bit_width(&self) -> u32 {
        match *self {
            Self::Bits { width, .. } => width,
            Self::Bytes { width, .. } => width.bits(),
        }
    }

    pub fn max_value(&self) -> u32 {
        bitfield::max_value(self.bit_width())
    }

    pub fn read(&self, block: &[u8]) -> u32 {
        match *self {
            Self::Bits { start_bit, width } => bitfield::read_bits(block, start_bit, width),
            // validated layouts keep every flat field inside the block
            Self::Bytes { offset, width } => {
                reader::read_le_uint(block, offset, width.bytes()).unwrap_or(0) as u32
            }
        }
    }

    pub fn write(&self, block: &mut [u8], value: u32) -> Result<(), CoreError> {
        match *self {
            Self::Bits { start_bit, width } => {
                bitfield::write_bits(block, start_bit, width, value);
                Ok(())
            }
            Self::Bytes { offset, width } => {
                reader::write_le_uint(block, offset, width.bytes(), u64::from(value))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot<'a> {
    pub name: &'a str,
    pub location: FieldLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordLayout {
    pub name: String,
    pub block_size: usize,
    #[serde(default)]
    pub start_offset: usize,
    #[serde(rename = "fields")]
    pub packing: FieldPacking,
}

impl RecordLayout {
    pub fn bit_packed<'a>(
        name: impl Into<String>,
        block_size: usize,
        start_offset: usize,
        fields: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> Self {
        Self {
            name: name.into(),
            block_size,
            start_offset,
            packing: FieldPacking::Bits(
                fields
                    .into_iter()
                    .map(|(name, bits)| FieldDescriptor {
                        name: name.to_string(),
                        bits,
                    })
                    .collect(),
            ),
        }
    }

    pub fn flat<'a>(
        name: impl Into<String>,
        block_size: usize,
        start_offset: usize,
        fields: impl IntoIterator<Item = (&'a str, usize, ByteWidth)>,
    ) -> Self {
        Self {
            name: name.into(),
            block_size,
            start_offset,
            packing: FieldPacking::Bytes(
                fields
                    .into_iter()
                    .map(|(name, offset, width)| FlatField {
                        name: name.to_string(),
                        offset,
                        width,
                    })
                    .collect(),
            ),
        }
    }

    /// Bit-packed player block of the edit file.
    pub fn edit_bin() -> Self {
        Self::bit_packed(
            "edit-bin",
            EDIT_BIN_BLOCK_SIZE,
            EDIT_BIN_START_OFFSET,
            EDIT_BIN_FIELDS,
        )
    }

    /// Byte-aligned player block of the extracted player data file.
    pub fn player_data() -> Self {
        Self::flat(
            "player-data",
            PLAYER_DATA_BLOCK_SIZE,
            0,
            PLAYER_DATA_FIELDS,
        )
    }

    pub fn field_count(&self) -> usize {
        match &self.packing {
            FieldPacking::Bits(fields) => fields.len(),
            FieldPacking::Bytes(fields) => fields.len(),
        }
    }

    /// Bits covered by fields; for bit-packed layouts this is where the
    /// last field ends.
    pub fn total_bits(&self) -> usize {
        self.slots()
            .iter()
            .map(|slot| slot.location.bit_width() as usize)
            .sum()
    }

    pub fn slots(&self) -> Vec<FieldSlot<'_>> {
        match &self.packing {
            FieldPacking::Bits(fields) => {
                let mut start_bit = 0usize;
                fields
                    .iter()
                    .map(|field| {
                        let slot = FieldSlot {
                            name: field.name.as_str(),
                            location: FieldLocation::Bits {
                                start_bit,
                                width: field.bits,
                            },
                        };
                        start_bit += field.bits as usize;
                        slot
                    })
                    .collect()
            }
            FieldPacking::Bytes(fields) => fields
                .iter()
                .map(|field| FieldSlot {
                    name: field.name.as_str(),
                    location: FieldLocation::Bytes {
                        offset: field.offset,
                        width: field.width,
                    },
                })
                .collect(),
        }
    }

    pub fn slot(&self, name: &str) -> Option<FieldSlot<'_>> {
        self.slots().into_iter().find(|slot| slot.name == name)
    }

    /// Byte offset of block `index`, or `None` on arithmetic overflow.
    pub fn block_offset(&self, index: usize) -> Option<usize> {
        index
            .checked_mul(self.block_size)
            .and_then(|rel| rel.checked_add(self.start_offset))
    }

    pub fn decode(&self, block: &[u8]) -> Attributes {
        let entries = self
            .slots()
            .into_iter()
            .map(|slot| AttributeValue {
                name: slot.name.to_string(),
                bits: slot.location.bit_width(),
                value: slot.location.read(block),
            })
            .collect();
        Attributes::from_entries(entries)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.block_size == 0 {
            return Err(invalid(format!("layout {}: block size must be non-zero", self.name)));
        }
        if self.field_count() == 0 {
            return Err(invalid(format!("layout {}: no fields", self.name)));
        }

        let mut names = BTreeSet::new();
        for slot in self.slots() {
            if slot.name.is_empty() {
                return Err(invalid(format!("layout {}: empty field name", self.name)));
            }
            if !names.insert(slot.name) {
                return Err(invalid(format!(
                    "layout {}: duplicate field {:?}",
                    self.name, slot.name
                )));
            }
        }

        match &self.packing {
            FieldPacking::Bits(fields) => {
                for field in fields {
                    if field.bits == 0 || field.bits > MAX_FIELD_BITS {
                        return Err(invalid(format!(
                            "layout {}: field {:?} has width {}, expected 1-{MAX_FIELD_BITS} bits",
                            self.name, field.name, field.bits
                        )));
                    }
                }
                let total = self.total_bits();
                if total > self.block_size.saturating_mul(8) {
                    return Err(invalid(format!(
                        "layout {}: fields need {total} bits, block holds {}",
                        self.name,
                        self.block_size.saturating_mul(8)
                    )));
                }
            }
            FieldPacking::Bytes(fields) => {
                let mut used = vec![false; self.block_size];
                for field in fields {
                    let end = field.offset.checked_add(field.width.bytes());
                    let Some(end) = end.filter(|&end| end <= self.block_size) else {
                        return Err(invalid(format!(
                            "layout {}: field {:?} at offset {} overruns {}-byte block",
                            self.name, field.name, field.offset, self.block_size
                        )));
                    };
                    for slot in &mut used[field.offset..end] {
                        if *slot {
                            return Err(invalid(format!(
                                "layout {}: field {:?} overlaps another field",
                                self.name, field.name
                            )));
                        }
                        *slot = true;
                    }
                }
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::new(CoreErrorCode::Parse, message)
}
