//! Locating an entity's block by identifier when the identifier's position
//! inside the block is only known as a ranked list of guesses.
//!
//! Search order is fixed: blocks in index order, then width classes from
//! narrowest to widest, then offsets in their configured order. The first
//! candidate whose bytes equal the target wins, even if a later candidate in
//! the same block would also match.

use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::reader::{self, MAX_UINT_WIDTH};

const PLAYER_DATA_U16_OFFSETS: [usize; 16] = [
    0x6, 0xE, 0x2, 0xA, 0x7, 0x3, 0xB, 0xF, 0x4, 0x0, 0xC, 0xD, 0x9, 0x8, 0x5, 0x1,
];
const PLAYER_DATA_U32_OFFSETS: [usize; 12] =
    [0xE, 0x2, 0x6, 0xA, 0x7, 0x3, 0xF, 0xB, 0x4, 0xC, 0x0, 0x8];

/// Candidate offsets sharing one identifier width, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WidthClass {
    pub width: usize,
    pub offsets: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WidthClass>", into = "Vec<WidthClass>")]
pub struct IdCandidates {
    classes: Vec<WidthClass>,
}

impl IdCandidates {
    /// Orders classes narrowest first; offsets keep their given order.
    pub fn new(mut classes: Vec<WidthClass>) -> Result<Self, CoreError> {
        for class in &classes {
            if class.width == 0 || class.width > MAX_UINT_WIDTH {
                return Err(CoreError::new(
                    CoreErrorCode::Parse,
                    format!(
                        "identifier width {} not supported, expected 1-{MAX_UINT_WIDTH} bytes",
                        class.width
                    ),
                ));
            }
        }
        classes.sort_by_key(|class| class.width);
        Ok(Self { classes })
    }

    /// Ranking derived for the 64-byte player data blocks.
    pub fn player_data() -> Self {
        Self {
            classes: vec![
                WidthClass {
                    width: 2,
                    offsets: PLAYER_DATA_U16_OFFSETS.to_vec(),
                },
                WidthClass {
                    width: 4,
                    offsets: PLAYER_DATA_U32_OFFSETS.to_vec(),
                },
            ],
        }
    }

    pub fn classes(&self) -> &[WidthClass] {
        &self.classes
    }

    /// `(offset, width)` pairs in search order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.classes.iter().flat_map(|class| {
            class
                .offsets
                .iter()
                .map(move |&offset| (offset, class.width))
        })
    }

    pub fn len(&self) -> usize {
        self.classes.iter().map(|class| class.offsets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TryFrom<Vec<WidthClass>> for IdCandidates {
    type Error = CoreError;

    fn try_from(classes: Vec<WidthClass>) -> Result<Self, Self::Error> {
        Self::new(classes)
    }
}

impl From<IdCandidates> for Vec<WidthClass> {
    fn from(candidates: IdCandidates) -> Self {
        candidates.classes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanHit {
    pub block_index: usize,
    /// Offset of the block from the start of the scanned buffer.
    pub block_offset: usize,
    pub id_offset: usize,
    pub id_width: usize,
}

/// Every candidate match in search order. The first item is what
/// [`find_block`] returns.
pub fn scan_matches<'a>(
    buffer: &'a [u8],
    block_size: usize,
    target_id: u64,
    candidates: &'a IdCandidates,
) -> impl Iterator<Item = ScanHit> + 'a {
    let block_count = buffer.len().checked_div(block_size).unwrap_or(0);

    (0..block_count).flat_map(move |block_index| {
        let block_offset = block_index * block_size;
        let block = &buffer[block_offset..block_offset + block_size];
        candidates.iter().filter_map(move |(id_offset, id_width)| {
            let value = reader::read_le_uint(block, id_offset, id_width)?;
            (value == target_id).then_some(ScanHit {
                block_index,
                block_offset,
                id_offset,
                id_width,
            })
        })
    })
}

pub fn find_block(
    buffer: &[u8],
    block_size: usize,
    target_id: u64,
    candidates: &IdCandidates,
) -> Option<ScanHit> {
    let hit = scan_matches(buffer, block_size, target_id, candidates).next();
    match hit {
        Some(hit) => tracing::debug!(
            target_id,
            block_index = hit.block_index,
            id_offset = hit.id_offset,
            id_width = hit.id_width,
            "identifier located"
        ),
        None => tracing::debug!(target_id, block_size, "identifier not found"),
    }
    hit
}
