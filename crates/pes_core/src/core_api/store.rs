use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::layout::RecordLayout;
use crate::scanner::{self, IdCandidates, ScanHit};

use super::error::{CoreError, CoreErrorCode};
use super::name_table::NameTable;
use super::types::{
    AttributeValue, Attributes, Capabilities, CapabilityIssue, PlayerRecord, SkipReason,
    SkippedField, UpdatePolicy, UpdateReport,
};

/// Owns the bytes of one data file and edits its fixed-size blocks.
///
/// Block `i` starts at `layout.start_offset + i * layout.block_size`. Nothing
/// outside the addressed block is read or written by a block operation.
#[derive(Debug, Clone)]
pub struct AttributeStore {
    path: Option<PathBuf>,
    buffer: Vec<u8>,
    layout: RecordLayout,
    policy: UpdatePolicy,
}

impl AttributeStore {
    pub fn load(path: impl AsRef<Path>, layout: RecordLayout) -> Result<Self, CoreError> {
        let path = path.as_ref();
        layout.validate()?;
        let buffer = fs::read(path).map_err(|e| CoreError::from_io(&e, "read", path))?;
        tracing::debug!(
            path = %path.display(),
            len = buffer.len(),
            layout = %layout.name,
            "loaded data file"
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            buffer,
            layout,
            policy: UpdatePolicy::default(),
        })
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>, layout: RecordLayout) -> Result<Self, CoreError> {
        layout.validate()?;
        Ok(Self {
            path: None,
            buffer: bytes.into(),
            layout,
            policy: UpdatePolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Number of complete blocks after `start_offset`.
    pub fn block_count(&self) -> usize {
        self.buffer.len().saturating_sub(self.layout.start_offset) / self.layout.block_size
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::attributes_only(vec![
            CapabilityIssue::NameDecodingUnsupported,
            CapabilityIssue::HeuristicLayout,
        ])
    }

    pub fn get_block(&self, index: usize) -> Result<&[u8], CoreError> {
        let range = self.block_range(index)?;
        Ok(&self.buffer[range])
    }

    /// Replaces block `index` with `bytes`, which must be exactly one block
    /// long. On error the buffer is unchanged.
    pub fn set_block(&mut self, index: usize, bytes: &[u8]) -> Result<(), CoreError> {
        let range = self.block_range(index)?;
        if bytes.len() != self.layout.block_size {
            return Err(CoreError::new(
                CoreErrorCode::SizeMismatch,
                format!(
                    "replacement for block {index} is {} bytes, block size is {}",
                    bytes.len(),
                    self.layout.block_size
                ),
            ));
        }

        self.buffer[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn get_attributes(&self, index: usize) -> Option<Attributes> {
        let block = self.get_block(index).ok()?;
        Some(self.layout.decode(block))
    }

    /// Writes the given fields of block `index`.
    ///
    /// Unknown names and values wider than their field are skipped with a
    /// warning. Under [`UpdatePolicy::BestEffort`] the remaining fields are
    /// still written; under [`UpdatePolicy::Strict`] a single skip leaves the
    /// block untouched. Returns `None` when the block is out of range.
    pub fn set_attributes<I, K>(&mut self, index: usize, updates: I) -> Option<UpdateReport>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let range = match self.block_range(index) {
            Ok(range) => range,
            Err(e) => {
                tracing::debug!(index, error = %e, "attribute update on missing block");
                return None;
            }
        };
        let mut working = self.buffer[range].to_vec();
        let mut report = UpdateReport::default();

        for (name, value) in updates {
            let name = name.as_ref();
            let Some(slot) = self.layout.slot(name) else {
                tracing::warn!(field = name, value, "unknown field, skipping");
                report.skipped.push(SkippedField {
                    name: name.to_string(),
                    value,
                    reason: SkipReason::UnknownField,
                });
                continue;
            };

            let max = slot.location.max_value();
            let raw = u32::try_from(value).ok().filter(|&raw| raw <= max);
            let written = raw.map(|raw| slot.location.write(&mut working, raw).map(|()| raw));
            match written {
                Some(Ok(raw)) => report.applied.push(AttributeValue {
                    name: name.to_string(),
                    bits: slot.location.bit_width(),
                    value: raw,
                }),
                Some(Err(e)) => {
                    tracing::warn!(field = name, value, error = %e, "field write failed, skipping");
                    report.skipped.push(SkippedField {
                        name: name.to_string(),
                        value,
                        reason: SkipReason::OutOfRange { max },
                    });
                }
                None => {
                    tracing::warn!(
                        field = name,
                        value,
                        max,
                        bits = slot.location.bit_width(),
                        "value outside field range, skipping"
                    );
                    report.skipped.push(SkippedField {
                        name: name.to_string(),
                        value,
                        reason: SkipReason::OutOfRange { max },
                    });
                }
            }
        }

        if self.policy == UpdatePolicy::Strict && !report.skipped.is_empty() {
            tracing::warn!(
                index,
                skipped = report.skipped.len(),
                "strict update rejected, block left unchanged"
            );
            report.applied.clear();
            return Some(report);
        }

        self.set_block(index, &working).ok()?;
        report.committed = true;
        Some(report)
    }

    /// Scans the block region for `target_id`.
    ///
    /// `block_index` in the result is a store index; `block_offset` is the
    /// absolute offset of that block in the file.
    pub fn find_by_id(&self, target_id: u64, candidates: &IdCandidates) -> Option<ScanHit> {
        let region = self.buffer.get(self.layout.start_offset..)?;
        let hit = scanner::find_block(region, self.layout.block_size, target_id, candidates)?;
        Some(ScanHit {
            block_offset: hit.block_offset + self.layout.start_offset,
            ..hit
        })
    }

    pub fn lookup(
        &self,
        target_id: u64,
        candidates: &IdCandidates,
        names: Option<&NameTable>,
    ) -> Option<PlayerRecord> {
        let hit = self.find_by_id(target_id, candidates)?;
        let block = self.get_block(hit.block_index).ok()?;
        let name = names
            .map(|table| table.lookup(target_id))
            .unwrap_or(NameTable::UNKNOWN);

        Some(PlayerRecord {
            id: target_id,
            name: name.to_string(),
            hit,
            attributes: self.layout.decode(block),
            raw_block: block.to_vec(),
        })
    }

    /// Name storage has not been decoded; always fails.
    pub fn get_name(&self, index: usize) -> Result<String, CoreError> {
        tracing::warn!(index, "player name decoding is not supported");
        Err(CoreError::new(
            CoreErrorCode::UnsupportedOperation,
            format!("reading the name of player {index} is not supported; name layout is unknown"),
        ))
    }

    /// Name storage has not been decoded; always fails and leaves the buffer
    /// unchanged.
    pub fn set_name(&mut self, index: usize, name: &str) -> Result<(), CoreError> {
        tracing::warn!(index, name, "player name editing is not supported");
        Err(CoreError::new(
            CoreErrorCode::UnsupportedOperation,
            format!("cannot set name of player {index} to {name:?}; name layout is unknown"),
        ))
    }

    /// Overwrites the file the store was loaded from.
    pub fn save(&self) -> Result<(), CoreError> {
        let Some(path) = self.path.as_deref() else {
            return Err(CoreError::new(
                CoreErrorCode::UnsupportedOperation,
                "store was not loaded from a file; use save_as",
            ));
        };
        self.save_as(path)
    }

    pub fn save_as(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let path = path.as_ref();
        fs::write(path, &self.buffer).map_err(|e| CoreError::from_io(&e, "write", path))?;
        tracing::debug!(path = %path.display(), len = self.buffer.len(), "saved data file");
        Ok(())
    }

    fn block_range(&self, index: usize) -> Result<Range<usize>, CoreError> {
        let start = self.layout.block_offset(index);
        let end = start.and_then(|start| start.checked_add(self.layout.block_size));
        match (start, end) {
            (Some(start), Some(end)) if end <= self.buffer.len() => Ok(start..end),
            _ => Err(CoreError::new(
                CoreErrorCode::OutOfRange,
                format!(
                    "block {index} ({} bytes at start offset {}) lies outside the {}-byte buffer",
                    self.layout.block_size,
                    self.layout.start_offset,
                    self.buffer.len()
                ),
            )),
        }
    }
}
