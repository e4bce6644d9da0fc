use serde::{Deserialize, Serialize};

use crate::scanner::ScanHit;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeValue {
    pub name: String,
    pub bits: u32,
    pub value: u32,
}

/// Decoded fields of one block, in layout order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    entries: Vec<AttributeValue>,
}

impl Attributes {
    pub(crate) fn from_entries(entries: Vec<AttributeValue>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[AttributeValue] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a AttributeValue;
    type IntoIter = std::slice::Iter<'a, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// How `set_attributes` treats fields that fail validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Skip the bad field, warn, and still apply the rest.
    #[default]
    BestEffort,
    /// Leave the block untouched if any field is skipped.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownField,
    OutOfRange { max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkippedField {
    pub name: String,
    pub value: i64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReport {
    pub applied: Vec<AttributeValue>,
    pub skipped: Vec<SkippedField>,
    /// False when a strict update was rejected and nothing was written.
    pub committed: bool,
}

impl UpdateReport {
    pub fn is_complete(&self) -> bool {
        self.committed && self.skipped.is_empty()
    }
}

/// Everything known about one entity located by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerRecord {
    pub id: u64,
    pub name: String,
    pub hit: ScanHit,
    pub attributes: Attributes,
    pub raw_block: Vec<u8>,
}

impl PlayerRecord {
    pub fn raw_hex(&self) -> String {
        self.raw_block.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityIssue {
    NameDecodingUnsupported,
    HeuristicLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Capabilities {
    pub can_query: bool,
    pub can_edit_attributes: bool,
    pub can_edit_names: bool,
    pub issues: Vec<CapabilityIssue>,
}

impl Capabilities {
    pub fn attributes_only(issues: Vec<CapabilityIssue>) -> Self {
        Self {
            can_query: true,
            can_edit_attributes: true,
            can_edit_names: false,
            issues,
        }
    }
}
