use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::error::{CoreError, CoreErrorCode};

const ID_COLUMN: &str = "id";
const NAME_COLUMN: &str = "name";

/// Display names keyed by player identifier, loaded from a comma-separated
/// file with a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    entries: BTreeMap<u64, String>,
}

impl NameTable {
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn load_csv(path: &Path) -> Result<Self, CoreError> {
        let bytes = fs::read(path).map_err(|e| CoreError::from_io(&e, "read", path))?;
        let text = String::from_utf8_lossy(&bytes);
        let table = Self::parse_csv(&text).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })?;
        tracing::debug!(path = %path.display(), entries = table.len(), "loaded name table");
        Ok(table)
    }

    /// Rows whose id is not a non-negative integer are skipped.
    pub fn parse_csv(text: &str) -> Result<Self, CoreError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header = reader.headers().map_err(csv_error)?.clone();
        if header.iter().all(|cell| cell.trim().is_empty()) {
            return Err(CoreError::new(CoreErrorCode::Parse, "name table is empty"));
        }
        let column = |wanted: &str| {
            header
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(wanted))
                .ok_or_else(|| {
                    CoreError::new(
                        CoreErrorCode::Parse,
                        format!("name table header has no {wanted:?} column"),
                    )
                })
        };
        let id_col = column(ID_COLUMN)?;
        let name_col = column(NAME_COLUMN)?;

        let mut entries = BTreeMap::new();
        let mut skipped = 0usize;
        for result in reader.records() {
            let record = result.map_err(csv_error)?;
            let id = record
                .get(id_col)
                .and_then(|cell| cell.trim().parse::<u64>().ok());
            let Some(id) = id else {
                skipped += 1;
                continue;
            };
            let name = record
                .get(name_col)
                .map(|cell| cell.trim().to_string())
                .unwrap_or_default();
            entries.insert(id, name);
        }
        if skipped > 0 {
            tracing::debug!(skipped, "name table rows without a numeric id");
        }

        Ok(Self { entries })
    }

    pub fn insert(&mut self, id: u64, name: impl Into<String>) {
        self.entries.insert(id, name.into());
    }

    pub fn get(&self, id: u64) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Name for `id`, or [`NameTable::UNKNOWN`].
    pub fn lookup(&self, id: u64) -> &str {
        self.get(id).unwrap_or(Self::UNKNOWN)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn csv_error(e: csv::Error) -> CoreError {
    let row = e.position().map(|pos| pos.line()).unwrap_or(0);
    CoreError::new(CoreErrorCode::Parse, format!("name table line {row}: {e}"))
}
