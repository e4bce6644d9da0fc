use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use super::error::{CoreError, CoreErrorCode};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Copies `source` into `backup_dir` as `<stem>_<YYYYmmdd_HHMMSS><.ext>`,
/// creating the directory if needed. Returns the path of the copy.
pub fn create_backup(source: &Path, backup_dir: &Path) -> Result<PathBuf, CoreError> {
    if !source.is_file() {
        return Err(CoreError::new(
            CoreErrorCode::NotFound,
            format!("cannot back up {}: file not found", source.display()),
        ));
    }

    fs::create_dir_all(backup_dir)
        .map_err(|e| CoreError::from_io(&e, "create backup directory", backup_dir))?;

    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let target = backup_dir.join(backup_file_name(source, &timestamp));
    fs::copy(source, &target).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!(
                "failed to copy {} to {}: {e}",
                source.display(),
                target.display()
            ),
        )
    })?;

    tracing::info!(source = %source.display(), backup = %target.display(), "backup created");
    Ok(target)
}

fn backup_file_name(source: &Path, timestamp: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    match source.extension() {
        Some(ext) => format!("{stem}_{timestamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{timestamp}"),
    }
}
