use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Parse,
    NotFound,
    OutOfRange,
    SizeMismatch,
    InvalidValue,
    UnsupportedOperation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Maps a filesystem error for `path`, keeping missing files distinct
    /// from other I/O failures.
    pub(crate) fn from_io(err: &io::Error, action: &str, path: &Path) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => CoreErrorCode::NotFound,
            _ => CoreErrorCode::Io,
        };
        Self::new(code, format!("failed to {action} {}: {err}", path.display()))
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}
