use std::io;
use std::path::{Path, PathBuf};

/// Errors surfaced by the scanner, the session tracker, the backup manager and the store.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// A directory could not be read during a scan.
    #[error("failed to read {path:?}: {source}")]
    ScanIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The game process could not be started.
    #[error("failed to launch {path:?}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The library store could not be read or written.
    #[error("library store error: {0}")]
    Persistence(String),

    /// A backup archive could not be written, read or extracted.
    #[error("backup error at {path:?}: {message}")]
    BackupIo { path: PathBuf, message: String },

    /// The target of an operation no longer exists.
    #[error("not found: {0:?}")]
    NotFound(PathBuf),

    /// The caller passed something this crate cannot act on.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LibraryError {
    /// Returns a stable identifier for the error kind, suitable for user-facing reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            LibraryError::ScanIo { .. } => "scan_io",
            LibraryError::Spawn { .. } => "spawn",
            LibraryError::Persistence(_) => "persistence",
            LibraryError::BackupIo { .. } => "backup_io",
            LibraryError::NotFound(_) => "not_found",
            LibraryError::InvalidInput(_) => "invalid_input",
        }
    }

    pub(crate) fn scan_io(path: &Path, source: io::Error) -> Self {
        LibraryError::ScanIo {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn backup_io(path: &Path, message: impl ToString) -> Self {
        LibraryError::BackupIo {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub(crate) fn not_found(path: &Path) -> Self {
        LibraryError::NotFound(path.to_path_buf())
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(e: serde_json::Error) -> Self {
        LibraryError::Persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that every variant reports a distinct kind string.
    #[test]
    fn test_kind_strings() {
        let path = Path::new("/games/a");
        let kinds = [
            LibraryError::scan_io(path, io::Error::from(io::ErrorKind::PermissionDenied)).kind(),
            LibraryError::Spawn {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }
            .kind(),
            LibraryError::Persistence("disk full".to_string()).kind(),
            LibraryError::backup_io(path, "corrupt").kind(),
            LibraryError::not_found(path).kind(),
            LibraryError::InvalidInput("x".to_string()).kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    /// Tests that JSON failures are classified as persistence errors.
    #[test]
    fn test_json_error_is_persistence() {
        let err: LibraryError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), "persistence");
    }
}
