use crate::error::LibraryError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Represents one backup archive.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BackupRecord {
    /// Archive file name (e.g. `2024-05-01_21-04-33.zip`).
    pub file_name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
    pub size: u64,
}

/// What happens to the current saves before a backup is extracted over them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RestoreStrategy {
    /// Archive the current saves first, then replace them.
    ArchiveAndReplace,
    /// Move the current saves to a timestamped sibling directory.
    RenameAndReplace,
    /// Delete the current saves. No safety net; callers confirm with the user first.
    DeleteAndReplace,
}

impl RestoreStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreStrategy::ArchiveAndReplace => "archiveAndReplace",
            RestoreStrategy::RenameAndReplace => "renameAndReplace",
            RestoreStrategy::DeleteAndReplace => "deleteAndReplace",
        }
    }

    /// True for the strategy that destroys saves without keeping a copy.
    pub fn is_destructive(&self) -> bool {
        matches!(self, RestoreStrategy::DeleteAndReplace)
    }
}

impl fmt::Display for RestoreStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestoreStrategy {
    type Err = LibraryError;

    /// Accepts the camelCase names and the short forms `archive`/`backup`, `rename`, `delete`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "archive" | "backup" | "archiveandreplace" => Ok(RestoreStrategy::ArchiveAndReplace),
            "rename" | "renameandreplace" => Ok(RestoreStrategy::RenameAndReplace),
            "delete" | "deleteandreplace" => Ok(RestoreStrategy::DeleteAndReplace),
            _ => Err(LibraryError::InvalidInput(format!(
                "unknown restore strategy {:?}",
                s
            ))),
        }
    }
}

/// Outcome of a completed restore.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RestoreReport {
    pub save_dir: PathBuf,
    pub strategy: RestoreStrategy,
    /// Archive taken of the previous saves (`ArchiveAndReplace` only).
    pub safety_backup: Option<BackupRecord>,
    /// Where the previous saves were moved (`RenameAndReplace` only).
    pub renamed_to: Option<PathBuf>,
    pub restored_files: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_short_and_long_names() {
        assert_eq!(
            "backup".parse::<RestoreStrategy>().unwrap(),
            RestoreStrategy::ArchiveAndReplace
        );
        assert_eq!(
            "renameAndReplace".parse::<RestoreStrategy>().unwrap(),
            RestoreStrategy::RenameAndReplace
        );
        assert_eq!(
            "DELETE".parse::<RestoreStrategy>().unwrap(),
            RestoreStrategy::DeleteAndReplace
        );
        assert_eq!(
            "wipe".parse::<RestoreStrategy>().unwrap_err().kind(),
            "invalid_input"
        );
    }

    #[test]
    fn strategy_serializes_camel_case() {
        let json = serde_json::to_string(&RestoreStrategy::ArchiveAndReplace).unwrap();
        assert_eq!(json, "\"archiveAndReplace\"");
        assert!(RestoreStrategy::DeleteAndReplace.is_destructive());
        assert!(!RestoreStrategy::RenameAndReplace.is_destructive());
    }
}
