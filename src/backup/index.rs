use super::common::INDEX_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Integrity index of one backup partition.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub(crate) struct BackupIndex {
    /// Archive file name to SHA-256 hex digest.
    #[serde(default)]
    pub(crate) archives: BTreeMap<String, String>,
}

/// Loads the index of a partition directory.
/// Returns an empty index if the file is missing or invalid.
pub(crate) fn load_index(partition_dir: &Path) -> BackupIndex {
    let index_path = partition_dir.join(INDEX_FILE_NAME);
    if !index_path.exists() {
        return BackupIndex::default();
    }
    match fs::read_to_string(&index_path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(index) => index,
            Err(e) => {
                log::warn!("Ignoring unreadable backup index {:?}: {}", index_path, e);
                BackupIndex::default()
            }
        },
        Err(e) => {
            log::warn!("Failed to read backup index {:?}: {}", index_path, e);
            BackupIndex::default()
        }
    }
}

/// Saves the index into the partition directory.
///
/// The index only speeds up integrity checks, so a failed write is logged, not returned.
pub(crate) fn save_index(partition_dir: &Path, index: &BackupIndex) {
    let index_path = partition_dir.join(INDEX_FILE_NAME);
    match serde_json::to_string_pretty(index) {
        Ok(content) => {
            if let Err(e) = fs::write(&index_path, content) {
                log::error!("Failed to write backup index {:?}: {}", index_path, e);
            }
        }
        Err(e) => log::error!("Failed to serialize backup index: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Tests that a saved index loads back.
    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let mut index = BackupIndex::default();
        index
            .archives
            .insert("2024-01-01_10-00-00.zip".to_string(), "abc".to_string());
        save_index(dir.path(), &index);
        assert_eq!(load_index(dir.path()), index);
    }

    /// Tests that a corrupt index is treated as empty.
    #[test]
    fn test_load_corrupt_index() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE_NAME), "{ not json").unwrap();
        assert!(load_index(dir.path()).archives.is_empty());
    }
}
