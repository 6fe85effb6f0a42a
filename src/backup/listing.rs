use super::data::BackupRecord;
use crate::error::{LibraryError, Result};
use crate::filename_utils;
use chrono::{DateTime, Local};
use std::cmp::Reverse;
use std::fs;
use std::path::Path;

/// Builds the record of one archive. The creation time comes from the file name,
/// falling back to the modification time for foreign names.
pub(crate) fn backup_record(path: &Path) -> Result<(BackupRecord, u32)> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| LibraryError::InvalidInput(format!("{:?} is not a file", path)))?;
    let metadata = fs::metadata(path).map_err(|e| LibraryError::backup_io(path, e))?;

    let (created_at, sequence) = match filename_utils::parse_archive_name(&file_name) {
        Some(info) => (info.timestamp, info.sequence),
        None => {
            let modified: DateTime<Local> = metadata
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Local::now());
            (modified, 0)
        }
    };

    Ok((
        BackupRecord {
            file_name,
            path: path.to_path_buf(),
            created_at,
            size: metadata.len(),
        },
        sequence,
    ))
}

/// Lists the archives of one partition, newest first.
/// A missing partition is an empty list.
pub(crate) fn list_partition(partition_dir: &Path) -> Result<Vec<BackupRecord>> {
    if !partition_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(partition_dir).map_err(|e| LibraryError::backup_io(partition_dir, e))? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {:?}: {}", partition_dir, e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || !filename_utils::is_archive_path(&path) {
            continue;
        }
        match backup_record(&path) {
            Ok(record) => found.push(record),
            Err(e) => log::warn!("Skipping backup {:?}: {}", path, e),
        }
    }

    found.sort_by_key(|(record, sequence)| Reverse((record.created_at, *sequence)));
    Ok(found.into_iter().map(|(record, _)| record).collect())
}
