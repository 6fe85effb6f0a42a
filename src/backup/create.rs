use super::archive::write_archive;
use super::common::MAX_NAME_SEQUENCE;
use super::data::BackupRecord;
use super::hashing::calculate_hash;
use super::index::{load_index, save_index};
use crate::error::{LibraryError, Result};
use crate::filename_utils;
use crate::save_paths::{resolve_save_dir, save_dir_location};
use chrono::{DateTime, Local, Timelike};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Returns true when the directory holds at least one regular file at any depth.
pub(crate) fn has_files(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file())
}

/// Picks the first archive name for `at` that is not taken in the partition.
fn free_archive_path(partition_dir: &Path, at: DateTime<Local>) -> Result<(String, PathBuf)> {
    for sequence in 0..MAX_NAME_SEQUENCE {
        let file_name = filename_utils::format_archive_name(at, sequence);
        let path = partition_dir.join(&file_name);
        if !path.exists() {
            return Ok((file_name, path));
        }
    }
    Err(LibraryError::backup_io(
        partition_dir,
        "no free archive name for this second",
    ))
}

/// Archives the game's save directory into `partition_dir`.
///
/// The caller holds the partition lock. Single attempt: any failure is returned and
/// no partial archive is left behind.
pub(crate) fn create_backup(partition_dir: &Path, game_path: &Path) -> Result<BackupRecord> {
    let save_dir = match resolve_save_dir(game_path)? {
        Some(dir) => dir,
        None => return Err(LibraryError::not_found(&save_dir_location(game_path)?)),
    };
    if !has_files(&save_dir) {
        log::info!("No save files in {:?}, nothing to back up.", save_dir);
        return Err(LibraryError::not_found(&save_dir));
    }

    fs::create_dir_all(partition_dir).map_err(|e| LibraryError::backup_io(partition_dir, e))?;

    let now = Local::now();
    let created_at = now.with_nanosecond(0).unwrap_or(now);
    let (file_name, dest) = free_archive_path(partition_dir, created_at)?;

    let files = write_archive(&save_dir, &dest)?;
    let hash = calculate_hash(&dest).map_err(|e| LibraryError::backup_io(&dest, e))?;

    let mut index = load_index(partition_dir);
    index.archives.insert(file_name.clone(), hash);
    save_index(partition_dir, &index);

    let size = fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
    log::info!("Backed up {} files from {:?} to {:?}", files, save_dir, dest);

    Ok(BackupRecord {
        file_name,
        path: dest,
        created_at,
        size,
    })
}
