use super::archive::{extract_archive, verify_archive};
use super::common::MAX_NAME_SEQUENCE;
use super::create::create_backup;
use super::data::{RestoreReport, RestoreStrategy};
use super::hashing::calculate_hash;
use super::index::load_index;
use crate::error::{LibraryError, Result};
use crate::filename_utils;
use crate::save_paths::{resolve_save_dir, save_dir_location};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Checks that the archive can be restored. Nothing on disk is changed.
pub(crate) fn validate_archive(archive_path: &Path) -> Result<()> {
    if !archive_path.is_file() {
        return Err(LibraryError::not_found(archive_path));
    }
    verify_archive(archive_path)?;

    let (Some(partition_dir), Some(name)) = (archive_path.parent(), archive_path.file_name()) else {
        return Ok(());
    };
    let index = load_index(partition_dir);
    if let Some(expected) = index.archives.get(&*name.to_string_lossy()) {
        let actual =
            calculate_hash(archive_path).map_err(|e| LibraryError::backup_io(archive_path, e))?;
        if &actual != expected {
            return Err(LibraryError::backup_io(
                archive_path,
                "archive does not match its recorded checksum",
            ));
        }
    }
    Ok(())
}

/// Finds an unused `saves_old_<stamp>` sibling for the save directory.
fn renamed_sibling(save_dir: &Path) -> Result<PathBuf> {
    let dir_name = save_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "saves".to_string());
    let base = filename_utils::format_renamed_saves_name(&dir_name, Local::now());

    let first = save_dir.with_file_name(&base);
    if !first.exists() {
        return Ok(first);
    }
    for sequence in 1..MAX_NAME_SEQUENCE {
        let candidate = save_dir.with_file_name(format!("{}-{}", base, sequence));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(LibraryError::backup_io(save_dir, "no free name for the old saves"))
}

fn remove_saves(save_dir: &Path) -> Result<()> {
    fs::remove_dir_all(save_dir).map_err(|e| LibraryError::backup_io(save_dir, e))
}

/// Replaces the game's saves with the archive's contents.
///
/// 1. The archive is validated; on failure the current saves are untouched.
/// 2. Existing saves are disposed of according to `strategy`.
/// 3. The archive is extracted into a fresh save directory.
///
/// The caller holds the partition lock.
pub(crate) fn restore_backup(
    partition_dir: &Path,
    game_path: &Path,
    archive_path: &Path,
    strategy: RestoreStrategy,
) -> Result<RestoreReport> {
    validate_archive(archive_path)?;

    let save_dir = save_dir_location(game_path)?;
    let mut safety_backup = None;
    let mut renamed_to = None;

    if let Some(current) = resolve_save_dir(game_path)? {
        match strategy {
            RestoreStrategy::ArchiveAndReplace => {
                match create_backup(partition_dir, game_path) {
                    Ok(record) => safety_backup = Some(record),
                    Err(LibraryError::NotFound(_)) => {
                        log::info!("No saves to archive in {:?} before restore", current)
                    }
                    Err(e) => return Err(e),
                }
                remove_saves(&current)?;
            }
            RestoreStrategy::RenameAndReplace => {
                let target = renamed_sibling(&current)?;
                fs::rename(&current, &target).map_err(|e| LibraryError::backup_io(&current, e))?;
                log::info!("Moved old saves to {:?}", target);
                renamed_to = Some(target);
            }
            RestoreStrategy::DeleteAndReplace => {
                log::warn!("Deleting saves in {:?} without a safety copy", current);
                remove_saves(&current)?;
            }
        }
    }

    fs::create_dir_all(&save_dir).map_err(|e| LibraryError::backup_io(&save_dir, e))?;
    let restored_files = extract_archive(archive_path, &save_dir)?;
    log::info!(
        "Restored {} files from {:?} to {:?} ({})",
        restored_files,
        archive_path,
        save_dir,
        strategy
    );

    Ok(RestoreReport {
        save_dir,
        strategy,
        safety_backup,
        renamed_to,
        restored_files,
    })
}
