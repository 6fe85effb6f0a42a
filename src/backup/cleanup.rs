use super::index::{load_index, save_index};
use crate::error::{LibraryError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves `backup_path` and checks that it lies inside `backup_root`.
pub(crate) fn verify_backup_path(backup_root: &Path, backup_path: &Path) -> Result<PathBuf> {
    let canonical_target = backup_path
        .canonicalize()
        .map_err(|_| LibraryError::not_found(backup_path))?;
    let canonical_root = backup_root
        .canonicalize()
        .map_err(|_| LibraryError::not_found(backup_root))?;

    if !canonical_target.starts_with(&canonical_root) || canonical_target == canonical_root {
        return Err(LibraryError::InvalidInput(format!(
            "{:?} is outside the backup directory",
            backup_path
        )));
    }

    Ok(canonical_target)
}

/// Deletes one archive and drops it from its partition index.
pub(crate) fn delete_archive(archive_path: &Path) -> Result<()> {
    if !archive_path.is_file() {
        return Err(LibraryError::not_found(archive_path));
    }
    fs::remove_file(archive_path).map_err(|e| LibraryError::backup_io(archive_path, e))?;
    log::info!("Deleted backup: {:?}", archive_path);

    if let (Some(partition_dir), Some(name)) = (archive_path.parent(), archive_path.file_name()) {
        let mut index = load_index(partition_dir);
        if index.archives.remove(&*name.to_string_lossy()).is_some() {
            save_index(partition_dir, &index);
        }
    }
    Ok(())
}
