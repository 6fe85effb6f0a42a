//! Save-data backups: zip archives partitioned per game folder.

mod archive;
mod cleanup;
mod common;
mod create;
pub mod data;
mod hashing;
mod index;
mod listing;
mod restore;


pub use data::{BackupRecord, RestoreReport, RestoreStrategy};

use crate::error::{LibraryError, Result};
use crate::filename_utils;
use crate::keyed_lock::{lock_slot, KeyedMutex};
use crate::save_paths::backup_partition;
use std::path::{Path, PathBuf};

/// Creates, lists, deletes and restores save backups under one backup root.
///
/// Layout: `<backup_root>/<game folder name>/<timestamp>.zip`, plus an `index.json`
/// per partition. Operations on one partition are serialized; different games run
/// independently.
pub struct BackupManager {
    backup_root: PathBuf,
    locks: KeyedMutex<String, ()>,
}

impl BackupManager {
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
            locks: KeyedMutex::new(),
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    fn partition_dir(&self, partition: &str) -> PathBuf {
        self.backup_root.join(partition)
    }

    /// Runs `op` holding the partition's lock, then lets the lock go.
    fn locked<R>(&self, partition: &str, op: impl FnOnce() -> Result<R>) -> Result<R> {
        let key = partition.to_string();
        let slot = self.locks.slot(&key);
        let outcome = {
            let _guard = lock_slot(&slot);
            op()
        };
        drop(slot);
        self.locks.remove_if(&key, |_| true);
        outcome
    }

    /// Archives the game's current saves.
    pub fn create_backup(&self, game_path: &Path) -> Result<BackupRecord> {
        let partition = backup_partition(game_path)?;
        self.locked(&partition, || {
            create::create_backup(&self.partition_dir(&partition), game_path)
        })
    }

    /// Lists the game's backups, newest first. No backups is an empty list.
    pub fn list_backups(&self, game_path: &Path) -> Result<Vec<BackupRecord>> {
        let partition = backup_partition(game_path)?;
        self.locked(&partition, || listing::list_partition(&self.partition_dir(&partition)))
    }

    /// Resolves an archive path, which must name an existing archive under the backup root.
    fn resolve_archive(&self, backup_path: &Path) -> Result<PathBuf> {
        if !backup_path.is_file() {
            return Err(LibraryError::not_found(backup_path));
        }
        if !filename_utils::is_archive_path(backup_path) {
            return Err(LibraryError::InvalidInput(format!(
                "{:?} is not a backup archive",
                backup_path
            )));
        }
        cleanup::verify_backup_path(&self.backup_root, backup_path)
    }

    /// Deletes one archive. A missing archive is an error.
    pub fn delete_backup(&self, backup_path: &Path) -> Result<()> {
        let archive = self.resolve_archive(backup_path)?;
        let partition = archive
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.locked(&partition, || cleanup::delete_archive(&archive))
    }

    /// Restores `backup_path` into the game's save directory using `strategy`.
    ///
    /// The archive must be one of this game's own backups. `DeleteAndReplace`
    /// discards the current saves for good; obtaining the user's confirmation is
    /// up to the caller.
    pub fn restore_backup(
        &self,
        game_path: &Path,
        backup_path: &Path,
        strategy: RestoreStrategy,
    ) -> Result<RestoreReport> {
        let partition = backup_partition(game_path)?;
        let partition_dir = self.partition_dir(&partition);
        let archive = self.resolve_archive(backup_path)?;
        let in_partition = partition_dir
            .canonicalize()
            .is_ok_and(|dir| archive.parent() == Some(dir.as_path()));
        if !in_partition {
            return Err(LibraryError::InvalidInput(format!(
                "{:?} is not a backup of {:?}",
                backup_path, game_path
            )));
        }

        self.locked(&partition, || {
            restore::restore_backup(&partition_dir, game_path, &archive, strategy)
        })
    }
}
