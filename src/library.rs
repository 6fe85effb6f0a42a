//! The library as a whole: configuration, store, sessions and backups behind one handle.

use crate::backup::BackupManager;
use crate::config::LibraryConfig;
use crate::error::{LibraryError, Result};
use crate::launcher::{ProcessLauncher, SystemLauncher};
use crate::scanner::{self, ScanOptions};
use crate::session::{LaunchOutcome, LaunchSessionTracker, SessionListener};
use crate::store::{Folder, GameEntry, JsonLibraryStore, LibraryStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Counts from importing scan results into the store.
#[derive(Debug, Serialize, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Canonical games found on disk.
    pub found: usize,
    /// Games that were not in the library before.
    pub added: usize,
}

impl std::ops::AddAssign for ImportSummary {
    fn add_assign(&mut self, other: Self) {
        self.found += other.found;
        self.added += other.added;
    }
}

pub struct Library {
    config: LibraryConfig,
    store: Arc<JsonLibraryStore>,
    sessions: LaunchSessionTracker,
    backups: BackupManager,
}

impl Library {
    /// Opens the library described by `config`, launching games as OS processes.
    pub fn open(config: LibraryConfig) -> Result<Self> {
        Self::open_with(config, Arc::new(SystemLauncher), None)
    }

    /// Opens the library with a custom process launcher and an optional session listener.
    pub fn open_with(
        config: LibraryConfig,
        launcher: Arc<dyn ProcessLauncher>,
        listener: Option<SessionListener>,
    ) -> Result<Self> {
        let store = Arc::new(JsonLibraryStore::open(config.store_path())?);
        let sessions = match listener {
            Some(listener) => LaunchSessionTracker::with_listener(store.clone(), launcher, listener),
            None => LaunchSessionTracker::new(store.clone(), launcher),
        };
        let backups = BackupManager::new(config.backup_root());
        log::info!("Library opened from {:?}", store.path());
        Ok(Self {
            config,
            store,
            sessions,
            backups,
        })
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn store(&self) -> &JsonLibraryStore {
        &self.store
    }

    pub fn sessions(&self) -> &LaunchSessionTracker {
        &self.sessions
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Scans one root and adds games that are not in the library yet.
    ///
    /// Existing entries keep their play time, rating and notes.
    pub fn scan_root(&self, root: &Path, deep_search: bool) -> Result<ImportSummary> {
        let options = ScanOptions {
            deep_search,
            ..ScanOptions::from_config(&self.config)
        };
        let candidates = scanner::scan(root, &options)?;

        let mut summary = ImportSummary {
            found: candidates.len(),
            added: 0,
        };
        for candidate in &candidates {
            if self.store.insert_if_absent(GameEntry::from_candidate(candidate))? {
                log::info!("Added {:?} to the library", candidate.path);
                summary.added += 1;
            }
        }
        Ok(summary)
    }

    /// Scans every configured root. A root that no longer exists is logged and skipped.
    pub fn scan_roots(&self) -> Result<ImportSummary> {
        let mut total = ImportSummary::default();
        for root in &self.config.library_roots {
            match self.scan_root(Path::new(root), self.config.deep_search) {
                Ok(summary) => total += summary,
                Err(LibraryError::NotFound(path)) => {
                    log::warn!("Library root {:?} is missing, skipping", path)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    /// Lists games by name. Hidden games are left out unless `include_hidden` is set.
    pub fn games(&self, include_hidden: bool) -> Result<Vec<GameEntry>> {
        let mut games: Vec<GameEntry> = self
            .store
            .list_all()?
            .into_iter()
            .filter(|g| include_hidden || !g.is_hidden)
            .collect();
        games.sort_by_key(|g| g.name.to_lowercase());
        Ok(games)
    }

    pub fn game(&self, path: &Path) -> Result<GameEntry> {
        self.store
            .get(&path.to_string_lossy())?
            .ok_or_else(|| LibraryError::not_found(path))
    }

    /// Launches a game that is in the library.
    pub fn launch(&self, path: &Path) -> Result<LaunchOutcome> {
        self.game(path)?;
        self.sessions.launch(path)
    }

    fn edit<F>(&self, path: &Path, edit: F) -> Result<GameEntry>
    where
        F: FnOnce(&mut GameEntry),
    {
        self.store.update(&path.to_string_lossy(), edit)
    }

    pub fn rename_game(&self, path: &Path, name: &str) -> Result<GameEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::InvalidInput("game name cannot be empty".to_string()));
        }
        self.edit(path, |g| g.name = name.to_string())
    }

    pub fn set_description(&self, path: &Path, description: Option<String>) -> Result<GameEntry> {
        self.edit(path, |g| g.description = description)
    }

    pub fn set_version(&self, path: &Path, version: Option<String>) -> Result<GameEntry> {
        self.edit(path, |g| g.version = version)
    }

    pub fn set_icon(&self, path: &Path, icon: Option<PathBuf>) -> Result<GameEntry> {
        let icon = icon.map(|p| p.to_string_lossy().to_string());
        self.edit(path, |g| g.icon_path = icon)
    }

    /// Sets the star rating, clamped to 0..=5.
    pub fn set_rating(&self, path: &Path, rating: u8) -> Result<GameEntry> {
        self.edit(path, |g| g.rating = rating)
    }

    /// Sets the completion percentage, clamped to 0..=100.
    pub fn set_completion(&self, path: &Path, percent: u8) -> Result<GameEntry> {
        self.edit(path, |g| g.completion_percent = percent)
    }

    pub fn set_hidden(&self, path: &Path, hidden: bool) -> Result<GameEntry> {
        self.edit(path, |g| g.is_hidden = hidden)
    }

    /// Forgets a game. Its files and backups stay on disk.
    pub fn remove_game(&self, path: &Path) -> Result<()> {
        self.store.delete(&path.to_string_lossy())
    }

    pub fn create_folder(&self, name: &str) -> Result<Folder> {
        self.store.create_folder(name)
    }

    pub fn folders(&self) -> Result<Vec<Folder>> {
        self.store.folders()
    }

    pub fn add_to_folder(&self, path: &Path, folder_id: u64) -> Result<()> {
        self.store.add_to_folder(&path.to_string_lossy(), folder_id)
    }

    /// Takes a game out of a folder. Returns whether it was in it.
    pub fn remove_from_folder(&self, path: &Path, folder_id: u64) -> Result<bool> {
        self.store.remove_from_folder(&path.to_string_lossy(), folder_id)
    }

    /// Games in a folder, by name. Hidden games are included.
    pub fn games_in_folder(&self, folder_id: u64) -> Result<Vec<GameEntry>> {
        let mut games = self.store.games_in_folder(folder_id)?;
        games.sort_by_key(|g| g.name.to_lowercase());
        Ok(games)
    }

    /// The folders a game belongs to, by name.
    pub fn folders_for_game(&self, path: &Path) -> Result<Vec<Folder>> {
        let ids = self.store.folders_for_game(&path.to_string_lossy())?;
        Ok(self
            .store
            .folders()?
            .into_iter()
            .filter(|f| ids.contains(&f.id))
            .collect())
    }
}
