//! Persistent library entries and the store contract the core writes through.

use crate::error::{LibraryError, Result};
use crate::scanner::GameCandidate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Highest star rating a game can carry.
pub const MAX_RATING: u8 = 5;
/// Highest completion percentage.
pub const MAX_COMPLETION: u8 = 100;

/// A game persisted in the library. The path is the identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameEntry {
    pub path: String,
    pub name: String,
    pub game_type: String,
    #[serde(default)]
    pub play_time_seconds: u64,
    #[serde(default)]
    pub icon_path: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Local time of the last finished session (`%Y-%m-%d %H:%M:%S`).
    #[serde(default)]
    pub last_played: Option<String>,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub completion_percent: u8,
}

impl GameEntry {
    /// Creates a fresh entry with no play time.
    pub fn new(path: impl Into<String>, name: impl Into<String>, game_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            game_type: game_type.into(),
            play_time_seconds: 0,
            icon_path: None,
            description: None,
            version: None,
            last_played: None,
            rating: 0,
            is_hidden: false,
            completion_percent: 0,
        }
    }

    /// Builds an entry for a freshly scanned candidate.
    pub fn from_candidate(candidate: &GameCandidate) -> Self {
        let mut entry = Self::new(
            candidate.path.to_string_lossy(),
            candidate.name.clone(),
            candidate.kind.as_str(),
        );
        entry.version = candidate.version.clone();
        entry
    }

    fn clamped(mut self) -> Self {
        self.rating = self.rating.min(MAX_RATING);
        self.completion_percent = self.completion_percent.min(MAX_COMPLETION);
        self
    }
}

/// A user-defined collection of games.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
struct Membership {
    path: String,
    folder_id: u64,
}

/// On-disk layout. Older files hold only the array of games.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLibrary {
    Current {
        games: Vec<GameEntry>,
        #[serde(default)]
        folders: Vec<Folder>,
        #[serde(default)]
        memberships: Vec<Membership>,
    },
    Games(Vec<GameEntry>),
}

#[derive(Serialize)]
struct StoredLibraryRef<'a> {
    games: Vec<&'a GameEntry>,
    folders: Vec<&'a Folder>,
    memberships: Vec<Membership>,
}

/// Everything the store keeps in memory.
#[derive(Debug, Clone, Default)]
struct Catalog {
    games: BTreeMap<String, GameEntry>,
    folders: BTreeMap<u64, Folder>,
    /// Game path to the ids of the folders it belongs to.
    memberships: BTreeMap<String, BTreeSet<u64>>,
}

impl Catalog {
    fn from_stored(stored: StoredLibrary) -> Self {
        let (games, folders, memberships) = match stored {
            StoredLibrary::Current {
                games,
                folders,
                memberships,
            } => (games, folders, memberships),
            StoredLibrary::Games(games) => (games, Vec::new(), Vec::new()),
        };
        let mut catalog = Catalog {
            games: games.into_iter().map(|e| (e.path.clone(), e)).collect(),
            folders: folders.into_iter().map(|f| (f.id, f)).collect(),
            memberships: BTreeMap::new(),
        };
        for m in memberships {
            if catalog.games.contains_key(&m.path) && catalog.folders.contains_key(&m.folder_id) {
                catalog.memberships.entry(m.path).or_default().insert(m.folder_id);
            } else {
                log::warn!("Dropping dangling folder membership {} -> {}", m.path, m.folder_id);
            }
        }
        catalog
    }

    fn to_stored(&self) -> StoredLibraryRef<'_> {
        StoredLibraryRef {
            games: self.games.values().collect(),
            folders: self.folders.values().collect(),
            memberships: self
                .memberships
                .iter()
                .flat_map(|(path, ids)| {
                    ids.iter().map(move |id| Membership {
                        path: path.clone(),
                        folder_id: *id,
                    })
                })
                .collect(),
        }
    }

    fn game_mut(&mut self, path: &str) -> Result<&mut GameEntry> {
        self.games
            .get_mut(path)
            .ok_or_else(|| LibraryError::NotFound(PathBuf::from(path)))
    }

    fn require_folder(&self, id: u64) -> Result<()> {
        if self.folders.contains_key(&id) {
            Ok(())
        } else {
            Err(LibraryError::InvalidInput(format!("no folder with id {}", id)))
        }
    }
}

/// Persistence boundary for library entries.
///
/// Implementations must be safe to share between the scanner caller and the
/// session tracker's exit threads.
pub trait LibraryStore: Send + Sync {
    /// Inserts the entry or replaces the one with the same path.
    fn upsert(&self, entry: GameEntry) -> Result<()>;

    /// Inserts the entry only when its path is unknown. Returns whether it was added.
    fn insert_if_absent(&self, entry: GameEntry) -> Result<bool>;

    fn get(&self, path: &str) -> Result<Option<GameEntry>>;

    fn list_all(&self) -> Result<Vec<GameEntry>>;

    /// Adds `seconds` to the accumulated play time and stamps `last_played`.
    fn add_playtime(&self, path: &str, seconds: u64) -> Result<()>;

    /// Removes the entry and its folder memberships.
    fn delete(&self, path: &str) -> Result<()>;
}

/// A `LibraryStore` kept in a single JSON file, together with the user's folders.
pub struct JsonLibraryStore {
    file: PathBuf,
    catalog: Mutex<Catalog>,
}

impl JsonLibraryStore {
    /// Opens the store, starting empty when the file does not exist yet.
    pub fn open(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let catalog = if file.exists() {
            let content = fs::read_to_string(&file)
                .map_err(|e| LibraryError::Persistence(format!("failed to read {:?}: {}", file, e)))?;
            Catalog::from_stored(serde_json::from_str(&content)?)
        } else {
            Catalog::default()
        };
        log::debug!(
            "Opened library store {:?} with {} games and {} folders",
            file,
            catalog.games.len(),
            catalog.folders.len()
        );
        Ok(Self {
            file,
            catalog: Mutex::new(catalog),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    fn lock(&self) -> Result<MutexGuard<'_, Catalog>> {
        self.catalog
            .lock()
            .map_err(|_| LibraryError::Persistence("library store lock poisoned".to_string()))
    }

    /// Applies `change` and persists the catalog. The in-memory state is rolled
    /// back when `change` fails or the file cannot be written.
    fn commit<R, F>(&self, change: F) -> Result<R>
    where
        F: FnOnce(&mut Catalog) -> Result<R>,
    {
        let mut catalog = self.lock()?;
        let previous = catalog.clone();
        let outcome = change(&mut *catalog).and_then(|r| self.write(&catalog).map(|()| r));
        if outcome.is_err() {
            *catalog = previous;
        }
        outcome
    }

    /// Applies `edit` to one entry and persists the result.
    pub fn update<F>(&self, path: &str, edit: F) -> Result<GameEntry>
    where
        F: FnOnce(&mut GameEntry),
    {
        self.commit(|catalog| {
            let entry = catalog.game_mut(path)?;
            edit(entry);
            *entry = entry.clone().clamped();
            Ok(entry.clone())
        })
    }

    /// Creates a folder. Names are trimmed and must be unique.
    pub fn create_folder(&self, name: &str) -> Result<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::InvalidInput("folder name cannot be empty".to_string()));
        }
        self.commit(|catalog| {
            if catalog.folders.values().any(|f| f.name == name) {
                return Err(LibraryError::InvalidInput(format!(
                    "a folder named {:?} already exists",
                    name
                )));
            }
            let id = catalog.folders.keys().next_back().map_or(1, |last| last + 1);
            let folder = Folder {
                id,
                name: name.to_string(),
            };
            catalog.folders.insert(id, folder.clone());
            log::info!("Created folder {:?} ({})", folder.name, id);
            Ok(folder)
        })
    }

    /// All folders, ordered by name.
    pub fn folders(&self) -> Result<Vec<Folder>> {
        let mut folders: Vec<Folder> = self.lock()?.folders.values().cloned().collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    /// Puts a game into a folder. Adding it twice is a no-op.
    pub fn add_to_folder(&self, path: &str, folder_id: u64) -> Result<()> {
        self.commit(|catalog| {
            catalog.require_folder(folder_id)?;
            catalog.game_mut(path)?;
            catalog
                .memberships
                .entry(path.to_string())
                .or_default()
                .insert(folder_id);
            Ok(())
        })
    }

    /// Takes a game out of a folder. Returns whether it was in it.
    pub fn remove_from_folder(&self, path: &str, folder_id: u64) -> Result<bool> {
        self.commit(|catalog| {
            let Some(ids) = catalog.memberships.get_mut(path) else {
                return Ok(false);
            };
            let removed = ids.remove(&folder_id);
            if ids.is_empty() {
                catalog.memberships.remove(path);
            }
            Ok(removed)
        })
    }

    /// Games in one folder. An unknown folder is InvalidInput.
    pub fn games_in_folder(&self, folder_id: u64) -> Result<Vec<GameEntry>> {
        let catalog = self.lock()?;
        catalog.require_folder(folder_id)?;
        Ok(catalog
            .memberships
            .iter()
            .filter(|(_, ids)| ids.contains(&folder_id))
            .filter_map(|(path, _)| catalog.games.get(path).cloned())
            .collect())
    }

    /// Ids of the folders a game belongs to, ascending.
    pub fn folders_for_game(&self, path: &str) -> Result<Vec<u64>> {
        Ok(self
            .lock()?
            .memberships
            .get(path)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default())
    }

    /// Writes the catalog to a sibling temp file, then renames it over the store.
    fn write(&self, catalog: &Catalog) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LibraryError::Persistence(format!("failed to create {:?}: {}", parent, e))
                })?;
            }
        }
        let content = serde_json::to_string_pretty(&catalog.to_stored())?;
        let tmp = self.file.with_extension("json.tmp");
        fs::write(&tmp, content)
            .map_err(|e| LibraryError::Persistence(format!("failed to write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, &self.file).map_err(|e| {
            LibraryError::Persistence(format!("failed to replace {:?}: {}", self.file, e))
        })
    }
}

impl LibraryStore for JsonLibraryStore {
    fn upsert(&self, entry: GameEntry) -> Result<()> {
        let entry = entry.clamped();
        self.commit(|catalog| {
            catalog.games.insert(entry.path.clone(), entry);
            Ok(())
        })
    }

    fn insert_if_absent(&self, entry: GameEntry) -> Result<bool> {
        let entry = entry.clamped();
        if self.lock()?.games.contains_key(&entry.path) {
            return Ok(false);
        }
        self.commit(|catalog| {
            if catalog.games.contains_key(&entry.path) {
                return Ok(false);
            }
            catalog.games.insert(entry.path.clone(), entry);
            Ok(true)
        })
    }

    fn get(&self, path: &str) -> Result<Option<GameEntry>> {
        Ok(self.lock()?.games.get(path).cloned())
    }

    fn list_all(&self) -> Result<Vec<GameEntry>> {
        Ok(self.lock()?.games.values().cloned().collect())
    }

    fn add_playtime(&self, path: &str, seconds: u64) -> Result<()> {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.update(path, |entry| {
            entry.play_time_seconds = entry.play_time_seconds.saturating_add(seconds);
            entry.last_played = Some(stamp);
        })?;
        log::info!("Added {}s of play time to {}", seconds, path);
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.commit(|catalog| {
            if catalog.games.remove(path).is_none() {
                return Err(LibraryError::NotFound(PathBuf::from(path)));
            }
            catalog.memberships.remove(path);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(path: &str) -> GameEntry {
        GameEntry::new(path, "Game", "exe")
    }

    /// Tests that entries survive reopening the store.
    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("library.json");
        {
            let store = JsonLibraryStore::open(&file).unwrap();
            store.upsert(entry("/g/a.exe")).unwrap();
            store.upsert(entry("/g/b.exe")).unwrap();
        }
        let store = JsonLibraryStore::open(&file).unwrap();
        let paths: Vec<String> = store.list_all().unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["/g/a.exe".to_string(), "/g/b.exe".to_string()]);
    }

    /// Tests that play time accumulates instead of being overwritten.
    #[test]
    fn test_add_playtime_is_additive() {
        let dir = tempdir().unwrap();
        let store = JsonLibraryStore::open(dir.path().join("library.json")).unwrap();
        store.upsert(entry("/g/a.exe")).unwrap();

        store.add_playtime("/g/a.exe", 30).unwrap();
        store.add_playtime("/g/a.exe", 12).unwrap();

        let game = store.get("/g/a.exe").unwrap().unwrap();
        assert_eq!(game.play_time_seconds, 42);
        assert!(game.last_played.is_some());
    }

    /// Tests that adding play time to an unknown game reports NotFound.
    #[test]
    fn test_add_playtime_unknown_game() {
        let dir = tempdir().unwrap();
        let store = JsonLibraryStore::open(dir.path().join("library.json")).unwrap();
        let err = store.add_playtime("/nope.exe", 5).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    /// Tests that insert_if_absent keeps the existing entry untouched.
    #[test]
    fn test_insert_if_absent_keeps_existing() {
        let dir = tempdir().unwrap();
        let store = JsonLibraryStore::open(dir.path().join("library.json")).unwrap();
        let mut played = entry("/g/a.exe");
        played.play_time_seconds = 600;
        store.upsert(played).unwrap();

        assert!(!store.insert_if_absent(entry("/g/a.exe")).unwrap());
        assert!(store.insert_if_absent(entry("/g/b.exe")).unwrap());
        assert_eq!(store.get("/g/a.exe").unwrap().unwrap().play_time_seconds, 600);
    }

    /// Tests that out-of-range rating and completion are clamped.
    #[test]
    fn test_upsert_clamps_ranges() {
        let dir = tempdir().unwrap();
        let store = JsonLibraryStore::open(dir.path().join("library.json")).unwrap();
        let mut game = entry("/g/a.exe");
        game.rating = 9;
        game.completion_percent = 250;
        store.upsert(game).unwrap();

        let stored = store.get("/g/a.exe").unwrap().unwrap();
        assert_eq!(stored.rating, MAX_RATING);
        assert_eq!(stored.completion_percent, MAX_COMPLETION);
    }

    /// Tests delete removes the entry and rejects unknown paths.
    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let store = JsonLibraryStore::open(dir.path().join("library.json")).unwrap();
        store.upsert(entry("/g/a.exe")).unwrap();

        store.delete("/g/a.exe").unwrap();
        assert!(store.get("/g/a.exe").unwrap().is_none());
        assert!(store.delete("/g/a.exe").is_err());
    }

    /// Tests that a corrupt store file is reported rather than silently replaced.
    #[test]
    fn test_open_corrupt_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("library.json");
        fs::write(&file, "[{").unwrap();
        let err = JsonLibraryStore::open(&file).err().unwrap();
        assert_eq!(err.kind(), "persistence");
    }

    /// Tests that a file holding only the games array still opens.
    #[test]
    fn test_open_games_only_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("library.json");
        fs::write(&file, r#"[{"path": "/g/a.exe", "name": "A", "game_type": "exe"}]"#).unwrap();

        let store = JsonLibraryStore::open(&file).unwrap();
        assert_eq!(store.get("/g/a.exe").unwrap().unwrap().name, "A");
        assert!(store.folders().unwrap().is_empty());
    }

    /// Tests folder creation, membership and persistence.
    #[test]
    fn test_folders() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("library.json");
        {
            let store = JsonLibraryStore::open(&file).unwrap();
            store.upsert(entry("/g/a.exe")).unwrap();
            store.upsert(entry("/g/b.exe")).unwrap();

            let vn = store.create_folder(" Visual novels ").unwrap();
            let done = store.create_folder("Finished").unwrap();
            assert_eq!(vn.name, "Visual novels");
            assert_ne!(vn.id, done.id);
            assert_eq!(store.create_folder("Finished").unwrap_err().kind(), "invalid_input");
            assert_eq!(store.create_folder("  ").unwrap_err().kind(), "invalid_input");

            store.add_to_folder("/g/a.exe", vn.id).unwrap();
            store.add_to_folder("/g/a.exe", vn.id).unwrap();
            store.add_to_folder("/g/a.exe", done.id).unwrap();
            store.add_to_folder("/g/b.exe", vn.id).unwrap();
            assert_eq!(store.add_to_folder("/g/c.exe", vn.id).unwrap_err().kind(), "not_found");
            assert_eq!(store.add_to_folder("/g/a.exe", 99).unwrap_err().kind(), "invalid_input");

            assert!(store.remove_from_folder("/g/b.exe", vn.id).unwrap());
            assert!(!store.remove_from_folder("/g/b.exe", vn.id).unwrap());
        }

        let store = JsonLibraryStore::open(&file).unwrap();
        let names: Vec<String> = store.folders().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Finished", "Visual novels"]);
        let vn = store.folders().unwrap()[1].id;
        let in_vn: Vec<String> = store.games_in_folder(vn).unwrap().into_iter().map(|g| g.path).collect();
        assert_eq!(in_vn, vec!["/g/a.exe"]);
        assert_eq!(store.folders_for_game("/g/a.exe").unwrap().len(), 2);
        assert!(store.folders_for_game("/g/b.exe").unwrap().is_empty());
        assert_eq!(store.games_in_folder(99).unwrap_err().kind(), "invalid_input");
    }

    /// Tests that deleting a game drops it from every folder.
    #[test]
    fn test_delete_drops_memberships() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("library.json");
        let store = JsonLibraryStore::open(&file).unwrap();
        store.upsert(entry("/g/a.exe")).unwrap();
        let folder = store.create_folder("Favorites").unwrap();
        store.add_to_folder("/g/a.exe", folder.id).unwrap();

        store.delete("/g/a.exe").unwrap();
        assert!(store.folders_for_game("/g/a.exe").unwrap().is_empty());
        assert!(store.games_in_folder(folder.id).unwrap().is_empty());

        store.upsert(entry("/g/a.exe")).unwrap();
        assert!(store.folders_for_game("/g/a.exe").unwrap().is_empty());
        let reopened = JsonLibraryStore::open(&file).unwrap();
        assert!(reopened.games_in_folder(folder.id).unwrap().is_empty());
    }

    /// Tests that a change whose write fails is not kept in memory.
    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("library.json");
        let store = JsonLibraryStore::open(&file).unwrap();
        store.upsert(entry("/g/a.exe")).unwrap();

        fs::remove_file(&file).unwrap();
        fs::create_dir(&file).unwrap();
        fs::write(file.join("blocker"), "").unwrap();

        assert_eq!(store.create_folder("Favorites").unwrap_err().kind(), "persistence");
        assert!(store.folders().unwrap().is_empty());
        assert!(store.delete("/g/a.exe").is_err());
        assert!(store.get("/g/a.exe").unwrap().is_some());
    }
}
