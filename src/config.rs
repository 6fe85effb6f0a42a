use crate::error::{LibraryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const DATA_DIR_NAME: &str = "data";

/// Engine runtime folders that never hold a game launcher of their own.
const DEFAULT_DIR_BLACKLIST: &[&str] = &[
    "renpy",
    "lib",
    "python-packages",
    "common",
    "saves",
    "update",
    "game",
    "python27",
];

/// Bundled interpreters and tools that would otherwise look like the game itself.
const DEFAULT_FILE_BLACKLIST: &[&str] = &[
    "python.exe",
    "pythonw.exe",
    "zsync.exe",
    "zsyncmake.exe",
    "librenpy.exe",
    "librenpy-32.exe",
    "renpy.exe",
];

/// Configuration structure for the library.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directories scanned for games.
    pub library_roots: Vec<String>,
    /// Whether scanning continues below a directory that already yielded a game.
    pub deep_search: bool,
    /// Directory names that are never entered while scanning (case-insensitive).
    pub dir_blacklist: Vec<String>,
    /// File names that are never reported as games (case-insensitive).
    pub file_blacklist: Vec<String>,
    /// Where the library store and backups live. Defaults to `data` next to the executable.
    pub data_dir: Option<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            library_roots: Vec::new(),
            deep_search: false,
            dir_blacklist: DEFAULT_DIR_BLACKLIST.iter().map(|s| s.to_string()).collect(),
            file_blacklist: DEFAULT_FILE_BLACKLIST.iter().map(|s| s.to_string()).collect(),
            data_dir: None,
        }
    }
}

impl LibraryConfig {
    /// Resolves the data directory, falling back to `data` beside the executable.
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => exe_dir().join(DATA_DIR_NAME),
        }
    }

    /// Path of the JSON library store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join("library.json")
    }

    /// Root under which per-game backup partitions are created.
    pub fn backup_root(&self) -> PathBuf {
        self.data_dir().join("backups")
    }

    /// Adds a library root after checking that it is an existing directory.
    ///
    /// Returns `false` when the root was already configured.
    pub fn add_library_root(&mut self, path: &str) -> Result<bool> {
        if !is_valid_dir(path) {
            log::warn!("Validation failed: {} is not a directory", path);
            return Err(LibraryError::InvalidInput(format!(
                "{} does not exist or is not a directory",
                path
            )));
        }
        if self.library_roots.iter().any(|r| r == path) {
            return Ok(false);
        }
        self.library_roots.push(path.to_string());
        Ok(true)
    }

    /// Removes a library root. Returns `false` when it was not configured.
    pub fn remove_library_root(&mut self, path: &str) -> bool {
        let before = self.library_roots.len();
        self.library_roots.retain(|r| r != path);
        before != self.library_roots.len()
    }
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolves the path to the configuration file.
///
/// Attempts to locate `config.json` in the same directory as the executable.
/// Defaults to `config.json` in the current working directory if the executable path cannot be determined.
pub fn get_config_path() -> PathBuf {
    std::env::current_exe()
        .map(|p| p.parent().unwrap_or(Path::new(".")).join(CONFIG_FILE_NAME))
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE_NAME))
}

/// Loads configuration from a specific file path.
///
/// Returns `LibraryConfig::default()` if the file does not exist or cannot be parsed.
pub fn load_config_from_path(path: &Path) -> LibraryConfig {
    log::info!("Loading configuration from: {:?}", path);
    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    log::info!("Configuration loaded successfully");
                    return config;
                }
                Err(e) => log::error!("Failed to parse configuration: {}", e),
            },
            Err(e) => log::error!("Failed to read configuration file: {}", e),
        }
    } else {
        log::info!("Configuration file not found, using defaults");
    }
    LibraryConfig::default()
}

/// Writes the configuration as pretty JSON, creating parent directories as needed.
pub fn save_config_to_path(path: &Path, config: &LibraryConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| LibraryError::Persistence(format!("{:?}: {}", parent, e)))?;
        }
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).map_err(|e| {
        log::error!("Failed to write config file: {}", e);
        LibraryError::Persistence(format!("failed to write {:?}: {}", path, e))
    })?;
    log::info!("Configuration saved successfully to {:?}", path);
    Ok(())
}

/// Validates if the provided string is a valid directory path.
fn is_valid_dir(path: &str) -> bool {
    Path::new(path).is_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Tests that the defaults carry the engine blacklists.
    #[test]
    fn test_default_blacklists() {
        let config = LibraryConfig::default();
        assert!(config.dir_blacklist.iter().any(|d| d == "renpy"));
        assert!(config.file_blacklist.iter().any(|f| f == "python.exe"));
        assert!(!config.deep_search);
    }

    /// Tests that a partial config file falls back to defaults for missing keys.
    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LibraryConfig = serde_json::from_str(r#"{"deep_search":true}"#).unwrap();
        assert!(config.deep_search);
        assert_eq!(config.file_blacklist, LibraryConfig::default().file_blacklist);
    }

    /// Tests that an invalid path string is rejected.
    #[test]
    fn test_validate_path_invalid() {
        assert!(!is_valid_dir("::invalid::path::??"));
    }

    /// Tests saving and loading configuration round trip through disk.
    #[test]
    fn test_save_then_load() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("config.json");
        let config = LibraryConfig {
            library_roots: vec!["D:\\Games".to_string()],
            data_dir: Some("D:\\ShelfData".to_string()),
            ..LibraryConfig::default()
        };
        save_config_to_path(&config_path, &config).unwrap();

        let loaded = load_config_from_path(&config_path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.store_path(), PathBuf::from("D:\\ShelfData").join("library.json"));
    }

    /// Tests loading configuration from a missing file returns default.
    #[test]
    fn test_load_config_from_path_missing() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let loaded = load_config_from_path(&temp_dir.path().join("missing.json"));
        assert_eq!(loaded, LibraryConfig::default());
    }

    /// Tests that a corrupt file yields defaults instead of an error.
    #[test]
    fn test_load_config_from_path_corrupt() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{not json").unwrap();
        assert_eq!(load_config_from_path(&config_path), LibraryConfig::default());
    }

    /// Tests adding and removing library roots.
    #[test]
    fn test_library_roots() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_string_lossy().to_string();
        let mut config = LibraryConfig::default();

        assert!(config.add_library_root(&root).unwrap());
        assert!(!config.add_library_root(&root).unwrap());
        assert_eq!(config.library_roots.len(), 1);

        let missing = temp_dir.path().join("missing").to_string_lossy().to_string();
        assert!(config.add_library_root(&missing).is_err());

        assert!(config.remove_library_root(&root));
        assert!(!config.remove_library_root(&root));
    }
}
