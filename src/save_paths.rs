use crate::error::{LibraryError, Result};
use std::path::{Path, PathBuf};

/// Save data location relative to the game's folder (Ren'Py layout).
const SAVE_SUBDIR: [&str; 2] = ["game", "saves"];

/// Returns the folder that contains the game's launcher.
pub fn game_dir(game_path: &Path) -> Result<&Path> {
    game_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            LibraryError::InvalidInput(format!("{:?} has no containing folder", game_path))
        })
}

/// Where the game keeps its saves, whether or not the directory exists yet.
pub fn save_dir_location(game_path: &Path) -> Result<PathBuf> {
    let mut dir = game_dir(game_path)?.to_path_buf();
    for part in SAVE_SUBDIR {
        dir.push(part);
    }
    Ok(dir)
}

/// Resolves the game's current save directory, or `None` when it has none.
pub fn resolve_save_dir(game_path: &Path) -> Result<Option<PathBuf>> {
    let dir = save_dir_location(game_path)?;
    if dir.is_dir() {
        Ok(Some(dir))
    } else {
        Ok(None)
    }
}

/// Name of the per-game backup partition: the containing folder's name.
pub fn backup_partition(game_path: &Path) -> Result<String> {
    game_dir(game_path)?
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            LibraryError::InvalidInput(format!("cannot derive a folder name from {:?}", game_path))
        })
}
