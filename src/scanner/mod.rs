//! Directory scanner: finds loose game builds and picks one launcher per title.

pub mod classify;
pub(crate) mod group;
pub mod version;
mod walk;


use crate::config::LibraryConfig;
use serde::Serialize;
use std::path::PathBuf;

pub use classify::{classify, ExecutableKind, Platform};
pub use version::infer_version;
pub use walk::scan;

/// A game found on disk, not yet persisted.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GameCandidate {
    /// File name of the chosen launcher (e.g. `GameA.exe`).
    pub name: String,
    pub path: PathBuf,
    pub kind: ExecutableKind,
    /// Version inferred from the folder or file name, if any.
    pub version: Option<String>,
}

/// Parameters of one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Keep descending below a directory that already yielded a game.
    pub deep_search: bool,
    pub dir_blacklist: Vec<String>,
    pub file_blacklist: Vec<String>,
    /// Launchers of other platforms are ignored.
    pub platform: Platform,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            deep_search: false,
            dir_blacklist: Vec::new(),
            file_blacklist: Vec::new(),
            platform: Platform::current(),
        }
    }
}

impl ScanOptions {
    /// Builds scan options from the library configuration.
    pub fn from_config(config: &LibraryConfig) -> Self {
        Self {
            deep_search: config.deep_search,
            dir_blacklist: config.dir_blacklist.clone(),
            file_blacklist: config.file_blacklist.clone(),
            platform: Platform::current(),
        }
    }
}
