use super::classify::classify;
use super::group::{pick_canonical, LauncherFile};
use super::version::infer_version;
use super::{GameCandidate, ScanOptions};
use crate::error::{LibraryError, Result};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sorted contents of one directory.
#[derive(Debug, Default)]
struct Listing {
    dirs: Vec<(String, PathBuf)>,
    files: Vec<(String, PathBuf)>,
}

/// Reads one directory, sorted by name so traversal is reproducible.
///
/// Symlinked directories are not followed; symlinked files are.
fn read_listing(dir: &Path) -> io::Result<Listing> {
    let mut listing = Listing::default();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if file_type.is_dir() {
            listing.dirs.push((name, path));
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            listing.files.push((name, path));
        }
    }
    listing.dirs.sort_by(|a, b| a.0.cmp(&b.0));
    listing.files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(listing)
}

/// Lowercased blacklists for case-insensitive lookups.
struct Filters {
    dirs: HashSet<String>,
    files: HashSet<String>,
}

impl Filters {
    fn new(options: &ScanOptions) -> Self {
        Self {
            dirs: options.dir_blacklist.iter().map(|d| d.to_lowercase()).collect(),
            files: options.file_blacklist.iter().map(|f| f.to_lowercase()).collect(),
        }
    }

    fn dir_blocked(&self, name: &str) -> bool {
        self.dirs.contains(&name.to_lowercase())
    }

    fn file_blocked(&self, name: &str) -> bool {
        self.files.contains(&name.to_lowercase())
    }
}

/// Scans `root` for games and returns one canonical launcher per title.
///
/// Traversal is a depth-first walk over an explicit stack of pending directories,
/// visiting siblings in name order. A directory that cannot be read is logged and
/// skipped; the scan itself only fails when `root` is not a directory.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Vec<GameCandidate>> {
    if !root.is_dir() {
        return Err(LibraryError::not_found(root));
    }

    let filters = Filters::new(options);
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut found: Vec<GameCandidate> = Vec::new();
    let mut skipped = 0usize;

    while let Some(dir) = pending.pop() {
        let listing = match read_listing(&dir) {
            Ok(listing) => listing,
            Err(e) => {
                let err = LibraryError::scan_io(&dir, e);
                log::warn!("Skipping subtree: {}", err);
                skipped += 1;
                continue;
            }
        };

        let launchers: Vec<LauncherFile> = listing
            .files
            .into_iter()
            .filter(|(name, _)| !filters.file_blocked(name))
            .filter_map(|(name, path)| {
                classify(&name, options.platform).map(|kind| LauncherFile { name, path, kind })
            })
            .collect();

        let canonical = pick_canonical(launchers);
        let yielded = !canonical.is_empty();
        for launcher in canonical {
            if !seen.insert(launcher.path.clone()) {
                continue;
            }
            log::debug!("Found game {:?} ({:?})", launcher.path, launcher.kind);
            found.push(GameCandidate {
                version: infer_version(&launcher.path),
                name: launcher.name,
                path: launcher.path,
                kind: launcher.kind,
            });
        }

        if yielded && !options.deep_search {
            continue;
        }

        // Reverse so the alphabetically first subdirectory is popped first.
        for (name, path) in listing.dirs.into_iter().rev() {
            if filters.dir_blocked(&name) {
                log::debug!("Pruned blacklisted directory {:?}", path);
                continue;
            }
            pending.push(path);
        }
    }

    log::info!(
        "Scan of {:?} found {} games ({} unreadable directories skipped)",
        root,
        found.len(),
        skipped
    );
    Ok(found)
}
