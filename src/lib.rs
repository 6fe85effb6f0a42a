//! Game Shelf: a library manager for loose game builds.
//!
//! The core is three components sharing one game identity, the launcher path:
//! the [`scanner`] finds games on disk, the [`session`] tracker supervises running
//! games and accumulates play time, and the [`backup`] manager archives and restores
//! save data. [`Library`] ties them to a configuration and a [`store::LibraryStore`].

pub mod backup;
mod cli;
pub mod config;
pub mod error;
pub mod filename_utils;
pub mod keyed_lock;
pub mod launcher;
pub mod library;
pub mod save_paths;
pub mod scanner;
pub mod session;
pub mod store;

pub use backup::{BackupManager, BackupRecord, RestoreReport, RestoreStrategy};
pub use cli::run;
pub use config::LibraryConfig;
pub use error::{LibraryError, Result};
pub use library::{ImportSummary, Library};
pub use scanner::{scan, ExecutableKind, GameCandidate, ScanOptions};
pub use session::{LaunchOutcome, LaunchSessionTracker, SessionInfo, SessionOutcome};
pub use store::{Folder, GameEntry, JsonLibraryStore, LibraryStore};
