//! Launch session tracking: at most one running process per game path.

use crate::error::{LibraryError, Result};
use crate::keyed_lock::{lock_slot, KeyedMutex};
use crate::launcher::{ProcessLauncher, RunningProcess};
use crate::store::LibraryStore;
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

/// Called once per finished session, after the play-time increment was attempted.
pub type SessionListener = Arc<dyn Fn(&SessionOutcome) + Send + Sync + 'static>;

type SessionSlot = Arc<Mutex<Option<Session>>>;

#[derive(Debug)]
struct Session {
    pid: u32,
    started_at: DateTime<Local>,
    started: Instant,
}

/// Public view of a running session.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionInfo {
    pub path: PathBuf,
    pub pid: u32,
    pub started_at: DateTime<Local>,
}

/// Result of a `launch` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Started { pid: u32 },
    /// The game was already running; nothing was spawned.
    AlreadyRunning { pid: u32 },
}

/// Report delivered to the listener when a session ends.
#[derive(Debug)]
pub struct SessionOutcome {
    pub path: PathBuf,
    pub elapsed_seconds: u64,
    pub exit_code: Option<i32>,
    /// Outcome of the additive play-time update. The session is cleared either way.
    pub persisted: Result<()>,
}

struct TrackerInner {
    store: Arc<dyn LibraryStore>,
    launcher: Arc<dyn ProcessLauncher>,
    sessions: KeyedMutex<PathBuf, Option<Session>>,
    listener: Option<SessionListener>,
}

/// Spawns games and accumulates their play time on exit.
///
/// Each game path has its own slot lock. A launch holds it across the running check,
/// the spawn and the registration; the exit handler holds it while persisting and
/// clearing. Distinct paths never contend.
#[derive(Clone)]
pub struct LaunchSessionTracker {
    inner: Arc<TrackerInner>,
}

impl LaunchSessionTracker {
    pub fn new(store: Arc<dyn LibraryStore>, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self::build(store, launcher, None)
    }

    /// Creates a tracker that reports every finished session to `listener`.
    pub fn with_listener(
        store: Arc<dyn LibraryStore>,
        launcher: Arc<dyn ProcessLauncher>,
        listener: SessionListener,
    ) -> Self {
        Self::build(store, launcher, Some(listener))
    }

    fn build(
        store: Arc<dyn LibraryStore>,
        launcher: Arc<dyn ProcessLauncher>,
        listener: Option<SessionListener>,
    ) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                store,
                launcher,
                sessions: KeyedMutex::new(),
                listener,
            }),
        }
    }

    /// Launches the game at `path` unless it is already running.
    pub fn launch(&self, path: &Path) -> Result<LaunchOutcome> {
        let key = path.to_path_buf();
        let slot = self.inner.sessions.slot(&key);
        let mut current = lock_slot(&slot);

        if let Some(session) = current.as_ref() {
            info!("{:?} is already running (pid {})", path, session.pid);
            return Ok(LaunchOutcome::AlreadyRunning { pid: session.pid });
        }

        let process = self
            .inner
            .launcher
            .spawn(path)
            .map_err(|source| LibraryError::Spawn {
                path: key.clone(),
                source,
            });
        let process = match process {
            Ok(process) => process,
            Err(e) => {
                drop(current);
                drop(slot);
                self.inner.forget_idle(&key);
                return Err(e);
            }
        };
        let pid = process.pid();

        *current = Some(Session {
            pid,
            started_at: Local::now(),
            started: Instant::now(),
        });

        let inner = Arc::clone(&self.inner);
        let waiter_slot = Arc::clone(&slot);
        let waiter_path = key.clone();
        let spawned = thread::Builder::new()
            .name(format!("session-{}", pid))
            .spawn(move || inner.finish(waiter_path, waiter_slot, process));

        if let Err(source) = spawned {
            error!("Could not supervise pid {} for {:?}: {}", pid, path, source);
            *current = None;
            drop(current);
            drop(slot);
            self.inner.forget_idle(&key);
            return Err(LibraryError::Spawn { path: key, source });
        }

        info!("Started {:?} (pid {})", path, pid);
        Ok(LaunchOutcome::Started { pid })
    }

    pub fn is_running(&self, path: &Path) -> bool {
        self.session(path).is_some()
    }

    pub fn session(&self, path: &Path) -> Option<SessionInfo> {
        let key = path.to_path_buf();
        let slot = self.inner.sessions.existing(&key)?;
        let current = lock_slot(&slot);
        current.as_ref().map(|s| s.info(&key))
    }

    /// Snapshot of every running session, ordered by path.
    pub fn running_sessions(&self) -> Vec<SessionInfo> {
        let mut running: Vec<SessionInfo> = self
            .inner
            .sessions
            .all()
            .into_iter()
            .filter_map(|(path, slot)| lock_slot(&slot).as_ref().map(|s| s.info(&path)))
            .collect();
        running.sort_by(|a, b| a.path.cmp(&b.path));
        running
    }
}

impl Session {
    fn info(&self, path: &Path) -> SessionInfo {
        SessionInfo {
            path: path.to_path_buf(),
            pid: self.pid,
            started_at: self.started_at,
        }
    }
}

impl TrackerInner {
    /// Drops the slot of a path with no session once nobody else holds it.
    fn forget_idle(&self, path: &PathBuf) {
        if self.sessions.remove_if(path, Option::is_none) {
            debug!("Released session slot for {:?}", path);
        }
    }

    /// Runs on the waiter thread once the process is gone.
    fn finish(&self, path: PathBuf, slot: SessionSlot, process: Box<dyn RunningProcess>) {
        let exit_code = match process.wait() {
            Ok(code) => code,
            Err(e) => {
                warn!("Waiting on {:?} failed: {}", path, e);
                None
            }
        };

        let outcome = {
            let mut current = lock_slot(&slot);
            let Some(session) = current.as_ref() else {
                return;
            };
            let elapsed_seconds = session.started.elapsed().as_secs();
            let persisted = self
                .store
                .add_playtime(&path.to_string_lossy(), elapsed_seconds);
            *current = None;
            SessionOutcome {
                path,
                elapsed_seconds,
                exit_code,
                persisted,
            }
        };
        drop(slot);
        self.forget_idle(&outcome.path);

        match &outcome.persisted {
            Ok(()) => info!(
                "{:?} exited after {}s (code {:?})",
                outcome.path, outcome.elapsed_seconds, outcome.exit_code
            ),
            Err(e) => error!(
                "Lost {}s of play time for {:?}: {}",
                outcome.elapsed_seconds, outcome.path, e
            ),
        }

        if let Some(listener) = &self.listener {
            listener(&outcome);
        }
    }
}
