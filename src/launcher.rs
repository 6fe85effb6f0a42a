//! Process boundary: turns a launcher path into a running OS process.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

#[cfg(target_os = "windows")]
const PYTHON: &str = "python";
#[cfg(not(target_os = "windows"))]
const PYTHON: &str = "python3";

/// Represents how a launcher path is handed to the OS.
#[derive(Debug, PartialEq)]
pub struct LaunchPlan {
    pub program: OsString,
    pub args: Vec<OsString>,
    /// The game's folder, so relative asset paths resolve.
    pub working_dir: Option<PathBuf>,
}

/// Builds the launch plan for a launcher path.
///
/// Native binaries run directly; scripts go through their interpreter with the path
/// as a single argument. Nothing is templated or split.
pub fn plan_launch(executable: &Path) -> LaunchPlan {
    let ext = executable
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let path = executable.as_os_str().to_os_string();

    let (program, args) = match ext.as_deref() {
        Some("sh") | Some("command") => (OsString::from("sh"), vec![path]),
        Some("bat") | Some("cmd") => (OsString::from("cmd"), vec![OsString::from("/C"), path]),
        Some("py") => (OsString::from(PYTHON), vec![path]),
        _ => (path, Vec::new()),
    };

    LaunchPlan {
        program,
        args,
        working_dir: executable
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf),
    }
}

/// A process that has been started and can be waited on.
pub trait RunningProcess: Send {
    fn pid(&self) -> u32;

    /// Blocks until the process exits and returns its exit code, if it had one.
    fn wait(self: Box<Self>) -> io::Result<Option<i32>>;
}

/// Starts game processes.
pub trait ProcessLauncher: Send + Sync {
    /// Spawns the launcher. A missing or non-executable target is an error.
    fn spawn(&self, executable: &Path) -> io::Result<Box<dyn RunningProcess>>;
}

/// Launches through `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

struct ChildProcess(Child);

impl RunningProcess for ChildProcess {
    fn pid(&self) -> u32 {
        self.0.id()
    }

    fn wait(mut self: Box<Self>) -> io::Result<Option<i32>> {
        self.0.wait().map(|status| status.code())
    }
}

impl ProcessLauncher for SystemLauncher {
    fn spawn(&self, executable: &Path) -> io::Result<Box<dyn RunningProcess>> {
        // Interpreters would start fine and then fail on a missing script, so check first.
        if !executable.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("launcher not found: {}", executable.display()),
            ));
        }

        let plan = plan_launch(executable);
        log::info!(
            "Launching {:?} via {:?} with {} args",
            executable,
            plan.program,
            plan.args.len()
        );

        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args);
        if let Some(dir) = &plan.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn()?;
        Ok(Box::new(ChildProcess(child)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_launch_runs_native_binary_directly() {
        let exe = PathBuf::from("/games/Title/Title.exe");
        assert_eq!(
            plan_launch(&exe),
            LaunchPlan {
                program: OsString::from("/games/Title/Title.exe"),
                args: vec![],
                working_dir: Some(PathBuf::from("/games/Title")),
            }
        );
    }

    #[test]
    fn plan_launch_passes_shell_script_as_single_argument() {
        let script = PathBuf::from("/games/My Title/run game.sh");
        let plan = plan_launch(&script);
        assert_eq!(plan.program, OsString::from("sh"));
        assert_eq!(plan.args, vec![OsString::from("/games/My Title/run game.sh")]);
    }

    #[test]
    fn plan_launch_uses_cmd_for_batch_files() {
        let plan = plan_launch(&PathBuf::from("C:\\Games\\Title\\start.CMD"));
        assert_eq!(plan.program, OsString::from("cmd"));
        assert_eq!(plan.args[0], OsString::from("/C"));
        assert_eq!(plan.args.len(), 2);
    }

    #[test]
    fn plan_launch_uses_python_for_scripts() {
        let plan = plan_launch(&PathBuf::from("/games/Title/game.py"));
        assert_eq!(plan.program, OsString::from(PYTHON));
        assert_eq!(plan.args, vec![OsString::from("/games/Title/game.py")]);
    }

    #[test]
    fn plan_launch_without_parent_has_no_working_dir() {
        assert_eq!(plan_launch(&PathBuf::from("Title.exe")).working_dir, None);
    }

    #[test]
    fn spawn_missing_target_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = SystemLauncher.spawn(&dir.path().join("missing.sh"));
        match result {
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            Ok(_) => panic!("spawning a missing launcher should fail"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn spawn_shell_script_and_wait() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("game.sh");
        std::fs::write(&script, "exit 3\n").unwrap();

        let process = SystemLauncher.spawn(&script).unwrap();
        assert!(process.pid() > 0);
        assert_eq!(process.wait().unwrap(), Some(3));
    }
}
