//! Command-line front end.

use crate::backup::RestoreStrategy;
use crate::config::{self, LibraryConfig};
use crate::error::{LibraryError, Result};
use crate::launcher::SystemLauncher;
use crate::library::Library;
use crate::scanner::ExecutableKind;
use crate::session::{LaunchOutcome, SessionListener, SessionOutcome};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::channel;
use std::sync::Arc;

/// Library manager for loose game and visual novel builds
#[derive(Parser, Debug)]
#[command(name = "game-shelf")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to config.json beside the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan one directory, or every configured root, and import new games
    Scan {
        root: Option<PathBuf>,
        /// Keep descending below folders that already contain a game
        #[arg(long)]
        deep: bool,
    },

    /// List the library
    List {
        /// Include hidden games
        #[arg(long)]
        all: bool,
    },

    /// Launch a game and wait for it to exit, recording the play time
    Launch {
        path: PathBuf,
        /// Return right after starting; the session's play time is not recorded
        #[arg(long)]
        detach: bool,
    },

    /// Back up a game's saves
    Backup { path: PathBuf },

    /// List a game's backups, newest first
    Backups { path: PathBuf },

    /// Delete one backup archive
    DeleteBackup { archive: PathBuf },

    /// Restore a backup over a game's current saves
    Restore {
        path: PathBuf,
        archive: PathBuf,
        /// archive, rename or delete
        #[arg(long, default_value = "archive")]
        strategy: RestoreStrategy,
        /// Confirm the delete strategy, which keeps no copy of the current saves
        #[arg(long)]
        yes: bool,
    },

    /// Add a directory to the configured library roots
    AddRoot { dir: PathBuf },

    /// Remove a directory from the configured library roots
    RemoveRoot { dir: PathBuf },

    /// Manage folders of games
    Folder {
        #[command(subcommand)]
        action: FolderCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FolderCommand {
    /// List folders with their ids
    List,
    /// Create a folder
    Create { name: String },
    /// Put a game into a folder
    Add { path: PathBuf, id: u64 },
    /// Take a game out of a folder
    Remove { path: PathBuf, id: u64 },
    /// List the games in a folder
    Show { id: u64 },
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp_secs().init();
}

fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}h {:02}m", h, m)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Short label for a persisted `game_type`.
fn kind_label(game_type: &str) -> &str {
    match ExecutableKind::from_game_type(game_type) {
        Some(ExecutableKind::NativeBinary) => "native",
        Some(ExecutableKind::ScriptPy) => "python",
        Some(ExecutableKind::ScriptSh) => "shell",
        Some(ExecutableKind::ScriptBat) => "batch",
        None => game_type,
    }
}

fn launch(config: LibraryConfig, path: &Path, detach: bool) -> Result<()> {
    if detach {
        let library = Library::open(config)?;
        match library.launch(path)? {
            LaunchOutcome::Started { pid } => println!("started pid {}", pid),
            LaunchOutcome::AlreadyRunning { pid } => println!("already running as pid {}", pid),
        }
        log::info!("Not waiting for exit; play time of this session is not recorded");
        return Ok(());
    }

    let (tx, rx) = channel();
    let listener: SessionListener = Arc::new(move |outcome: &SessionOutcome| {
        let failure = outcome.persisted.as_ref().err().map(|e| e.to_string());
        let _ = tx.send((outcome.elapsed_seconds, failure));
    });
    let library = Library::open_with(config, Arc::new(SystemLauncher), Some(listener))?;

    let LaunchOutcome::Started { pid } = library.launch(path)? else {
        return Ok(());
    };
    println!("started pid {}, waiting for exit", pid);

    let (elapsed, failure) = rx
        .recv()
        .map_err(|_| LibraryError::Persistence("session ended without a report".to_string()))?;
    match failure {
        None => {
            let total = library.game(path)?.play_time_seconds;
            println!(
                "played {} (total {})",
                format_duration(elapsed),
                format_duration(total)
            );
            Ok(())
        }
        Some(message) => Err(LibraryError::Persistence(message)),
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(config::get_config_path);
    let mut config = config::load_config_from_path(&config_path);

    match cli.command {
        Commands::Scan { root, deep } => {
            let library = Library::open(config)?;
            let summary = match root {
                Some(root) => {
                    library.scan_root(&root, deep || library.config().deep_search)?
                }
                None => {
                    if library.config().library_roots.is_empty() {
                        return Err(LibraryError::InvalidInput(
                            "no library roots configured; pass a directory or use add-root"
                                .to_string(),
                        ));
                    }
                    library.scan_roots()?
                }
            };
            println!("found {} games, {} new", summary.found, summary.added);
        }
        Commands::List { all } => {
            let library = Library::open(config)?;
            for game in library.games(all)? {
                println!(
                    "{:<32} {:<6} {:>9}  {}{}",
                    game.name,
                    kind_label(&game.game_type),
                    format_duration(game.play_time_seconds),
                    game.path,
                    if game.is_hidden { "  (hidden)" } else { "" }
                );
            }
        }
        Commands::Launch { path, detach } => launch(config, &path, detach)?,
        Commands::Backup { path } => {
            let record = Library::open(config)?.backups().create_backup(&path)?;
            println!("{}", record.path.display());
        }
        Commands::Backups { path } => {
            let library = Library::open(config)?;
            for record in library.backups().list_backups(&path)? {
                println!(
                    "{}  {:>10}  {}",
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    record.size,
                    record.path.display()
                );
            }
        }
        Commands::DeleteBackup { archive } => {
            Library::open(config)?.backups().delete_backup(&archive)?;
            println!("deleted {}", archive.display());
        }
        Commands::Restore {
            path,
            archive,
            strategy,
            yes,
        } => {
            if strategy.is_destructive() && !yes {
                return Err(LibraryError::InvalidInput(
                    "the delete strategy discards the current saves; pass --yes to confirm"
                        .to_string(),
                ));
            }
            let library = Library::open(config)?;
            let report = library.backups().restore_backup(&path, &archive, strategy)?;
            if let Some(safety) = &report.safety_backup {
                println!("previous saves archived to {}", safety.path.display());
            }
            if let Some(renamed) = &report.renamed_to {
                println!("previous saves moved to {}", renamed.display());
            }
            println!(
                "restored {} files into {}",
                report.restored_files,
                report.save_dir.display()
            );
        }
        Commands::AddRoot { dir } => {
            let dir = dir.to_string_lossy().to_string();
            if config.add_library_root(&dir)? {
                config::save_config_to_path(&config_path, &config)?;
                println!("added {}", dir);
            } else {
                println!("{} is already a library root", dir);
            }
        }
        Commands::RemoveRoot { dir } => {
            let dir = dir.to_string_lossy().to_string();
            if !config.remove_library_root(&dir) {
                return Err(LibraryError::NotFound(PathBuf::from(dir)));
            }
            config::save_config_to_path(&config_path, &config)?;
            println!("removed {}", dir);
        }
        Commands::Folder { action } => folder(Library::open(config)?, action)?,
    }
    Ok(())
}

fn folder(library: Library, action: FolderCommand) -> Result<()> {
    match action {
        FolderCommand::List => {
            for folder in library.folders()? {
                let count = library.games_in_folder(folder.id)?.len();
                println!("{:>4}  {}  ({} games)", folder.id, folder.name, count);
            }
        }
        FolderCommand::Create { name } => {
            let folder = library.create_folder(&name)?;
            println!("created folder {} ({})", folder.name, folder.id);
        }
        FolderCommand::Add { path, id } => {
            library.add_to_folder(&path, id)?;
            println!("added {} to folder {}", path.display(), id);
        }
        FolderCommand::Remove { path, id } => {
            if library.remove_from_folder(&path, id)? {
                println!("removed {} from folder {}", path.display(), id);
            } else {
                println!("{} was not in folder {}", path.display(), id);
            }
        }
        FolderCommand::Show { id } => {
            for game in library.games_in_folder(id)? {
                println!("{:<32} {}", game.name, game.path);
            }
        }
    }
    Ok(())
}

/// Parses the command line, runs the command and maps errors to the exit code.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error[{}]: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn restore_parses_strategy() {
        let cli = Cli::try_parse_from([
            "game-shelf",
            "restore",
            "/games/A/A.exe",
            "/backups/A/x.zip",
            "--strategy",
            "rename",
        ])
        .unwrap();
        match cli.command {
            Commands::Restore { strategy, yes, .. } => {
                assert_eq!(strategy, RestoreStrategy::RenameAndReplace);
                assert!(!yes);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn restore_rejects_unknown_strategy() {
        let parsed = Cli::try_parse_from([
            "game-shelf",
            "restore",
            "/games/A/A.exe",
            "/backups/A/x.zip",
            "--strategy",
            "shred",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn delete_strategy_needs_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let cli = Cli::try_parse_from([
            "game-shelf",
            "--config",
            config_path.to_str().unwrap(),
            "restore",
            "/games/A/A.exe",
            "/backups/A/x.zip",
            "--strategy",
            "delete",
        ])
        .unwrap();
        assert_eq!(execute(cli).unwrap_err().kind(), "invalid_input");
    }

    #[test]
    fn add_root_persists_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let root = dir.path().to_str().unwrap().to_string();
        let cli = Cli::try_parse_from([
            "game-shelf",
            "--config",
            config_path.to_str().unwrap(),
            "add-root",
            root.as_str(),
        ])
        .unwrap();
        execute(cli).unwrap();

        let saved = config::load_config_from_path(&config_path);
        assert_eq!(saved.library_roots, vec![root]);
    }

    #[test]
    fn launch_waits_unless_detached() {
        let cli = Cli::try_parse_from(["game-shelf", "launch", "/games/A/A.exe"]).unwrap();
        assert!(matches!(cli.command, Commands::Launch { detach: false, .. }));

        let cli =
            Cli::try_parse_from(["game-shelf", "launch", "/games/A/A.exe", "--detach"]).unwrap();
        assert!(matches!(cli.command, Commands::Launch { detach: true, .. }));
    }

    #[test]
    fn kind_labels() {
        assert_eq!(kind_label("py"), "python");
        assert_eq!(kind_label("EXE"), "native");
        assert_eq!(kind_label("cmd"), "batch");
        assert_eq!(kind_label("jar"), "jar");
    }

    #[test]
    fn folder_create_and_add() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let config = LibraryConfig {
            data_dir: Some(dir.path().join("data").to_string_lossy().to_string()),
            ..LibraryConfig::default()
        };
        config::save_config_to_path(&config_path, &config).unwrap();
        let run_args = |args: &[&str]| {
            let mut argv = vec!["game-shelf", "--config", config_path.to_str().unwrap()];
            argv.extend_from_slice(args);
            execute(Cli::try_parse_from(argv).unwrap())
        };

        run_args(&["folder", "create", "Favorites"]).unwrap();
        let err = run_args(&["folder", "add", "/games/A/A.exe", "1"]).unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert_eq!(run_args(&["folder", "show", "7"]).unwrap_err().kind(), "invalid_input");

        let library = Library::open(config).unwrap();
        assert_eq!(library.folders().unwrap()[0].name, "Favorites");
    }

    #[test]
    fn format_duration_units() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 05s");
        assert_eq!(format_duration(3 * 3600 + 61), "3h 01m");
    }
}
