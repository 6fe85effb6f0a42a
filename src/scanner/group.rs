//! Collapses parallel build artifacts of one title into a single launcher.

use super::classify::ExecutableKind;
use std::collections::HashMap;
use std::path::PathBuf;

const BITNESS_SUFFIX: &str = "-32";

/// A file in one directory that classified as a launcher.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LauncherFile {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) kind: ExecutableKind,
}

/// Splits a file name into its grouping key and whether it is a 32-bit variant.
///
/// `Game-32.exe` and `game.sh` both map to `game`.
pub(crate) fn base_name(file_name: &str) -> (String, bool) {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
        .to_lowercase();
    match stem.strip_suffix(BITNESS_SUFFIX) {
        Some(base) => (base.to_string(), true),
        None => (stem, false),
    }
}

/// Lower is preferred.
fn priority(kind: ExecutableKind, is_32: bool) -> u8 {
    match kind {
        ExecutableKind::NativeBinary if !is_32 => 0,
        ExecutableKind::NativeBinary => 1,
        ExecutableKind::ScriptSh => 2,
        ExecutableKind::ScriptBat => 3,
        ExecutableKind::ScriptPy => 4,
    }
}

/// Picks one launcher per base name.
///
/// Groups keep the order in which their first member appeared; ties inside a
/// group go to the earlier file.
pub(crate) fn pick_canonical(files: Vec<LauncherFile>) -> Vec<LauncherFile> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, (u8, LauncherFile)> = HashMap::new();

    for file in files {
        let (base, is_32) = base_name(&file.name);
        let rank = priority(file.kind, is_32);
        let replace = match best.get(&base) {
            Some((current, _)) => rank < *current,
            None => {
                order.push(base.clone());
                true
            }
        };
        if replace {
            best.insert(base, (rank, file));
        }
    }

    order
        .into_iter()
        .filter_map(|base| best.remove(&base).map(|(_, file)| file))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, kind: ExecutableKind) -> LauncherFile {
        LauncherFile {
            name: name.to_string(),
            path: PathBuf::from("/games/title").join(name),
            kind,
        }
    }

    #[test]
    fn base_name_strips_extension_and_bitness() {
        assert_eq!(base_name("Game-32.exe"), ("game".to_string(), true));
        assert_eq!(base_name("Game.exe"), ("game".to_string(), false));
        assert_eq!(base_name("game.tar.sh"), ("game.tar".to_string(), false));
        assert_eq!(base_name("noext"), ("noext".to_string(), false));
    }

    #[test]
    fn prefers_64_bit_native_over_32_bit() {
        let picked = pick_canonical(vec![
            file("game-32.exe", ExecutableKind::NativeBinary),
            file("game.exe", ExecutableKind::NativeBinary),
        ]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "game.exe");
    }

    #[test]
    fn full_priority_ladder() {
        let mut files = vec![
            file("game.py", ExecutableKind::ScriptPy),
            file("game.bat", ExecutableKind::ScriptBat),
            file("game.sh", ExecutableKind::ScriptSh),
            file("game-32.exe", ExecutableKind::NativeBinary),
        ];
        assert_eq!(pick_canonical(files.clone())[0].name, "game-32.exe");
        files.pop();
        assert_eq!(pick_canonical(files.clone())[0].name, "game.sh");
        files.pop();
        assert_eq!(pick_canonical(files.clone())[0].name, "game.bat");
        files.pop();
        assert_eq!(pick_canonical(files)[0].name, "game.py");
    }

    #[test]
    fn distinct_titles_keep_first_seen_order() {
        let picked = pick_canonical(vec![
            file("Beta.exe", ExecutableKind::NativeBinary),
            file("alpha.py", ExecutableKind::ScriptPy),
            file("beta.py", ExecutableKind::ScriptPy),
        ]);
        let names: Vec<&str> = picked.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Beta.exe", "alpha.py"]);
    }

    #[test]
    fn tie_goes_to_earlier_file() {
        let picked = pick_canonical(vec![
            file("game.bat", ExecutableKind::ScriptBat),
            file("game.cmd", ExecutableKind::ScriptBat),
        ]);
        assert_eq!(picked[0].name, "game.bat");
    }
}
