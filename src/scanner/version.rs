use std::path::Path;

const DELIMITERS: &[char] = &['-', '_', ' '];
const NOISE_SUFFIXES: &[&str] = &["pc", "rus", "fix", "1080p"];

/// Infers a version string for a launcher, preferring its folder name over its file name.
pub fn infer_version(launcher: &Path) -> Option<String> {
    let from_dir = launcher
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .and_then(version_in_name);
    if from_dir.is_some() {
        return from_dir;
    }

    let stem = launcher.file_stem().and_then(|s| s.to_str())?;
    version_in_name(stem.strip_suffix("-32").unwrap_or(stem))
}

/// Extracts `1.0`-style versions from names such as `MyGame-1.0-pc`.
///
/// Collection starts at the first delimited part with a digit that is longer than one
/// character, then keeps every following part. Trailing release noise is dropped.
pub fn version_in_name(name: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in name.split(DELIMITERS).filter(|p| !p.is_empty()) {
        let has_digit = part.chars().any(|c| c.is_ascii_digit());
        if !parts.is_empty() || (has_digit && part.len() > 1) {
            parts.push(part);
        }
    }

    while parts.len() > 1 {
        let last = parts[parts.len() - 1].to_ascii_lowercase();
        if NOISE_SUFFIXES.contains(&last.as_str()) {
            parts.pop();
        } else {
            break;
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn version_from_folder_name() {
        assert_eq!(version_in_name("MyGame-1.0-pc"), Some("1.0".to_string()));
        assert_eq!(version_in_name("Eternum-0.5-pc-rus"), Some("0.5".to_string()));
        assert_eq!(
            version_in_name("Summer_Memories_v1.2_Final"),
            Some("v1.2-Final".to_string())
        );
    }

    #[test]
    fn single_digit_parts_do_not_start_a_version() {
        assert_eq!(version_in_name("Game 2"), None);
        assert_eq!(version_in_name("GameA"), None);
    }

    #[test]
    fn noise_only_version_is_kept() {
        assert_eq!(version_in_name("Video-1080p"), Some("1080p".to_string()));
    }

    #[test]
    fn folder_wins_over_file() {
        let path = PathBuf::from("/games/Title-0.9-pc/Title-1.0.exe");
        assert_eq!(infer_version(&path), Some("0.9".to_string()));
    }

    #[test]
    fn falls_back_to_file_stem_without_bitness() {
        let path = PathBuf::from("/games/Title/Title-2.1.5-32.exe");
        assert_eq!(infer_version(&path), Some("2.1.5".to_string()));

        let plain = PathBuf::from("/games/Title/Title-32.exe");
        assert_eq!(infer_version(&plain), None);
    }
}
