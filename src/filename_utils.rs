use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::path::Path;

/// Extension of backup archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const RENAMED_SAVES_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Represents parsed information from a backup archive filename.
#[derive(Debug, PartialEq, Eq)]
pub struct ArchiveNameInfo {
    /// The local time embedded in the name.
    pub timestamp: DateTime<Local>,
    /// Collision counter for backups taken within the same second (0 when absent).
    pub sequence: u32,
}

/// Formats the archive file name for a backup taken at `at`.
///
/// A non-zero `sequence` appends `-N` so that two backups in the same second do not collide.
pub fn format_archive_name(at: DateTime<Local>, sequence: u32) -> String {
    let stamp = at.format(ARCHIVE_TIMESTAMP_FORMAT);
    if sequence == 0 {
        format!("{}.{}", stamp, ARCHIVE_EXTENSION)
    } else {
        format!("{}-{}.{}", stamp, sequence, ARCHIVE_EXTENSION)
    }
}

/// Parses an archive file name produced by [`format_archive_name`].
///
/// Expects `YYYY-MM-DD_HH-MM-SS.zip` or `YYYY-MM-DD_HH-MM-SS-N.zip`.
pub fn parse_archive_name(filename: &str) -> Option<ArchiveNameInfo> {
    let stem = filename.strip_suffix(&format!(".{}", ARCHIVE_EXTENSION))?;

    // The timestamp part has a fixed width of 19 characters.
    if stem.len() < 19 || !stem.is_char_boundary(19) {
        return None;
    }
    let (stamp, rest) = stem.split_at(19);

    let sequence = if rest.is_empty() {
        0
    } else {
        rest.strip_prefix('-')?.parse::<u32>().ok()?
    };

    let naive = NaiveDateTime::parse_from_str(stamp, ARCHIVE_TIMESTAMP_FORMAT).ok()?;
    let timestamp = match Local.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => return None,
    };

    Some(ArchiveNameInfo {
        timestamp,
        sequence,
    })
}

/// Returns true when the path has the backup archive extension (case-insensitive).
pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
        .unwrap_or(false)
}

/// Name of the sibling directory that holds saves moved aside before a restore.
pub fn format_renamed_saves_name(dir_name: &str, at: DateTime<Local>) -> String {
    format!("{}_old_{}", dir_name, at.format(RENAMED_SAVES_FORMAT))
}
