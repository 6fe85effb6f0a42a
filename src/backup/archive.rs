//! Zip helpers: pack a save directory, check an archive, unpack it.

use crate::error::{LibraryError, Result};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Packs every file under `source_dir` into a new archive at `dest`.
///
/// Entry names are relative to `source_dir` with `/` separators. The archive is
/// written under a temporary name and moved into place once complete. Returns the
/// number of files packed.
pub(crate) fn write_archive(source_dir: &Path, dest: &Path) -> Result<usize> {
    let partial = dest.with_extension("partial");
    let result = pack(source_dir, &partial);
    match result {
        Ok(files) => {
            fs::rename(&partial, dest).map_err(|e| LibraryError::backup_io(dest, e))?;
            Ok(files)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn pack(source_dir: &Path, dest: &Path) -> Result<usize> {
    let file = fs::File::create(dest).map_err(|e| LibraryError::backup_io(dest, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0usize;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| LibraryError::backup_io(source_dir, e))?;
        let rel = match entry.path().strip_prefix(source_dir) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let name = rel.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)
                .map_err(|e| LibraryError::backup_io(dest, e))?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)
                .map_err(|e| LibraryError::backup_io(dest, e))?;
            let mut src =
                fs::File::open(entry.path()).map_err(|e| LibraryError::backup_io(entry.path(), e))?;
            io::copy(&mut src, &mut zip).map_err(|e| LibraryError::backup_io(entry.path(), e))?;
            files += 1;
        }
    }

    zip.finish().map_err(|e| LibraryError::backup_io(dest, e))?;
    Ok(files)
}

fn open(archive_path: &Path) -> Result<ZipArchive<fs::File>> {
    let file = fs::File::open(archive_path).map_err(|e| LibraryError::backup_io(archive_path, e))?;
    ZipArchive::new(file).map_err(|e| LibraryError::backup_io(archive_path, e))
}

/// Reads every entry of the archive without writing anything.
///
/// Fails on a truncated or corrupt archive, a checksum mismatch, or an entry whose
/// name would escape the extraction directory.
pub(crate) fn verify_archive(archive_path: &Path) -> Result<()> {
    let mut archive = open(archive_path)?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| LibraryError::backup_io(archive_path, e))?;
        if entry.enclosed_name().is_none() {
            return Err(LibraryError::backup_io(
                archive_path,
                format!("entry {:?} escapes the save directory", entry.name()),
            ));
        }
        io::copy(&mut entry, &mut io::sink())
            .map_err(|e| LibraryError::backup_io(archive_path, e))?;
    }
    Ok(())
}

/// Extracts the archive into `dest`, which must already exist. Returns the number of files.
pub(crate) fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize> {
    let mut archive = open(archive_path)?;
    let mut files = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| LibraryError::backup_io(archive_path, e))?;
        let Some(rel) = entry.enclosed_name() else {
            return Err(LibraryError::backup_io(
                archive_path,
                format!("entry {:?} escapes the save directory", entry.name()),
            ));
        };
        let target = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| LibraryError::backup_io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| LibraryError::backup_io(parent, e))?;
        }
        let mut out = fs::File::create(&target).map_err(|e| LibraryError::backup_io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| LibraryError::backup_io(&target, e))?;
        files += 1;
    }
    Ok(files)
}
