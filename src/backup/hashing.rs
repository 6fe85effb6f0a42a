use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Calculates the SHA-256 hash of a file as lowercase hex.
pub(crate) fn calculate_hash(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    let hash = hasher.finalize();
    Ok(format!("{:x}", hash))
}
