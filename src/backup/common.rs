/// Per-partition file mapping archive names to their SHA-256.
pub(crate) const INDEX_FILE_NAME: &str = "index.json";

/// Highest `-N` suffix tried before giving up on a free archive name.
pub(crate) const MAX_NAME_SEQUENCE: u32 = 1000;
