//! Blake3 hashing utilities for input fingerprints and lock-file checks.

use crate::error::{StowError, StowResult};
use std::path::Path;

/// Compute Blake3 hash of data as lowercase hex
pub fn blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Compute Blake3 hash of a file
pub fn blake3_hash_file(path: &Path) -> StowResult<String> {
    let data = std::fs::read(path)
        .map_err(|e| StowError::io(format!("Failed to read file: {}", path.display()), e))?;
    Ok(blake3_hash(&data))
}
