//! Atomic lock file persistence
//!
//! Content goes to a temporary file in the destination directory, is synced,
//! then renamed over the target. Readers see either the old or the new file.

use crate::model::LockFile;
use crate::LockfileResult;
use std::io::Write;
use std::path::Path;
use stow_core::error::StowError;
use stow_core::utils::blake3_hash;
use tracing::debug;

/// Writes lock files and other restore outputs atomically
#[derive(Debug, Default, Clone, Copy)]
pub struct LockFileWriter;

impl LockFileWriter {
    /// Serialize and write a lock file; returns the hash of the written bytes
    pub fn write(path: &Path, lock_file: &LockFile) -> LockfileResult<String> {
        let json = lock_file.to_json()?;
        Self::write_atomic(path, json.as_bytes())?;
        Ok(blake3_hash(json.as_bytes()))
    }

    /// Replace `path` with `content` via temp file and rename
    pub fn write_atomic(path: &Path, content: &[u8]) -> LockfileResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .map_err(|e| StowError::io(format!("Failed to create directory {}", dir.display()), e))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| StowError::io(format!("Failed to create temp file in {}", dir.display()), e))?;
        temp.write_all(content)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| StowError::io(format!("Failed to write temp file for {}", path.display()), e))?;
        temp.persist(path)
            .map_err(|e| StowError::io(format!("Failed to replace {}", path.display()), e.error))?;

        debug!(path = %path.display(), bytes = content.len(), "wrote file atomically");
        Ok(())
    }
}
