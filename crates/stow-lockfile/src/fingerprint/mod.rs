//! Restore input fingerprints
//!
//! The fingerprint covers everything that can change a lock file: the
//! project's closure graph, its effective sources, the packages path,
//! fallback folders and the lowercase-directory flag.

use crate::LockfileResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use stow_core::error::StowError;
use stow_core::utils::blake3_hash;
use stow_core::PackageSourceRef;

/// Bumped whenever resolution semantics change so old no-op caches are ignored
pub const FINGERPRINT_FORMAT_VERSION: u32 = 1;

/// Inputs hashed into a fingerprint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintInputs<'a> {
    pub format_version: u32,
    /// Canonical JSON of the project closure graph
    pub dg_spec: &'a str,
    pub sources: &'a [PackageSourceRef],
    pub packages_path: &'a Path,
    pub fallback_folders: &'a [PathBuf],
    pub lowercase_packages_directory: bool,
}

/// Blake3 hex digest of the canonical JSON encoding of `inputs`
pub fn fingerprint(inputs: &FingerprintInputs<'_>) -> LockfileResult<String> {
    let canonical = serde_json::to_vec(inputs).map_err(|e| StowError::json("fingerprint inputs", e))?;
    Ok(blake3_hash(&canonical))
}
