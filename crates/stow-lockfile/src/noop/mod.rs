//! No-op restore detection
//!
//! After every restore the runner records the input fingerprint, whether the
//! restore succeeded, and the hash of the lock file it wrote. The next
//! restore of the same project may skip the walk when all of that still
//! holds.

use crate::model::LockFile;
use crate::writer::LockFileWriter;
use crate::LockfileResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use stow_core::error::StowError;
use stow_core::utils::blake3_hash_file;
use tracing::debug;

/// Current no-op cache format version
pub const NO_OP_CACHE_VERSION: u32 = 1;

/// Record of the previous restore of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoOpCache {
    pub version: u32,
    pub fingerprint: String,
    pub success: bool,
    pub lock_file_path: PathBuf,
    /// Blake3 of the lock file bytes as written
    pub lock_file_hash: String,
}

/// Why a restore cannot be skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoOpReason {
    Forced,
    CacheMissing,
    FingerprintChanged,
    PreviousFailure,
    LockFileMissing,
    LockFileInconsistent,
}

/// Outcome of the no-op check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpDecision {
    /// Inputs are unchanged and the lock file at this path is still valid
    Skip { lock_file_path: PathBuf },
    Restore(NoOpReason),
}

impl NoOpCache {
    pub fn new(
        fingerprint: impl Into<String>,
        success: bool,
        lock_file_path: impl Into<PathBuf>,
        lock_file_hash: impl Into<String>,
    ) -> Self {
        Self {
            version: NO_OP_CACHE_VERSION,
            fingerprint: fingerprint.into(),
            success,
            lock_file_path: lock_file_path.into(),
            lock_file_hash: lock_file_hash.into(),
        }
    }

    /// Read a cache file; unreadable or malformed files count as absent
    pub fn load(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        match serde_json::from_slice::<NoOpCache>(&bytes) {
            Ok(cache) if cache.version == NO_OP_CACHE_VERSION => Some(cache),
            Ok(cache) => {
                debug!(path = %path.display(), version = cache.version, "ignoring no-op cache of another version");
                None
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring malformed no-op cache");
                None
            },
        }
    }

    pub fn save(&self, path: &Path) -> LockfileResult<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| StowError::json("no-op cache", e))?;
        LockFileWriter::write_atomic(path, &json)
    }
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            NoOpReason::Forced => "restore was forced",
            NoOpReason::CacheMissing => "no previous restore recorded",
            NoOpReason::FingerprintChanged => "restore inputs changed",
            NoOpReason::PreviousFailure => "previous restore failed",
            NoOpReason::LockFileMissing => "lock file is missing",
            NoOpReason::LockFileInconsistent => "lock file does not match the recorded restore",
        };
        f.write_str(reason)
    }
}

/// Decides whether a restore can be skipped
pub struct NoOpCheck;

impl NoOpCheck {
    /// Compare `fingerprint` with the cache at `cache_path`
    pub fn evaluate(fingerprint: &str, cache_path: &Path, allow_no_op: bool) -> NoOpDecision {
        let decision = Self::decide(fingerprint, cache_path, allow_no_op);
        debug!(cache = %cache_path.display(), ?decision, "no-op check");
        decision
    }

    fn decide(fingerprint: &str, cache_path: &Path, allow_no_op: bool) -> NoOpDecision {
        if !allow_no_op {
            return NoOpDecision::Restore(NoOpReason::Forced);
        }

        let Some(cache) = NoOpCache::load(cache_path) else {
            return NoOpDecision::Restore(NoOpReason::CacheMissing);
        };
        if cache.fingerprint != fingerprint {
            return NoOpDecision::Restore(NoOpReason::FingerprintChanged);
        }
        if !cache.success {
            return NoOpDecision::Restore(NoOpReason::PreviousFailure);
        }
        if !cache.lock_file_path.is_file() {
            return NoOpDecision::Restore(NoOpReason::LockFileMissing);
        }

        let hash_matches = blake3_hash_file(&cache.lock_file_path)
            .map(|hash| hash == cache.lock_file_hash)
            .unwrap_or(false);
        let lock_matches = LockFile::load(&cache.lock_file_path)
            .map(|lock| lock.fingerprint == fingerprint && lock.is_consistent())
            .unwrap_or(false);
        if !hash_matches || !lock_matches {
            return NoOpDecision::Restore(NoOpReason::LockFileInconsistent);
        }

        NoOpDecision::Skip {
            lock_file_path: cache.lock_file_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LockedProject;
    use stow_core::ProjectStyle;

    struct Fixture {
        _dir: tempfile::TempDir,
        lock_path: PathBuf,
        cache_path: PathBuf,
    }

    fn restored(fingerprint: &str, success: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("stow.lock.json");
        let cache_path = dir.path().join("AppA.stow.cache");

        let lock = LockFile::new(
            LockedProject {
                name: "AppA".to_string(),
                path: PathBuf::from("/src/AppA/AppA.csproj"),
                style: ProjectStyle::PackageReference,
            },
            fingerprint,
        );
        let hash = LockFileWriter::write(&lock_path, &lock).unwrap();
        NoOpCache::new(fingerprint, success, &lock_path, hash)
            .save(&cache_path)
            .unwrap();

        Fixture {
            _dir: dir,
            lock_path,
            cache_path,
        }
    }

    #[test]
    fn test_skip_when_unchanged() {
        let fx = restored("fp1", true);
        assert_eq!(
            NoOpCheck::evaluate("fp1", &fx.cache_path, true),
            NoOpDecision::Skip {
                lock_file_path: fx.lock_path.clone()
            }
        );
    }

    #[test]
    fn test_restore_reasons() {
        let fx = restored("fp1", true);
        assert_eq!(
            NoOpCheck::evaluate("fp1", &fx.cache_path, false),
            NoOpDecision::Restore(NoOpReason::Forced)
        );
        assert_eq!(
            NoOpCheck::evaluate("fp2", &fx.cache_path, true),
            NoOpDecision::Restore(NoOpReason::FingerprintChanged)
        );
        assert_eq!(
            NoOpCheck::evaluate("fp1", &fx.cache_path.with_extension("missing"), true),
            NoOpDecision::Restore(NoOpReason::CacheMissing)
        );

        let failed = restored("fp1", false);
        assert_eq!(
            NoOpCheck::evaluate("fp1", &failed.cache_path, true),
            NoOpDecision::Restore(NoOpReason::PreviousFailure)
        );
    }

    #[test]
    fn test_lock_file_tampering() {
        let fx = restored("fp1", true);
        std::fs::write(&fx.lock_path, "{}").unwrap();
        assert_eq!(
            NoOpCheck::evaluate("fp1", &fx.cache_path, true),
            NoOpDecision::Restore(NoOpReason::LockFileInconsistent)
        );

        std::fs::remove_file(&fx.lock_path).unwrap();
        assert_eq!(
            NoOpCheck::evaluate("fp1", &fx.cache_path, true),
            NoOpDecision::Restore(NoOpReason::LockFileMissing)
        );
    }

    #[test]
    fn test_malformed_cache_counts_as_missing() {
        let fx = restored("fp1", true);
        std::fs::write(&fx.cache_path, "not json").unwrap();
        assert_eq!(
            NoOpCheck::evaluate("fp1", &fx.cache_path, true),
            NoOpDecision::Restore(NoOpReason::CacheMissing)
        );
    }
}
