//! Lock files for stow
//!
//! One lock file per restored project records the resolved package graph per
//! target framework, the information the build host needs to locate package
//! content, and the fingerprint of the inputs that produced it. A small cache
//! file next to it lets the next restore skip the walk when nothing changed.

pub mod fingerprint;
pub mod model;
pub mod noop;
pub mod writer;

// Re-export main types
pub use fingerprint::{fingerprint, FingerprintInputs, FINGERPRINT_FORMAT_VERSION};
pub use model::{
    library_key, LibraryEntry, LibraryKind, LockFile, LockedDiagnostic, LockedLibrary, LockedProject,
    LOCK_FILE_VERSION,
};
pub use noop::{NoOpCache, NoOpCheck, NoOpDecision, NoOpReason};
pub use writer::LockFileWriter;

use stow_core::error::StowError;

/// Result type for lock file operations
pub type LockfileResult<T> = Result<T, StowError>;

/// Suffix of the lock file (`<project>.stow.lock.json`) inside a project's
/// output folder
pub const LOCK_FILE_SUFFIX: &str = ".stow.lock.json";

/// Suffix of the no-op cache file (`<project>.stow.cache`)
pub const CACHE_FILE_SUFFIX: &str = ".stow.cache";
