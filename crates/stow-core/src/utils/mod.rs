//! Utility functions and helpers.
//!
//! Common functionality used across multiple stow crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::{blake3_hash, blake3_hash_file};
pub use path::{normalize_path, project_directory};
