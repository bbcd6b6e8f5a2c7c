//! Error types and result aliases for stow operations.
//!
//! `StowError` covers every failure that aborts an operation. Resolution
//! conflicts are not errors: the resolver reports them as diagnostics on the
//! affected project so the rest of a batch can still complete.

use crate::types::VersionError;
use thiserror::Error;

/// Unified error type for all stow operations
#[derive(Error, Debug)]
pub enum StowError {
    // Validation errors
    #[error("Project '{project}' references '{reference}', which is not part of the dependency graph")]
    MissingProjectReference { project: String, reference: String },

    #[error("Project '{name}' is declared more than once in the dependency graph")]
    DuplicateProject { name: String },

    #[error("Circular project reference detected: {cycle}")]
    CircularProjectReference { cycle: String },

    #[error("Restore root '{name}' is not declared in the dependency graph")]
    UnknownRestoreRoot { name: String },

    #[error("Invalid dependency graph: {message}")]
    InvalidGraph { message: String },

    #[error("Failed to parse {what}: {message}")]
    JsonParse { what: String, message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    // Infrastructure errors
    #[error("Package source '{source_name}' is unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    // Defects
    #[error("Internal invariant violated: {message}")]
    InvariantViolation { message: String },
}

/// Result type alias for stow operations
pub type StowResult<T> = Result<T, StowError>;

/// Broad classification of a `StowError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or inconsistent input; fails the batch before resolution starts
    Validation,
    /// Environmental failure (sources, disk, timeouts)
    Infrastructure,
    /// A broken internal contract
    Invariant,
}

impl StowError {
    /// Create a source error from any error type
    pub fn source_unavailable<E>(source_name: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a JSON parse error
    pub fn json(what: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::JsonParse {
            what: what.into(),
            message: error.to_string(),
        }
    }

    /// Create an invariant violation
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Which part of the error taxonomy this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            StowError::MissingProjectReference { .. }
            | StowError::DuplicateProject { .. }
            | StowError::CircularProjectReference { .. }
            | StowError::UnknownRestoreRoot { .. }
            | StowError::InvalidGraph { .. }
            | StowError::JsonParse { .. }
            | StowError::ConfigValidation { .. }
            | StowError::InvalidVersion(_) => ErrorCategory::Validation,
            StowError::SourceUnavailable { .. } | StowError::Timeout { .. } | StowError::Io { .. } => {
                ErrorCategory::Infrastructure
            },
            StowError::InvariantViolation { .. } => ErrorCategory::Invariant,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Only environmental failures may succeed on a later attempt. Nothing in
    /// stow retries automatically; callers decide.
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::Infrastructure
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            StowError::MissingProjectReference { .. } => {
                Some("Add the referenced project to the dependency graph or remove the reference")
            },
            StowError::DuplicateProject { .. } => {
                Some("Give every project a distinct unique name")
            },
            StowError::CircularProjectReference { .. } => {
                Some("Remove one of the project references so the projects no longer form a loop")
            },
            StowError::UnknownRestoreRoot { .. } => {
                Some("Only projects listed under 'projects' can be restored")
            },
            StowError::SourceUnavailable { .. } => {
                Some("Check the source location and try again, or restore with a different source")
            },
            StowError::Timeout { .. } => Some("Increase the timeout with --timeout-secs"),
            StowError::InvariantViolation { .. } => Some("This is a bug in stow; please report it"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let missing = StowError::MissingProjectReference {
            project: "AppA".to_string(),
            reference: "Lib".to_string(),
        };
        assert_eq!(missing.category(), ErrorCategory::Validation);
        assert!(!missing.is_recoverable());

        let timeout = StowError::Timeout {
            operation: "restore".to_string(),
            seconds: 5,
        };
        assert_eq!(timeout.category(), ErrorCategory::Infrastructure);
        assert!(timeout.is_recoverable());

        let defect = StowError::invariant("closure is not closed");
        assert_eq!(defect.category(), ErrorCategory::Invariant);
        assert!(!defect.is_recoverable());
    }

    #[test]
    fn test_messages() {
        let err = StowError::CircularProjectReference {
            cycle: "x -> y -> x".to_string(),
        };
        assert_eq!(err.to_string(), "Circular project reference detected: x -> y -> x");

        let err = StowError::Timeout {
            operation: "restore".to_string(),
            seconds: 30,
        };
        assert_eq!(err.to_string(), "restore timed out after 30s");
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = StowError::source_unavailable("local", "feed folder missing", io);
        assert!(err.source().is_some());
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_version_error_converts() {
        let err: StowError = "not-a-version".parse::<crate::types::Version>().unwrap_err().into();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }
}
