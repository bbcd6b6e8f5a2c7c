//! Structured resolution diagnostics
//!
//! Conflicts and other per-project problems are reported as diagnostics on
//! the affected project rather than as errors, so one project's conflict
//! never hides the outcome of the rest of a batch.

use serde::{Deserialize, Serialize};
use std::fmt;
use stow_core::{TargetFramework, Version, VersionRange};
use stow_lockfile::LockedDiagnostic;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// No version satisfies every requested range
    Conflict,
    /// No source publishes the package
    PackageNotFound,
    /// A dependency path leads back to one of its ancestors
    Cycle,
    /// A referenced project has no compatible framework
    FrameworkMismatch,
    /// A referenced project is not part of the request's graph
    MissingProject,
    ResolutionDidNotConverge,
    SourceFailure,
    /// Any other infrastructure failure while restoring a project
    RestoreFailure,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            DiagnosticCode::Conflict => "Conflict",
            DiagnosticCode::PackageNotFound => "PackageNotFound",
            DiagnosticCode::Cycle => "Cycle",
            DiagnosticCode::FrameworkMismatch => "FrameworkMismatch",
            DiagnosticCode::MissingProject => "MissingProject",
            DiagnosticCode::ResolutionDidNotConverge => "ResolutionDidNotConverge",
            DiagnosticCode::SourceFailure => "SourceFailure",
            DiagnosticCode::RestoreFailure => "RestoreFailure",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// One range requested for a package and who requested it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedRange {
    pub range: VersionRange,
    /// A project unique name, or `Id/Version` of a package
    pub requested_by: String,
}

/// Context of a package that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionConflict {
    pub package_id: String,
    pub requested: Vec<RequestedRange>,
    /// Every version the sources offer, ascending
    pub available: Vec<Version>,
    pub latest: Option<Version>,
}

impl ResolutionConflict {
    /// Human-readable summary of the requests
    pub fn describe_requests(&self) -> String {
        self.requested
            .iter()
            .map(|request| format!("{} ({})", request.range, request.requested_by))
            .collect::<Vec<_>>()
            .join(" and ")
    }
}

/// A problem found while restoring one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub project: String,
    pub framework: Option<TargetFramework>,
    pub package_id: Option<String>,
    pub message: String,
    pub conflict: Option<ResolutionConflict>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, project: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            project: project.into(),
            framework: None,
            package_id: None,
            message: message.into(),
            conflict: None,
        }
    }

    pub fn warning(code: DiagnosticCode, project: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, project, message)
        }
    }

    pub fn with_framework(mut self, framework: &TargetFramework) -> Self {
        self.framework = Some(framework.clone());
        self
    }

    pub fn with_package(mut self, package_id: impl Into<String>) -> Self {
        self.package_id = Some(package_id.into());
        self
    }

    /// Attach conflict details; also sets the package id
    pub fn with_conflict(mut self, conflict: ResolutionConflict) -> Self {
        self.package_id = Some(conflict.package_id.clone());
        self.conflict = Some(conflict);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Lock file form
    pub fn to_locked(&self) -> LockedDiagnostic {
        LockedDiagnostic {
            code: self.code.to_string(),
            level: self.severity.to_string(),
            framework: self.framework.as_ref().map(|framework| framework.to_string()),
            package_id: self.package_id.clone(),
            message: self.message.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity, self.code)?;
        if let Some(framework) = &self.framework {
            write!(f, " [{}]", framework)?;
        }
        write!(f, ": {}", self.message)
    }
}
