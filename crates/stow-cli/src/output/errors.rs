//! Error and diagnostic formatting.
//!
//! Errors print as an `error:` line, then the `help:` suggestion when the
//! error has one, then every `caused by:` entry of the source chain.

use super::colors::ColorSupport;
use std::error::Error;
use stow_core::error::StowError;
use stow_resolver::{Diagnostic, Severity};

/// Formats errors and resolver diagnostics for the terminal
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with its suggestion and cause chain
    pub fn format_error(&self, error: &StowError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            output.push('\n');
            source = err.source();
        }

        output
    }

    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }

    /// One diagnostic line, plus the available and latest versions of a conflict
    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let label = match diagnostic.severity {
            Severity::Error => self.colors.red("error"),
            Severity::Warning => self.colors.yellow("warning"),
        };
        let mut output = format!("{} {}", label, diagnostic.code);
        if let Some(framework) = &diagnostic.framework {
            output.push_str(&format!(" [{}]", framework));
        }
        output.push_str(": ");
        output.push_str(&diagnostic.message);

        if let Some(conflict) = &diagnostic.conflict {
            if !conflict.available.is_empty() {
                let available: Vec<String> = conflict.available.iter().map(ToString::to_string).collect();
                output.push('\n');
                output.push_str(&self.colors.dim("  available"));
                output.push_str(": ");
                output.push_str(&available.join(", "));
            }
            if let Some(latest) = &conflict.latest {
                output.push('\n');
                output.push_str(&self.colors.dim("  latest"));
                output.push_str(": ");
                output.push_str(&latest.to_string());
            }
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_core::{TargetFramework, Version, VersionRange};
    use stow_resolver::{DiagnosticCode, RequestedRange, ResolutionConflict};

    fn formatter() -> ErrorFormatter {
        ErrorFormatter::with_colors(ColorSupport::disabled())
    }

    #[test]
    fn test_error_with_help_and_cause() {
        let error = StowError::io(
            "Failed to read graph.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let text = formatter().format_error(&error);

        assert!(text.starts_with("error: IO error: Failed to read graph.json\n"));
        assert!(text.contains("caused by: no such file"));

        let cycle = StowError::CircularProjectReference {
            cycle: "X -> Y -> X".to_string(),
        };
        let text = formatter().format_error(&cycle);
        assert!(text.contains("help: Remove one of the project references"));
    }

    #[test]
    fn test_conflict_diagnostic() {
        let conflict = ResolutionConflict {
            package_id: "Foo".to_string(),
            requested: vec![RequestedRange {
                range: VersionRange::parse("[1.0.0, 2.0.0)").unwrap(),
                requested_by: "AppA".to_string(),
            }],
            available: vec![Version::new(2, 5, 0)],
            latest: Some(Version::new(2, 5, 0)),
        };
        let diagnostic = Diagnostic::error(DiagnosticCode::Conflict, "AppA", "no version of Foo fits")
            .with_framework(&TargetFramework::new("net8.0"))
            .with_conflict(conflict);

        assert_eq!(
            formatter().format_diagnostic(&diagnostic),
            "error Conflict [net8.0]: no version of Foo fits\n  available: 2.5.0\n  latest: 2.5.0"
        );
    }

    #[test]
    fn test_warning_diagnostic() {
        let diagnostic = Diagnostic::warning(DiagnosticCode::Cycle, "X", "Cycle detected: X -> Y -> X");
        assert_eq!(
            formatter().format_diagnostic(&diagnostic),
            "warning Cycle: Cycle detected: X -> Y -> X"
        );
    }
}
