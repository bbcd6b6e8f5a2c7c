//! Terminal output formatting.
//!
//! Commands print their report through `OutputHandler`; logs go to stderr
//! through `tracing`. Report lines are marked by outcome, and resolver
//! diagnostics are printed indented under the project they belong to.

pub mod colors;
pub mod errors;

use colors::ColorSupport;
use errors::ErrorFormatter;
use stow_resolver::Diagnostic;

/// Indentation of diagnostics below their project line
const DIAGNOSTIC_INDENT: &str = "    ";

/// Output handler for the user-facing report
pub struct OutputHandler {
    colors: ColorSupport,
    formatter: ErrorFormatter,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self::with_colors(ColorSupport::disabled())
    }

    fn with_colors(colors: ColorSupport) -> Self {
        Self {
            colors,
            formatter: ErrorFormatter::with_colors(colors),
        }
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    pub fn plain_line(&self, message: &str) {
        println!("{}", message);
    }

    /// A line whose marker reflects whether the thing it reports succeeded
    pub fn outcome(&self, succeeded: bool, message: &str) {
        if succeeded {
            println!("{} {}", self.colors.green("✓"), message);
        } else {
            println!("{} {}", self.colors.red("✗"), message);
        }
    }

    /// A resolver diagnostic, every line indented
    pub fn diagnostic(&self, diagnostic: &Diagnostic) {
        for line in self.formatter.format_diagnostic(diagnostic).lines() {
            println!("{}{}", DIAGNOSTIC_INDENT, line);
        }
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
