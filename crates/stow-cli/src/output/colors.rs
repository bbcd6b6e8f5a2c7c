//! Terminal color support.
//!
//! Colors are off when `NO_COLOR` is set or either output stream is not a
//! terminal.

use std::env;
use std::io::{self, IsTerminal};

/// ANSI color formatting, or plain text when disabled
#[derive(Debug, Clone, Copy)]
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    pub fn detect() -> Self {
        Self {
            enabled: Self::should_use_colors(),
        }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    #[cfg(test)]
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    fn should_use_colors() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        io::stderr().is_terminal() && io::stdout().is_terminal()
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_plain() {
        let colors = ColorSupport::disabled();
        assert_eq!(colors.red("error"), "error");
        assert_eq!(colors.yellow("warning"), "warning");
    }

    #[test]
    fn test_enabled_wraps_in_escape_codes() {
        let colors = ColorSupport::enabled();
        assert_eq!(colors.green("ok"), "\x1b[32mok\x1b[0m");
        assert_eq!(colors.dim("note"), "\x1b[2mnote\x1b[0m");
    }
}
