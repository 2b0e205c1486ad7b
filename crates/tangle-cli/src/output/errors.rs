//! Error message formatting with actionable suggestions.

use super::colors::ColorSupport;
use std::error::Error;
use tangle_core::error::TangleError;

/// Renders an error, its help text and its cause chain
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &TangleError) -> String {
        let mut output = format!("{}: {}\n", self.colors.red("error"), error);

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&format!("{}: {}\n", self.colors.yellow("help"), suggestion));
        }

        let mut source = error.source();
        while let Some(cause) = source {
            output.push_str(&format!("{}: {}\n", self.colors.dim("caused by"), cause));
            source = cause.source();
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
