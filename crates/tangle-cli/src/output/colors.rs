//! ANSI styling that switches itself off for pipes and `NO_COLOR`.

use std::env;
use std::io::{self, IsTerminal};

const RED: &str = "31";
const YELLOW: &str = "33";
const DIM: &str = "2";

/// Whether stderr output gets ANSI styling
#[derive(Debug, Clone, Copy)]
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    /// Enabled on an interactive stderr unless `NO_COLOR` is set
    pub fn detect() -> Self {
        let enabled = env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal();
        Self { enabled }
    }

    /// Plain text, for tests and redirected output
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }
}
