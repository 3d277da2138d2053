//! Error line filter.
//!
//! Only lines carrying a compiler or SCons error survive into the failure
//! report; warnings and command echoes are dropped.

use serde::{Deserialize, Serialize};

/// Substrings that mark a line as an error.
pub const DEFAULT_ERROR_PATTERNS: &[&str] = &["error: ", "not found, needed by target"];

/// Keeps output lines containing any of a set of substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorFilter {
    patterns: Vec<String>,
}

impl Default for ErrorFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_PATTERNS.iter().map(|p| p.to_string()))
    }
}

impl ErrorFilter {
    /// Create a filter from a list of substrings.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// The configured substrings.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check whether a single line is an error line.
    pub fn matches(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| line.contains(p.as_str()))
    }

    /// Keep the error lines, preserving their original order.
    pub fn filter<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
        lines
            .iter()
            .map(AsRef::as_ref)
            .filter(|line| self.matches(line))
            .map(str::to_string)
            .collect()
    }
}
