//! Line rules for SCons build output.
//!
//! Classifies stderr lines into progress markers and plain output, filters
//! captured output down to error lines, and formats the status and failure
//! text shown to the user.

mod filter;
mod format;
mod parser;

pub use filter::{ErrorFilter, DEFAULT_ERROR_PATTERNS};
pub use format::{format_elapsed, status_line, wrap_text};
pub use parser::{LineClassifier, ProgressParseError, StderrLine, PROGRESS_MARKER};

/// Total node count of a full SCons build, used as the progress denominator.
pub const DEFAULT_TOTAL_NODES: u64 = 2405;
