//! stderr line classifier.
//!
//! SCons, when run with `SCONS_PROGRESS=1`, prints `progress: <count>` on
//! stderr after each node. Everything else on stderr is compiler output.

use thiserror::Error;

/// Prefix of a progress marker line.
pub const PROGRESS_MARKER: &str = "progress: ";

/// A classified stderr line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StderrLine {
    /// Progress marker carrying the number of completed nodes.
    Progress(u64),
    /// Any other non-empty line, decoded with invalid bytes replaced.
    Output(String),
    /// Empty after trailing whitespace is stripped.
    Blank,
}

/// A marker line whose count could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed progress count: {raw:?}")]
pub struct ProgressParseError {
    /// Text following the marker.
    pub raw: String,
}

/// Splits stderr lines into progress markers and output.
///
/// Classification is exclusive: a line starting with the marker is never
/// reported as output, even when its count is malformed.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    marker: String,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(PROGRESS_MARKER)
    }
}

impl LineClassifier {
    /// Create a classifier for the given marker prefix.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// The marker prefix.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Classify one raw stderr line (with or without its line terminator).
    pub fn classify(&self, raw: &[u8]) -> Result<StderrLine, ProgressParseError> {
        let line = trim_end(raw);

        if let Some(rest) = line.strip_prefix(self.marker.as_bytes()) {
            let text = String::from_utf8_lossy(rest);
            return text
                .trim()
                .parse::<u64>()
                .map(StderrLine::Progress)
                .map_err(|_| ProgressParseError {
                    raw: text.into_owned(),
                });
        }

        if line.is_empty() {
            Ok(StderrLine::Blank)
        } else {
            Ok(StderrLine::Output(String::from_utf8_lossy(line).into_owned()))
        }
    }
}

fn trim_end(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &raw[..end]
}
