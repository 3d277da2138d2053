//! Build outcome and failure reporting.

use buildwatch_progress::wrap_text;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::display::{FailureDisplay, ProgressSink};
use crate::logging::LogFile;

/// Numbers collected while the build ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Exit code of the build tool (None if killed by a signal)
    pub exit_code: Option<i32>,
    /// Signal that terminated the build tool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_signal: Option<i32>,
    pub duration_ms: u64,
    /// Last progress count reported
    pub nodes_completed: Option<u64>,
    pub total_nodes: u64,
    /// Non-progress stderr lines captured
    pub output_lines: usize,
    /// Unreadable lines and malformed markers passed over
    pub skipped_lines: usize,
}

/// What a failed build leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub stats: BuildStats,
    /// Captured lines that matched an error pattern, in order
    pub errors: Vec<String>,
}

impl FailureReport {
    pub fn error_text(&self) -> String {
        self.errors.join("\n")
    }

    /// Message for the error log record.
    pub fn log_message(&self, tool: &str) -> String {
        format!("{} build failed\n{}", tool, self.error_text())
    }

    /// Text for the failure window: title, then each error wrapped to
    /// `width` columns, separated by a blank line.
    pub fn window_text(&self, title: &str, width: usize) -> String {
        let body = self
            .errors
            .iter()
            .map(|e| wrap_text(e, width).join("\n"))
            .collect::<Vec<_>>()
            .join("\n \n");
        format!("{}\n \n{}", title, body)
    }
}

/// Result of running the build tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded(BuildStats),
    Failed(FailureReport),
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Succeeded(_))
    }

    pub fn stats(&self) -> &BuildStats {
        match self {
            BuildOutcome::Succeeded(stats) => stats,
            BuildOutcome::Failed(report) => &report.stats,
        }
    }
}

/// Report a failed build: persist the error log record, close the progress
/// display, and outside CI block on the failure window.
///
/// Display problems are logged and otherwise ignored, so a failed build is
/// always reported as a failed build.
pub fn report_failure(
    report: &FailureReport,
    settings: &Settings,
    log_file: &LogFile,
    sink: &mut dyn ProgressSink,
    window: &mut dyn FailureDisplay,
) {
    if let Err(e) = log_file.attach_file_handler() {
        tracing::warn!(path = %log_file.path().display(), error = %e, "could not open log file");
    }
    tracing::error!(
        exit_code = ?report.stats.exit_code,
        errors = report.errors.len(),
        "{}",
        report.log_message(&settings.build.command)
    );

    sink.close();

    if !settings.ci {
        let text = report.window_text(&settings.report.title, settings.report.wrap_width);
        if let Err(e) = window.show(&text) {
            tracing::warn!(error = %e, "could not show failure window");
        }
    }
}
