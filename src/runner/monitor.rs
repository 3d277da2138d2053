//! Progress monitor
//!
//! Consumes pipe events in arrival order: stderr progress markers drive the
//! status display, other stderr lines are echoed and kept for the failure
//! report, and stdout lines only refresh the trailing text of the status.

use std::time::Duration;

use buildwatch_progress::{status_line, LineClassifier, StderrLine};

use super::stream::{StreamEvent, StreamKind};
use crate::display::ProgressSink;

pub struct ProgressMonitor<'a> {
    classifier: LineClassifier,
    total_nodes: u64,
    sink: &'a mut dyn ProgressSink,
    output: Vec<String>,
    last_stdout: String,
    nodes_completed: Option<u64>,
    skipped: usize,
}

impl<'a> ProgressMonitor<'a> {
    pub fn new(classifier: LineClassifier, total_nodes: u64, sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            classifier,
            total_nodes,
            sink,
            output: Vec::new(),
            last_stdout: String::new(),
            nodes_completed: None,
            skipped: 0,
        }
    }

    /// Handle one event. `elapsed` is the build's wall-clock time so far.
    pub fn observe(&mut self, event: StreamEvent, elapsed: Duration) {
        match event {
            StreamEvent::Line(StreamKind::Stderr, raw) => self.observe_stderr(&raw, elapsed),
            StreamEvent::Line(StreamKind::Stdout, raw) => self.observe_stdout(&raw),
            StreamEvent::ReadFailed(kind, failure) => {
                self.skipped += 1;
                tracing::debug!(stream = %kind, error = %failure.error, "skipped unreadable output");
            }
        }
    }

    pub fn observe_stderr(&mut self, raw: &[u8], elapsed: Duration) {
        match self.classifier.classify(raw) {
            Ok(StderrLine::Progress(completed)) => {
                self.nodes_completed = Some(completed);
                let status = status_line(elapsed, completed, self.total_nodes, &self.last_stdout);
                self.sink.update(&status);
            }
            Ok(StderrLine::Output(line)) => {
                self.sink.echo(&line);
                self.output.push(line);
            }
            Ok(StderrLine::Blank) => {}
            Err(e) => {
                self.skipped += 1;
                tracing::debug!(error = %e, "ignored progress marker");
            }
        }
    }

    pub fn observe_stdout(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end();
        if !text.is_empty() {
            self.last_stdout = text.to_string();
        }
    }

    /// Non-progress stderr lines seen so far, in order.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn nodes_completed(&self) -> Option<u64> {
        self.nodes_completed
    }

    /// Read failures and malformed markers that were passed over.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn into_output(self) -> Vec<String> {
        self.output
    }
}
