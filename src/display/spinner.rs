//! Terminal spinner backed by indicatif.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::ProgressSink;

const TICK_INTERVAL: Duration = Duration::from_millis(120);
const TEMPLATE: &str = "{spinner:.green} {msg}";

/// Single-line spinner drawn on stderr.
///
/// indicatif hides the bar when stderr is not a terminal, so CI logs only
/// see the echoed build output.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style);
        }
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar }
    }

    /// A spinner that never draws.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Current status text.
    pub fn message(&self) -> String {
        self.bar.message()
    }

    pub fn is_closed(&self) -> bool {
        self.bar.is_finished()
    }
}

impl Default for Spinner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for Spinner {
    fn update(&mut self, status: &str) {
        if !self.bar.is_finished() {
            self.bar.set_message(status.to_string());
        }
    }

    fn echo(&mut self, line: &str) {
        self.bar.suspend(|| println!("{}", line));
    }

    fn close(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.close();
    }
}
