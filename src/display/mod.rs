//! User-facing surfaces: the live progress line and the failure window.

mod spinner;
mod window;

pub use spinner::Spinner;
pub use window::{FailureDisplay, TerminalWindow, TextWindow};

/// Receives progress while a build runs.
///
/// Calls are best effort; a sink never fails the build.
pub trait ProgressSink {
    /// Replace the status text.
    fn update(&mut self, status: &str);

    /// Print a line of build output without corrupting the status display.
    fn echo(&mut self, line: &str) {
        println!("{}", line);
    }

    /// Tear the display down. Further updates are ignored.
    fn close(&mut self);
}
