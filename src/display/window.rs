//! Blocking failure window
//!
//! On a local build failure the filtered errors are shown full-screen in the
//! terminal and the process waits until the user dismisses them, so the
//! errors are not scrolled away by whatever runs next.

use std::io::{self, BufRead, Write};

const RULE_MAX: usize = 80;
const DISMISS_PROMPT: &str = "Press Enter to exit.";

/// Somewhere to show the failure text and wait for the user.
pub trait FailureDisplay {
    /// Show `text` and block until dismissed.
    fn show(&mut self, text: &str) -> io::Result<()>;
}

/// A framed block of text with a dismissal prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWindow {
    text: String,
}

impl TextWindow {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Write the framed text and prompt.
    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let width = self
            .text
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .clamp(DISMISS_PROMPT.len(), RULE_MAX);
        let rule = "=".repeat(width);

        writeln!(out)?;
        writeln!(out, "{}", rule)?;
        writeln!(out, "{}", self.text)?;
        writeln!(out, "{}", rule)?;
        write!(out, "{} ", DISMISS_PROMPT)?;
        out.flush()
    }

    /// Render, then block until a line (or end of input) arrives on `input`.
    pub fn wait_for_exit<R: BufRead, W: Write>(&self, input: &mut R, out: &mut W) -> io::Result<()> {
        self.render(out)?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        writeln!(out)?;
        Ok(())
    }
}

/// [`TextWindow`] on the controlling terminal (stderr + stdin).
#[derive(Debug, Default)]
pub struct TerminalWindow;

impl FailureDisplay for TerminalWindow {
    fn show(&mut self, text: &str) -> io::Result<()> {
        let window = TextWindow::new(text);
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stderr().lock();
        window.wait_for_exit(&mut input, &mut out)
    }
}
