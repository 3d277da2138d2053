//! Build runner
//!
//! Starts the build tool, feeds its output through the progress monitor and
//! turns the exit status into a [`BuildOutcome`]. The runner never exits the
//! process; the caller decides what a failed build means.
//!
//! ## Pipe draining
//!
//! stdout and stderr are both read continuously by dedicated reader threads
//! for as long as the child holds them open. The monitor consumes their lines
//! on the calling thread in arrival order. After the child exits the channel
//! is drained for at most [`DRAIN_GRACE`], which bounds the wait when a
//! leftover grandchild keeps a pipe open.

mod invocation;
mod monitor;
mod report;
mod stream;

pub use invocation::{parallelism_flag, BuildInvocation};
pub use monitor::ProgressMonitor;
pub use report::{report_failure, BuildOutcome, BuildStats, FailureReport};
pub use stream::{spawn_reader, ReadFailure, StreamEvent, StreamKind};

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use buildwatch_progress::{ErrorFilter, LineClassifier};
use thiserror::Error;

use crate::config::Settings;
use crate::display::ProgressSink;

/// How long the monitor waits for output before checking the child.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to keep reading output after the child has exited.
pub const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Errors from running the build tool.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for build process: {0}")]
    Wait(#[source] io::Error),
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Runs one build.
#[derive(Debug, Clone)]
pub struct BuildRunner {
    invocation: BuildInvocation,
    classifier: LineClassifier,
    filter: ErrorFilter,
    total_nodes: u64,
    drain_grace: Duration,
}

impl BuildRunner {
    pub fn new(invocation: BuildInvocation, settings: &Settings) -> Self {
        Self {
            invocation,
            classifier: LineClassifier::new(settings.build.progress_marker.clone()),
            filter: settings.report.patterns.clone(),
            total_nodes: settings.build.total_nodes,
            drain_grace: DRAIN_GRACE,
        }
    }

    /// Bound on reading output after the child exits (default [`DRAIN_GRACE`]).
    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn from_settings(settings: &Settings, extra_args: &[String]) -> Self {
        Self::new(BuildInvocation::from_settings(settings, extra_args), settings)
    }

    pub fn invocation(&self) -> &BuildInvocation {
        &self.invocation
    }

    /// Run the build to completion.
    ///
    /// `dirty` marks a build of a tree with local modifications; it is
    /// recorded in the log and does not change behavior.
    pub fn run(&self, dirty: bool, sink: &mut dyn ProgressSink) -> RunnerResult<BuildOutcome> {
        tracing::info!(command = %self.invocation, cwd = %self.invocation.cwd.display(), dirty, "starting build");

        let started = Instant::now();
        let mut child = self
            .invocation
            .command()
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.invocation.program.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(StreamKind::Stderr, stderr, tx.clone()));
        }
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(StreamKind::Stdout, stdout, tx.clone()));
        }
        drop(tx);

        let mut monitor = ProgressMonitor::new(self.classifier.clone(), self.total_nodes, sink);

        let mut pipes_open = true;
        let status = loop {
            if pipes_open {
                match rx.recv_timeout(POLL_INTERVAL) {
                    Ok(event) => monitor.observe(event, started.elapsed()),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => pipes_open = false,
                }
            } else {
                // Both pipes closed; the child is about to exit.
                break child.wait().map_err(RunnerError::Wait)?;
            }

            if let Some(status) = child.try_wait().map_err(RunnerError::Wait)? {
                break status;
            }
        };

        let deadline = Instant::now() + self.drain_grace;
        let drained = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(event) => monitor.observe(event, started.elapsed()),
                Err(RecvTimeoutError::Disconnected) => break true,
                Err(RecvTimeoutError::Timeout) => break false,
            }
        };

        if drained {
            for reader in readers {
                let _ = reader.join();
            }
        } else {
            tracing::warn!("build output still open after exit, not waiting for it");
        }

        let mut stats = BuildStats {
            exit_code: status.code(),
            term_signal: None,
            duration_ms: started.elapsed().as_millis() as u64,
            nodes_completed: monitor.nodes_completed(),
            total_nodes: self.total_nodes,
            output_lines: monitor.output().len(),
            skipped_lines: monitor.skipped(),
        };
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            stats.term_signal = status.signal();
        }

        if status.success() {
            tracing::info!(duration_ms = stats.duration_ms, nodes = ?stats.nodes_completed, "build succeeded");
            return Ok(BuildOutcome::Succeeded(stats));
        }

        let errors = self.filter.filter(&monitor.into_output());
        tracing::debug!(exit_code = ?stats.exit_code, signal = ?stats.term_signal, errors = errors.len(), "build failed");
        Ok(BuildOutcome::Failed(FailureReport { stats, errors }))
    }
}
