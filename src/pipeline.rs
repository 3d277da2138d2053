//! Pipeline orchestration
//!
//! Build first, then prune the cache, and only prune when the build
//! succeeded. A tree shipped prebuilt skips both steps.

use std::io;

use buildwatch_cache::{CacheError, CachePruner, PruneResult};
use chrono::Utc;
use thiserror::Error;
use ulid::Ulid;

use crate::config::{ConfigSource, Settings};
use crate::display::{FailureDisplay, ProgressSink};
use crate::logging::LogFile;
use crate::runner::{report_failure, BuildOutcome, BuildRunner, BuildStats, FailureReport, RunnerError};
use crate::summary::{BuildSummary, ExitCode, Status};

/// Status text shown before the build tool produces output.
pub const STARTING_STATUS: &str = "Build starting...";

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PipelineError::Runner(_) => ExitCode::Runner,
            PipelineError::Cache(_) => ExitCode::Cache,
            PipelineError::Io(_) => ExitCode::Runner,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Per-invocation build options from the command line.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Tree has local modifications (informational)
    pub dirty: bool,
    /// Prune the cache after a successful build
    pub prune: bool,
    /// Appended to the build tool's arguments
    pub extra_args: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            dirty: false,
            prune: true,
            extra_args: Vec::new(),
        }
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Prebuilt,
    Built {
        stats: BuildStats,
        prune: Option<PruneResult>,
    },
    BuildFailed(FailureReport),
}

impl PipelineOutcome {
    pub fn status(&self) -> Status {
        match self {
            PipelineOutcome::Prebuilt => Status::Prebuilt,
            PipelineOutcome::Built { .. } => Status::Success,
            PipelineOutcome::BuildFailed(_) => Status::Failed,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.status().exit_code()
    }
}

/// The build-then-prune sequence for one set of settings.
pub struct Pipeline<'a> {
    settings: &'a Settings,
    sources: Vec<ConfigSource>,
    log_file: &'a LogFile,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &'a Settings, sources: Vec<ConfigSource>, log_file: &'a LogFile) -> Self {
        Self {
            settings,
            sources,
            log_file,
        }
    }

    /// Run the build, report a failure, or prune after success.
    pub fn run_build(
        &self,
        options: &BuildOptions,
        sink: &mut dyn ProgressSink,
        window: &mut dyn FailureDisplay,
    ) -> PipelineResult<PipelineOutcome> {
        let run_id = Ulid::new().to_string();
        let started_at = Utc::now();
        let runner = BuildRunner::from_settings(self.settings, &options.extra_args);

        let prebuilt = self.settings.prebuilt_path();
        let outcome = if prebuilt.exists() {
            tracing::info!(marker = %prebuilt.display(), "prebuilt tree, skipping build");
            sink.close();
            PipelineOutcome::Prebuilt
        } else {
            sink.update(STARTING_STATUS);
            match runner.run(options.dirty, sink)? {
                BuildOutcome::Failed(report) => {
                    report_failure(&report, self.settings, self.log_file, sink, window);
                    PipelineOutcome::BuildFailed(report)
                }
                BuildOutcome::Succeeded(stats) => {
                    sink.close();
                    let prune = if options.prune {
                        Some(self.prune_cache(false)?)
                    } else {
                        None
                    };
                    PipelineOutcome::Built { stats, prune }
                }
            }
        };

        if let Some(path) = &self.settings.logging.summary {
            let mut summary = BuildSummary::new(
                run_id,
                started_at,
                outcome.status(),
                runner.invocation().to_string(),
                options.dirty,
                self.settings.ci,
                self.sources.clone(),
            );
            match &outcome {
                PipelineOutcome::Prebuilt => {}
                PipelineOutcome::Built { stats, prune } => {
                    summary.build = Some(stats.clone());
                    summary.prune = prune.clone();
                }
                PipelineOutcome::BuildFailed(report) => {
                    summary.build = Some(report.stats.clone());
                    summary.errors = report.errors.clone();
                }
            }
            summary.write_to_file(path)?;
            tracing::debug!(path = %path.display(), "wrote build summary");
        }

        Ok(outcome)
    }

    /// Prune the cache directory down to this run's budget.
    pub fn prune_cache(&self, dry_run: bool) -> PipelineResult<PruneResult> {
        let mut pruner = CachePruner::new(&self.settings.cache.dir, self.settings.cache_budget());
        if dry_run {
            pruner = pruner.with_dry_run();
        }
        Ok(pruner.run()?)
    }
}
