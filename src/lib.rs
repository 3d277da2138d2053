//! buildwatch - SCons build wrapper
//!
//! Runs the build tool with a live progress line, reports filtered errors
//! when it fails, and keeps the SCons cache directory under a byte budget
//! after it succeeds.

pub mod config;
pub mod display;
pub mod logging;
pub mod pipeline;
pub mod runner;
pub mod summary;

pub use config::{ConfigError, EffectiveConfig, Settings};
pub use pipeline::{BuildOptions, Pipeline, PipelineError, PipelineOutcome};
pub use runner::{BuildOutcome, BuildRunner, BuildStats, FailureReport};
pub use summary::{BuildSummary, ExitCode, Status};
