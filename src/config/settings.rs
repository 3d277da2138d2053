//! Typed view of the merged configuration.

use std::path::PathBuf;

use buildwatch_cache::CacheBudget;
use buildwatch_progress::ErrorFilter;
use serde::{Deserialize, Serialize};

use super::effective::ConfigError;

/// Fully merged settings, built once by the entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory the build runs in
    pub base_dir: PathBuf,

    /// Continuous-integration run: larger cache, no interactive window
    pub ci: bool,

    pub build: BuildSettings,
    pub report: ReportSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    pub command: String,
    pub args: Vec<String>,
    pub progress_env: String,
    pub progress_marker: String,
    /// Pass `-j<cpus - 1>` to the build tool
    pub parallel: bool,
    pub total_nodes: u64,
    pub prebuilt_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// First line of the failure window
    pub title: String,
    pub patterns: ErrorFilter,
    pub wrap_width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    pub dir: PathBuf,
    pub max_bytes_ci: u64,
    pub max_bytes_local: u64,
    /// Explicit budget, overriding both context defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// Persistent log file, opened on first failure
    pub file: PathBuf,
    /// Where to write the JSON build summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<PathBuf>,
}

impl Settings {
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_value(value)
            .map_err(|e| ConfigError::ParseError(format!("invalid settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// The cache budget for this run's context.
    pub fn cache_budget(&self) -> CacheBudget {
        match self.cache.max_bytes {
            Some(max) => CacheBudget::new(max),
            None if self.ci => CacheBudget::new(self.cache.max_bytes_ci),
            None => CacheBudget::new(self.cache.max_bytes_local),
        }
    }

    /// Path whose existence means the tree ships prebuilt.
    pub fn prebuilt_path(&self) -> PathBuf {
        self.base_dir.join(&self.build.prebuilt_marker)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.build.command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "build.command must not be empty".to_string(),
            ));
        }
        if self.build.progress_marker.is_empty() {
            return Err(ConfigError::ValidationError(
                "build.progress_marker must not be empty".to_string(),
            ));
        }
        if self.build.total_nodes == 0 {
            return Err(ConfigError::ValidationError(
                "build.total_nodes must be greater than 0".to_string(),
            ));
        }
        if self.report.patterns.patterns().is_empty() {
            return Err(ConfigError::ValidationError(
                "report.patterns must not be empty".to_string(),
            ));
        }
        if self.report.wrap_width < 10 {
            return Err(ConfigError::ValidationError(
                "report.wrap_width must be at least 10".to_string(),
            ));
        }
        Ok(())
    }
}
