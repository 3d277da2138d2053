//! Build summary (build_summary.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use buildwatch_cache::PruneResult;

use super::exit::Status;
use crate::config::ConfigSource;
use crate::runner::BuildStats;

/// Schema version for build_summary.json
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for build_summary.json
pub const SUMMARY_SCHEMA_ID: &str = "buildwatch/summary@1";

/// One build invocation, as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSummary {
    pub schema_version: u32,
    pub schema_id: String,

    /// Unique identifier of this invocation (ULID)
    pub run_id: String,

    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,

    pub status: Status,
    pub exit_code: i32,

    /// Command line of the build tool
    pub command: String,

    pub dirty: bool,
    pub ci: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildStats>,

    /// Filtered error lines (failed builds only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prune: Option<PruneResult>,

    /// Configuration layers that shaped the run
    pub sources: Vec<ConfigSource>,
}

impl BuildSummary {
    /// Start a summary; the caller fills in build/prune details.
    pub fn new(
        run_id: String,
        started_at: DateTime<Utc>,
        status: Status,
        command: String,
        dirty: bool,
        ci: bool,
        sources: Vec<ConfigSource>,
    ) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            schema_id: SUMMARY_SCHEMA_ID.to_string(),
            run_id,
            started_at,
            ended_at: Utc::now(),
            status,
            exit_code: status.exit_code().code(),
            command,
            dirty,
            ci,
            build: None,
            errors: Vec::new(),
            prune: None,
            sources,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file, creating parent directories
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)
    }
}
