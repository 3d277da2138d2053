//! Run status and stable exit codes

use serde::{Deserialize, Serialize};

/// Overall status of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Build (and pruning, if enabled) completed
    Success,
    /// Build tool exited non-zero
    Failed,
    /// Tree ships prebuilt; nothing ran
    Prebuilt,
}

impl Status {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Status::Success | Status::Prebuilt => ExitCode::Success,
            Status::Failed => ExitCode::BuildFailed,
        }
    }
}

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitCode {
    Success,
    BuildFailed,
    Config,
    Runner,
    Cache,
}

impl ExitCode {
    pub fn code(&self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::BuildFailed => 1,
            ExitCode::Config => 2,
            ExitCode::Runner => 3,
            ExitCode::Cache => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::BuildFailed => "Build failed",
            ExitCode::Config => "Configuration error",
            ExitCode::Runner => "Could not run the build tool",
            ExitCode::Cache => "Cache pruning failed",
        }
    }
}
