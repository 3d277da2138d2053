//! Built-in defaults (layer 1)

use std::path::{Path, PathBuf};

use buildwatch_cache::{CI_MAX_CACHE_BYTES, LOCAL_MAX_CACHE_BYTES};
use buildwatch_progress::{DEFAULT_ERROR_PATTERNS, DEFAULT_TOTAL_NODES, PROGRESS_MARKER};
use serde::{Deserialize, Serialize};

/// File whose presence identifies the device platform.
pub const DEVICE_MARKER: &str = "/TICI";

/// Platform family, which decides where the SCons cache lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// On-device build; the cache survives reboots under /data.
    Device,
    /// Workstation or CI; the cache lives in /tmp.
    Host,
}

impl Platform {
    pub fn detect() -> Self {
        Self::detect_with_marker(Path::new(DEVICE_MARKER))
    }

    pub fn detect_with_marker(marker: &Path) -> Self {
        if marker.is_file() {
            Platform::Device
        } else {
            Platform::Host
        }
    }

    pub fn default_cache_dir(&self) -> PathBuf {
        match self {
            Platform::Device => PathBuf::from("/data/scons_cache"),
            Platform::Host => PathBuf::from("/tmp/scons_cache"),
        }
    }
}

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    pub platform: Platform,

    /// Build tool executable (default: "scons")
    pub command: String,

    /// Arguments after the parallelism flag
    pub args: Vec<String>,

    /// Environment variable that turns on progress markers
    pub progress_env: String,

    pub progress_marker: String,

    /// Nodes in a full build (progress denominator)
    pub total_nodes: u64,

    /// Presence of this file under base_dir skips the build
    pub prebuilt_marker: String,

    pub report_title: String,
    pub error_patterns: Vec<String>,
    pub wrap_width: usize,

    pub cache_max_bytes_ci: u64,
    pub cache_max_bytes_local: u64,

    pub log_level: String,
    pub log_file: PathBuf,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self::for_platform(Platform::detect())
    }
}

impl BuiltinDefaults {
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            command: "scons".to_string(),
            args: vec!["--cache-populate".to_string()],
            progress_env: "SCONS_PROGRESS".to_string(),
            progress_marker: PROGRESS_MARKER.to_string(),
            total_nodes: DEFAULT_TOTAL_NODES,
            prebuilt_marker: "prebuilt".to_string(),
            report_title: "build failed".to_string(),
            error_patterns: DEFAULT_ERROR_PATTERNS.iter().map(|p| p.to_string()).collect(),
            wrap_width: 65,
            cache_max_bytes_ci: CI_MAX_CACHE_BYTES,
            cache_max_bytes_local: LOCAL_MAX_CACHE_BYTES,
            log_level: "info".to_string(),
            log_file: std::env::temp_dir().join("buildwatch").join("build.log"),
        }
    }

    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "base_dir": ".",
            "ci": false,
            "build": {
                "command": self.command,
                "args": self.args,
                "progress_env": self.progress_env,
                "progress_marker": self.progress_marker,
                "parallel": true,
                "total_nodes": self.total_nodes,
                "prebuilt_marker": self.prebuilt_marker
            },
            "report": {
                "title": self.report_title,
                "patterns": self.error_patterns,
                "wrap_width": self.wrap_width
            },
            "cache": {
                "dir": self.platform.default_cache_dir(),
                "max_bytes_ci": self.cache_max_bytes_ci,
                "max_bytes_local": self.cache_max_bytes_local
            },
            "logging": {
                "level": self.log_level,
                "file": self.log_file
            }
        })
    }
}
