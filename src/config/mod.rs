//! Configuration merge system
//!
//! Implements the 5-layer configuration merge:
//! 1. Built-in defaults (platform aware)
//! 2. User config (~/.config/buildwatch/config.toml)
//! 3. Repo config (<base_dir>/.buildwatch.toml, or --config)
//! 4. Environment (CI detection)
//! 5. CLI flags
//!
//! The merged value is deserialized once into [`Settings`] and handed to the
//! runner and the cache pruner.

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::{BuiltinDefaults, Platform, DEVICE_MARKER};
pub use effective::{
    detect_ci, env_overrides, user_config_path, ConfigError, ConfigOrigin, ConfigSource,
    EffectiveConfig, REPO_CONFIG_FILE,
};
pub use merge::{deep_merge, merge_layers};
pub use settings::{BuildSettings, CacheSettings, LoggingSettings, ReportSettings, Settings};
