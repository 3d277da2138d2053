//! Shared helpers for pipeline tests
//!
//! The build tool is stood in for by a `/bin/sh` script; the script path is
//! the first argument so nothing needs the executable bit.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use buildwatch::config::{deep_merge, BuiltinDefaults, EffectiveConfig, Platform, Settings};
use buildwatch::display::{FailureDisplay, ProgressSink};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Scratch layout for one pipeline run.
pub struct Workspace {
    pub temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::create_dir_all(temp.path().join("cache")).unwrap();
        Self { temp }
    }

    pub fn base_dir(&self) -> PathBuf {
        self.temp.path().join("src")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    pub fn log_path(&self) -> PathBuf {
        self.temp.path().join("logs").join("build.log")
    }

    /// Write the fake build script and return its path.
    pub fn write_script(&self, body: &str) -> PathBuf {
        let path = self.temp.path().join("fake_scons.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        path
    }

    /// Settings running `script` under /bin/sh, with extra overrides merged on top.
    pub fn settings(&self, script: &Path, overrides: Value) -> Settings {
        let base = json!({
            "base_dir": self.base_dir(),
            "build": {
                "command": "/bin/sh",
                "args": [script, "--cache-populate"],
                "parallel": false
            },
            "cache": { "dir": self.cache_dir() },
            "logging": { "file": self.log_path() }
        });
        let cli = deep_merge(base, overrides);

        EffectiveConfig::build(
            &BuiltinDefaults::for_platform(Platform::Host),
            None,
            None,
            None,
            Some(cli),
        )
        .unwrap()
        .settings()
        .unwrap()
    }

    /// Cache file of `size` bytes last modified `age_secs` ago.
    pub fn cache_file(&self, name: &str, size: usize, age_secs: u64) -> PathBuf {
        let path = self.cache_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, vec![0u8; size]).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        path
    }
}

/// Progress sink that keeps everything it was sent.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub updates: Vec<String>,
    pub echoed: Vec<String>,
    pub closed: bool,
}

impl ProgressSink for RecordingSink {
    fn update(&mut self, status: &str) {
        self.updates.push(status.to_string());
    }

    fn echo(&mut self, line: &str) {
        self.echoed.push(line.to_string());
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Failure window that records instead of blocking.
#[derive(Debug, Default)]
pub struct RecordingWindow {
    pub shown: Vec<String>,
}

impl FailureDisplay for RecordingWindow {
    fn show(&mut self, text: &str) -> io::Result<()> {
        self.shown.push(text.to_string());
        Ok(())
    }
}

/// Failure window whose terminal is unusable.
#[derive(Debug, Default)]
pub struct BrokenWindow {
    pub attempts: usize,
}

impl FailureDisplay for BrokenWindow {
    fn show(&mut self, _text: &str) -> io::Result<()> {
        self.attempts += 1;
        Err(io::Error::new(io::ErrorKind::InvalidData, "stdin not utf-8"))
    }
}
