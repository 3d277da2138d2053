//! Structured logging
//!
//! Records go to stderr from the start. The persistent log file is attached
//! lazily: nothing is written to disk until [`LogFile::attach_file_handler`]
//! runs, which the failure path does before emitting its error record.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Handle to the deferred log file shared with the subscriber.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    slot: Arc<Mutex<Option<File>>>,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    /// Open the log file (creating parent directories) and start appending
    /// every subsequent record to it. Calling it again is a no-op.
    pub fn attach_file_handler(&self) -> io::Result<()> {
        let mut slot = self.lock();
        if slot.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        *slot = Some(file);
        Ok(())
    }

    fn make_writer(&self) -> DeferredFileMakeWriter {
        DeferredFileMakeWriter {
            slot: Arc::clone(&self.slot),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct DeferredFileMakeWriter {
    slot: Arc<Mutex<Option<File>>>,
}

impl<'a> MakeWriter<'a> for DeferredFileMakeWriter {
    type Writer = DeferredFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        DeferredFileWriter {
            guard: self.slot.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

struct DeferredFileWriter<'a> {
    guard: MutexGuard<'a, Option<File>>,
}

impl Write for DeferredFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.guard.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.guard.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber and return the deferred log file handle.
///
/// Only the first call installs a subscriber; later calls still return a
/// usable handle whose file is simply not wired to any layer.
pub fn init_logging(settings: &LoggingSettings) -> LogFile {
    let log_file = LogFile::new(&settings.file);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_target(false);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(log_file.make_writer());

    let installed = tracing_subscriber::registry()
        .with(env_filter(&settings.level))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }

    log_file
}
