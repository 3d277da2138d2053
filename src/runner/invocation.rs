//! Build tool command line and environment.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::Settings;

/// Everything needed to start the build tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl BuildInvocation {
    /// Invocation for this machine's CPU count.
    pub fn from_settings(settings: &Settings, extra_args: &[String]) -> Self {
        let cpus = if settings.build.parallel {
            std::thread::available_parallelism()
                .ok()
                .map(NonZeroUsize::get)
        } else {
            None
        };
        Self::with_cpus(settings, cpus, extra_args)
    }

    /// Invocation for a given CPU count (`None` when unknown or disabled).
    pub fn with_cpus(settings: &Settings, cpus: Option<usize>, extra_args: &[String]) -> Self {
        let mut args = Vec::new();
        if let Some(flag) = parallelism_flag(cpus) {
            args.push(flag);
        }
        args.extend(settings.build.args.iter().cloned());
        args.extend(extra_args.iter().cloned());

        Self {
            program: resolve_program(&settings.build.command, &settings.base_dir),
            args,
            cwd: settings.base_dir.clone(),
            env: vec![(settings.build.progress_env.clone(), "1".to_string())],
        }
    }

    /// A `Command` with both output pipes captured.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.cwd)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl fmt::Display for BuildInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// `-j<cpus - 1>`, keeping one core free for the rest of the system.
pub fn parallelism_flag(cpus: Option<usize>) -> Option<String> {
    cpus.map(|n| format!("-j{}", n.saturating_sub(1).max(1)))
}

/// Relative paths with a separator are taken relative to the base
/// directory; bare names are looked up on PATH.
fn resolve_program(command: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(command);
    if path.is_relative() && path.components().count() > 1 {
        base_dir.join(path)
    } else {
        path.to_path_buf()
    }
}
