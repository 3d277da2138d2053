//! buildwatch CLI
//!
//! Entry point for the `buildwatch` command-line tool.

use clap::{Parser, Subcommand};
use buildwatch::config::{
    detect_ci, env_overrides, user_config_path, BuiltinDefaults, EffectiveConfig, Settings,
    REPO_CONFIG_FILE,
};
use buildwatch::display::{Spinner, TerminalWindow};
use buildwatch::logging::init_logging;
use buildwatch::pipeline::{BuildOptions, Pipeline, PipelineOutcome};
use buildwatch::summary::ExitCode;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "buildwatch")]
#[command(about = "Run an SCons build with live progress and cache pruning", version)]
struct Cli {
    /// Path to repo config file (default: <base-dir>/.buildwatch.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Directory the build runs in
    #[arg(long, short = 'C', global = true)]
    base_dir: Option<PathBuf>,

    /// Force CI mode (also enabled by the CI environment variable)
    #[arg(long, global = true)]
    ci: bool,

    /// SCons cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Cache budget in bytes, overriding the CI/local defaults
    #[arg(long, global = true)]
    max_cache_bytes: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the build, then prune the cache if it succeeded
    Build {
        /// The working tree has local modifications
        #[arg(long)]
        dirty: bool,

        /// Skip cache pruning after a successful build
        #[arg(long)]
        no_prune: bool,

        /// Do not pass -j to the build tool
        #[arg(long)]
        no_parallel: bool,

        /// Write a JSON build summary to this path
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Extra arguments for the build tool (after --)
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Prune the cache directory down to its budget
    Prune {
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and its sources
    Config,
}

fn main() {
    let cli = Cli::parse();

    let effective = match load_config(&cli) {
        Ok(effective) => effective,
        Err(e) => fail(ExitCode::Config, &e),
    };
    let settings = match effective.settings() {
        Ok(settings) => settings,
        Err(e) => fail(ExitCode::Config, &e.to_string()),
    };

    match cli.command {
        Commands::Build {
            dirty,
            no_prune,
            args,
            ..
        } => {
            let options = BuildOptions {
                dirty,
                prune: !no_prune,
                extra_args: args,
            };
            run_build(&settings, effective, &options);
        }
        Commands::Prune { dry_run, json } => run_prune(&settings, effective, dry_run, json),
        Commands::Config => match effective.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => fail(ExitCode::Config, &format!("Error serializing config: {}", e)),
        },
    }
}

fn run_build(settings: &Settings, effective: EffectiveConfig, options: &BuildOptions) {
    let log_file = init_logging(&settings.logging);
    tracing::debug!(base_dir = %settings.base_dir.display(), ci = settings.ci, "starting build");

    let pipeline = Pipeline::new(settings, effective.sources, &log_file);
    let mut spinner = Spinner::new();
    let mut window = TerminalWindow;

    match pipeline.run_build(options, &mut spinner, &mut window) {
        Ok(PipelineOutcome::Built { prune, .. }) => {
            if let Some(prune) = prune {
                tracing::info!(
                    deleted = prune.deleted,
                    bytes_reclaimed = prune.bytes_reclaimed,
                    remaining_bytes = prune.remaining_bytes,
                    "cache pruned"
                );
            }
            process::exit(ExitCode::Success.code());
        }
        Ok(outcome) => process::exit(outcome.exit_code().code()),
        Err(e) => {
            drop(spinner);
            fail(e.exit_code(), &e.to_string());
        }
    }
}

fn run_prune(settings: &Settings, effective: EffectiveConfig, dry_run: bool, json_output: bool) {
    let log_file = init_logging(&settings.logging);
    let pipeline = Pipeline::new(settings, effective.sources, &log_file);

    let result = match pipeline.prune_cache(dry_run) {
        Ok(result) => result,
        Err(e) => fail(e.exit_code(), &e.to_string()),
    };

    if json_output {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(ExitCode::Cache, &format!("Error serializing output: {}", e)),
        }
    } else {
        let verb = if result.dry_run { "Would delete" } else { "Deleted" };
        println!("Cache: {}", settings.cache.dir.display());
        println!("  Scanned: {} files", result.scanned);
        println!("  {}: {} files ({} bytes)", verb, result.deleted, result.bytes_reclaimed);
        println!("  Remaining: {} bytes (budget {})", result.remaining_bytes, settings.cache_budget().max_bytes);
    }
}

fn load_config(cli: &Cli) -> Result<EffectiveConfig, String> {
    let base_dir = cli.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let repo_path = cli.config.clone().unwrap_or_else(|| base_dir.join(REPO_CONFIG_FILE));
    let user_path = user_config_path();

    EffectiveConfig::build(
        &BuiltinDefaults::default(),
        user_path.as_deref(),
        Some(&repo_path),
        env_overrides(detect_ci()),
        cli_overrides(cli),
    )
    .map_err(|e| e.to_string())
}

/// Layer 5: only flags the user actually passed.
fn cli_overrides(cli: &Cli) -> Option<Value> {
    let mut root = Map::new();
    let mut build = Map::new();
    let mut cache = Map::new();
    let mut logging = Map::new();

    if let Some(dir) = &cli.base_dir {
        root.insert("base_dir".to_string(), json!(dir));
    }
    if cli.ci {
        root.insert("ci".to_string(), json!(true));
    }
    if let Some(dir) = &cli.cache_dir {
        cache.insert("dir".to_string(), json!(dir));
    }
    if let Some(max) = cli.max_cache_bytes {
        cache.insert("max_bytes".to_string(), json!(max));
    }
    if let Commands::Build {
        no_parallel,
        summary,
        ..
    } = &cli.command
    {
        if *no_parallel {
            build.insert("parallel".to_string(), json!(false));
        }
        if let Some(path) = summary {
            logging.insert("summary".to_string(), json!(path));
        }
    }

    for (key, section) in [("build", build), ("cache", cache), ("logging", logging)] {
        if !section.is_empty() {
            root.insert(key.to_string(), Value::Object(section));
        }
    }
    (!root.is_empty()).then_some(Value::Object(root))
}

fn fail(code: ExitCode, message: &str) -> ! {
    eprintln!("{}: {}", code.description(), message);
    process::exit(code.code());
}
