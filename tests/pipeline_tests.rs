//! Pipeline Tests
//!
//! End-to-end runs of the build-then-prune sequence against a shell script
//! standing in for SCons.

#![cfg(unix)]

mod fixtures;

use std::fs;
use std::time::{Duration, Instant};

use buildwatch::logging::LogFile;
use buildwatch::pipeline::{BuildOptions, Pipeline, PipelineError, PipelineOutcome, STARTING_STATUS};
use buildwatch::runner::{BuildOutcome, BuildRunner};
use buildwatch::summary::ExitCode;
use serde_json::{json, Value};

use fixtures::{BrokenWindow, RecordingSink, RecordingWindow, Workspace};

const PROGRESS_SCRIPT: &str = r#"
echo "scons: Reading SConscript files ..."
echo "progress: 1" >&2
echo "progress: 2" >&2
echo "warning: unused variable" >&2
echo "progress: 3" >&2
exit 0
"#;

const FAILING_SCRIPT: &str = r#"
echo "progress: 1" >&2
echo "scons: building targets" >&2
echo "common/params.cc:12: error: expected ';'" >&2
echo "progress: 2" >&2
echo "scons: *** [x] Source 'foo.h' not found, needed by target 'x'" >&2
echo "" >&2
exit 2
"#;

// =============================================================================
// Successful builds
// =============================================================================

#[test]
fn test_successful_build_reports_progress_and_prunes() {
    let ws = Workspace::new();
    let script = ws.write_script(PROGRESS_SCRIPT);
    let oldest = ws.cache_file("a/oldest", 1000, 300);
    let older = ws.cache_file("b/older", 1000, 200);
    let newest = ws.cache_file("c/newest", 1000, 100);

    let settings = ws.settings(&script, json!({ "cache": { "max_bytes": 1500 } }));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let mut sink = RecordingSink::default();
    let mut window = RecordingWindow::default();

    let outcome = pipeline
        .run_build(&BuildOptions::default(), &mut sink, &mut window)
        .unwrap();

    let PipelineOutcome::Built { stats, prune } = outcome else {
        panic!("expected a successful build");
    };
    assert_eq!(stats.exit_code, Some(0));
    assert_eq!(stats.nodes_completed, Some(3));
    assert_eq!(stats.total_nodes, 2405);

    assert_eq!(sink.updates.first().map(String::as_str), Some(STARTING_STATUS));
    assert!(sink
        .updates
        .iter()
        .any(|u| u.starts_with("Elapsed: 00:0") && u.contains("Nodes: 3 / 2405")));
    assert_eq!(sink.echoed, vec!["warning: unused variable"]);
    assert!(sink.closed);
    assert!(window.shown.is_empty());

    let prune = prune.unwrap();
    assert_eq!(prune.scanned, 3);
    assert_eq!(prune.deleted, 2);
    assert_eq!(prune.remaining_bytes, 1000);
    assert!(!oldest.exists());
    assert!(!older.exists());
    assert!(newest.exists());

    // Nothing failed, so the log file was never opened
    assert!(!log_file.is_attached());
    assert!(!ws.log_path().exists());
}

#[test]
fn test_no_prune_option_leaves_cache() {
    let ws = Workspace::new();
    let script = ws.write_script("exit 0");
    let entry = ws.cache_file("entry", 1000, 10);

    let settings = ws.settings(&script, json!({ "cache": { "max_bytes": 1 } }));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let options = BuildOptions {
        prune: false,
        ..BuildOptions::default()
    };

    let outcome = pipeline
        .run_build(&options, &mut RecordingSink::default(), &mut RecordingWindow::default())
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Built { prune: None, .. }));
    assert!(entry.exists());
}

#[test]
fn test_invocation_args_env_and_cwd() {
    let ws = Workspace::new();
    let script = ws.write_script(
        r#"
echo "$@" > invocation.txt
echo "$SCONS_PROGRESS" >> invocation.txt
"#,
    );

    let settings = ws.settings(&script, json!({}));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let options = BuildOptions {
        extra_args: vec!["--minimal".to_string(), "selfdrive/".to_string()],
        ..BuildOptions::default()
    };

    pipeline
        .run_build(&options, &mut RecordingSink::default(), &mut RecordingWindow::default())
        .unwrap();

    let recorded = fs::read_to_string(ws.base_dir().join("invocation.txt")).unwrap();
    let lines: Vec<&str> = recorded.lines().collect();
    assert_eq!(lines, vec!["--cache-populate --minimal selfdrive/", "1"]);
}

// =============================================================================
// Failed builds
// =============================================================================

#[test]
fn test_failed_build_shows_filtered_errors() {
    let ws = Workspace::new();
    let script = ws.write_script(FAILING_SCRIPT);
    let entry = ws.cache_file("entry", 1000, 10);

    let settings = ws.settings(&script, json!({ "cache": { "max_bytes": 1 } }));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let mut sink = RecordingSink::default();
    let mut window = RecordingWindow::default();

    let outcome = pipeline
        .run_build(&BuildOptions::default(), &mut sink, &mut window)
        .unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::BuildFailed);
    let PipelineOutcome::BuildFailed(report) = outcome else {
        panic!("expected a failed build");
    };
    assert_eq!(report.stats.exit_code, Some(2));
    assert_eq!(report.stats.nodes_completed, Some(2));
    assert_eq!(
        report.errors,
        vec![
            "common/params.cc:12: error: expected ';'".to_string(),
            "scons: *** [x] Source 'foo.h' not found, needed by target 'x'".to_string(),
        ]
    );
    assert!(report.errors.iter().all(|e| !e.starts_with("progress: ")));

    assert!(sink.closed);
    assert_eq!(window.shown.len(), 1);
    assert!(window.shown[0].starts_with("build failed\n \n"));
    assert!(window.shown[0].contains("error: expected ';'"));

    // Failure opens the persistent log; the cache is left alone
    assert!(log_file.is_attached());
    assert!(ws.log_path().exists());
    assert!(entry.exists());
}

#[test]
fn test_failed_build_in_ci_skips_window() {
    let ws = Workspace::new();
    let script = ws.write_script(FAILING_SCRIPT);

    let settings = ws.settings(&script, json!({ "ci": true }));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let mut sink = RecordingSink::default();
    let mut window = RecordingWindow::default();

    let outcome = pipeline
        .run_build(&BuildOptions::default(), &mut sink, &mut window)
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::BuildFailed(_)));
    assert!(sink.closed);
    assert!(window.shown.is_empty());
}

#[test]
fn test_unusable_failure_window_still_reports_build_failure() {
    let ws = Workspace::new();
    let script = ws.write_script(
        r#"
echo "a.c:1: error: x" >&2
exit 2
"#,
    );
    let summary_path = ws.temp.path().join("build_summary.json");

    let settings = ws.settings(&script, json!({ "logging": { "summary": summary_path } }));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let mut sink = RecordingSink::default();
    let mut window = BrokenWindow::default();

    let outcome = pipeline
        .run_build(&BuildOptions::default(), &mut sink, &mut window)
        .unwrap();

    assert_eq!(window.attempts, 1);
    assert_eq!(outcome.exit_code(), ExitCode::BuildFailed);
    assert!(sink.closed);
    assert!(log_file.is_attached());

    let summary: Value = serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["status"], "failed");
    assert_eq!(summary["exit_code"], 1);
    assert_eq!(summary["errors"], json!(["a.c:1: error: x"]));
}

#[test]
fn test_missing_build_tool_is_runner_error() {
    let ws = Workspace::new();
    let script = ws.write_script("exit 0");

    let settings = ws.settings(
        &script,
        json!({ "build": { "command": "/nonexistent/bin/scons" } }),
    );
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);

    let err = pipeline
        .run_build(
            &BuildOptions::default(),
            &mut RecordingSink::default(),
            &mut RecordingWindow::default(),
        )
        .unwrap_err();

    assert!(matches!(err, PipelineError::Runner(_)));
    assert_eq!(err.exit_code().code(), 3);
}

// =============================================================================
// Pipe draining
// =============================================================================

#[test]
fn test_output_larger_than_pipe_buffers_is_drained() {
    let ws = Workspace::new();
    // Roughly 350 KiB on each pipe, far past the 64 KiB kernel buffer
    let script = ws.write_script(
        r#"
i=0
while [ $i -lt 20000 ]; do
  echo "stdout line $i"
  echo "progress: $i" >&2
  i=$((i + 1))
done
"#,
    );

    let settings = ws.settings(&script, json!({}));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let mut sink = RecordingSink::default();
    let options = BuildOptions {
        prune: false,
        ..BuildOptions::default()
    };

    let outcome = pipeline
        .run_build(&options, &mut sink, &mut RecordingWindow::default())
        .unwrap();

    let PipelineOutcome::Built { stats, .. } = outcome else {
        panic!("expected a successful build");
    };
    assert_eq!(stats.exit_code, Some(0));
    assert_eq!(stats.nodes_completed, Some(19999));
    assert_eq!(stats.output_lines, 0);
    // "Build starting..." plus one update per marker
    assert_eq!(sink.updates.len(), 20001);
    assert!(sink.updates.last().unwrap().contains("Nodes: 19999 / 2405"));
    assert!(sink.echoed.is_empty());
}

#[test]
fn test_grandchild_holding_pipes_does_not_hang_runner() {
    let ws = Workspace::new();
    let script = ws.write_script(
        r#"
sleep 5 &
echo "progress: 7" >&2
exit 0
"#,
    );

    let settings = ws.settings(&script, json!({}));
    let runner = BuildRunner::from_settings(&settings, &[]).with_drain_grace(Duration::from_millis(200));
    let mut sink = RecordingSink::default();

    let started = Instant::now();
    let outcome = runner.run(false, &mut sink).unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    let BuildOutcome::Succeeded(stats) = outcome else {
        panic!("expected a successful build");
    };
    assert_eq!(stats.exit_code, Some(0));
    assert_eq!(stats.nodes_completed, Some(7));
}

// =============================================================================
// Prebuilt trees and summaries
// =============================================================================

#[test]
fn test_prebuilt_tree_skips_build_and_prune() {
    let ws = Workspace::new();
    let script = ws.write_script("touch ran.txt");
    fs::write(ws.base_dir().join("prebuilt"), "").unwrap();
    let entry = ws.cache_file("entry", 1000, 10);

    let settings = ws.settings(&script, json!({ "cache": { "max_bytes": 1 } }));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let mut sink = RecordingSink::default();

    let outcome = pipeline
        .run_build(&BuildOptions::default(), &mut sink, &mut RecordingWindow::default())
        .unwrap();

    assert_eq!(outcome, PipelineOutcome::Prebuilt);
    assert_eq!(outcome.exit_code(), ExitCode::Success);
    assert!(!ws.base_dir().join("ran.txt").exists());
    assert!(sink.updates.is_empty());
    assert!(entry.exists());
}

#[test]
fn test_summary_written_for_successful_build() {
    let ws = Workspace::new();
    let script = ws.write_script(PROGRESS_SCRIPT);
    ws.cache_file("entry", 10, 10);
    let summary_path = ws.temp.path().join("out").join("build_summary.json");

    let settings = ws.settings(&script, json!({ "logging": { "summary": summary_path } }));
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);
    let options = BuildOptions {
        dirty: true,
        ..BuildOptions::default()
    };

    pipeline
        .run_build(&options, &mut RecordingSink::default(), &mut RecordingWindow::default())
        .unwrap();

    let summary: Value = serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["schema_id"], "buildwatch/summary@1");
    assert_eq!(summary["status"], "success");
    assert_eq!(summary["exit_code"], 0);
    assert_eq!(summary["dirty"], true);
    assert_eq!(summary["run_id"].as_str().unwrap().len(), 26);
    assert_eq!(summary["build"]["nodes_completed"], 3);
    assert_eq!(summary["prune"]["deleted"], 0);
    assert!(summary["command"].as_str().unwrap().ends_with("--cache-populate"));
}

#[test]
fn test_summary_records_errors_for_failed_build() {
    let ws = Workspace::new();
    let script = ws.write_script(FAILING_SCRIPT);
    let summary_path = ws.temp.path().join("build_summary.json");

    let settings = ws.settings(
        &script,
        json!({ "ci": true, "logging": { "summary": summary_path } }),
    );
    let log_file = LogFile::new(ws.log_path());
    let pipeline = Pipeline::new(&settings, Vec::new(), &log_file);

    pipeline
        .run_build(
            &BuildOptions::default(),
            &mut RecordingSink::default(),
            &mut RecordingWindow::default(),
        )
        .unwrap();

    let summary: Value = serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
    assert_eq!(summary["status"], "failed");
    assert_eq!(summary["exit_code"], 1);
    assert_eq!(summary["errors"].as_array().unwrap().len(), 2);
    assert!(summary.get("prune").is_none());
}
