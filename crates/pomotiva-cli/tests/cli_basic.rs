//! Basic CLI E2E tests.
//!
//! Each test invokes the built binary against its own temporary data
//! directory, so nothing touches the real `~/.config/pomotiva`.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

fn pomotiva(data_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pomotiva"));
    cmd.env("POMOTIVA_DATA_DIR", data_dir)
        .env_remove("POMOTIVA_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = pomotiva(data_dir)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("stdout is not JSON")
}

#[test]
fn test_config_defaults_and_set() {
    let dir = tempfile::tempdir().unwrap();

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "durations.work"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "25");
    assert!(dir.path().join("config.toml").exists());

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "durations.work", "45"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "durations.work"]);
    assert_eq!(stdout.trim(), "45");

    let list = run_json(dir.path(), &["config", "list"]);
    assert_eq!(list["durations"]["work"], 45);
    assert_eq!(list["notifications"]["enabled"], true);
}

#[test]
fn test_config_errors_exit_nonzero() {
    let dir = tempfile::tempdir().unwrap();

    let (_, stderr, code) = run_cli(dir.path(), &["config", "get", "durations.nap"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "durations.work", "soon"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("durations.work"));
}

#[test]
fn test_config_reset() {
    let dir = tempfile::tempdir().unwrap();
    run_cli(dir.path(), &["config", "set", "durations.long_break", "30"]);
    let (_, _, code) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "durations.long_break"]);
    assert_eq!(stdout.trim(), "15");
}

#[test]
fn test_preset_apply_and_list() {
    let dir = tempfile::tempdir().unwrap();

    let (stdout, _, code) = run_cli(dir.path(), &["preset", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("* standard (25/5/15 min)"));
    assert!(stdout.contains("immersion"));

    let (_, _, code) = run_cli(dir.path(), &["preset", "apply", "focus"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "durations.short_break"]);
    assert_eq!(stdout.trim(), "15");

    let (_, _, code) = run_cli(dir.path(), &["preset", "custom", "--work", "30", "--short", "0"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "durations.short_break"]);
    assert_eq!(stdout.trim(), "1");

    let (_, _, code) = run_cli(dir.path(), &["preset", "apply", "turbo"]);
    assert_ne!(code, 0);
}

#[test]
fn test_stats_start_empty() {
    let dir = tempfile::tempdir().unwrap();
    let today = run_json(dir.path(), &["stats", "today"]);
    assert_eq!(today["cycles"], 0);
    assert_eq!(today["focus_ms"], 0);

    let day = run_json(dir.path(), &["stats", "day", "2024-02-29"]);
    assert_eq!(day["day"], "2024-02-29");

    let sessions = run_json(dir.path(), &["stats", "sessions"]);
    assert_eq!(sessions.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_goals_set_and_progress() {
    let dir = tempfile::tempdir().unwrap();

    let goals = run_json(dir.path(), &["goals", "show"]);
    assert_eq!(goals["daily_cycles_target"], 0);
    assert_eq!(goals["daily_focus_ms_target"], 1_500_000);

    let goals = run_json(dir.path(), &["goals", "set", "--cycles", "4", "--focus-min", "100"]);
    assert_eq!(goals["daily_cycles_target"], 4);
    assert_eq!(goals["daily_focus_ms_target"], 6_000_000);

    let progress = run_json(dir.path(), &["stats", "progress"]);
    assert_eq!(progress["cycles_target"], 4);
    assert_eq!(progress["cycles_met"], false);

    let (_, _, code) = run_cli(dir.path(), &["goals", "set"]);
    assert_eq!(code, 1);
}

#[test]
fn test_period_tasks() {
    let dir = tempfile::tempdir().unwrap();

    let (stdout, _, code) = run_cli(dir.path(), &["period", "add-task", "weekly", "write report"]);
    assert_eq!(code, 0);
    let key = stdout.trim().to_string();
    assert!(!key.is_empty());

    run_cli(dir.path(), &["period", "set-cycles", "weekly", "20"]);
    let (_, _, code) = run_cli(dir.path(), &["period", "update-task", "weekly", &key, "ship report"]);
    assert_eq!(code, 0);

    let goal = run_json(dir.path(), &["period", "show", "weekly"]);
    assert_eq!(goal["cycles_target"], 20);
    assert_eq!(goal["tasks"][0]["text"], "ship report");
    assert!(goal["created_at"].is_string());

    let (_, _, code) = run_cli(dir.path(), &["period", "remove-task", "daily", &key]);
    assert_eq!(code, 1);
    let (_, _, code) = run_cli(dir.path(), &["period", "remove-task", "weekly", &key]);
    assert_eq!(code, 0);

    let (_, _, code) = run_cli(dir.path(), &["period", "delete", "weekly"]);
    assert_eq!(code, 0);
    let goal = run_json(dir.path(), &["period", "show", "weekly"]);
    assert_eq!(goal["cycles_target"], 0);
    assert!(goal["created_at"].is_null());

    let (_, _, code) = run_cli(dir.path(), &["period", "show", "fortnightly"]);
    assert_ne!(code, 0);
}

#[test]
fn test_run_skipping_work_counts_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = pomotiva(dir.path())
        .args(["run", "--no-notify", "--preset", "beginner"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"start\nbogus\nnext\nquit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(0), "stderr: {stderr}");
    assert!(stderr.contains("unknown command 'bogus'"));
    assert!(stdout.contains("stopped at [SHORT BREAK] 05:00  cycle 1"), "stdout: {stdout}");

    let today = run_json(dir.path(), &["stats", "today"]);
    assert_eq!(today["cycles"], 1);
    assert_eq!(today["focus_ms"], 0);
}
