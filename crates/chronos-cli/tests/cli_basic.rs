//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own empty home directory,
//! so config, cache and saved state never leak between tests.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_chronos"))
        .args(args)
        .env("HOME", home)
        .env_remove("CHRONOS_ENV")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// The last pretty-printed JSON object in the output.
fn last_json(stdout: &str) -> serde_json::Value {
    let start = stdout.rfind("\n{").map(|i| i + 1).unwrap_or(0);
    serde_json::from_str(&stdout[start..]).expect("stdout ends with a JSON object")
}

#[test]
fn test_timer_status_fresh_install() {
    let home = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(home.path(), &["timer", "status"]);
    assert_eq!(code, 0, "timer status failed: {stderr}");

    let snapshot = last_json(&stdout);
    assert_eq!(snapshot["type"], "StateSnapshot");
    assert_eq!(snapshot["state"], "idle");
    assert_eq!(snapshot["display"], "25:00");
    assert_eq!(snapshot["completed_sessions"], 0);
}

#[test]
fn test_task_add_then_list() {
    let home = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(home.path(), &["task", "add", "write", "report"]);
    assert_eq!(code, 0, "task add failed: {stderr}");
    assert!(stdout.contains("TaskAdded"));

    let (stdout, _, code) = run_cli(home.path(), &["task", "list", "--json"]);
    assert_eq!(code, 0);
    let tasks: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let tasks = tasks.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["text"], "write report");
    assert_eq!(tasks[0]["completed"], false);
}

#[test]
fn test_task_add_empty_text_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["task", "add", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("empty"));
}

#[test]
fn test_task_toggle_unknown_id_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["task", "toggle", "42"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("task not found: 42"));
}

#[test]
fn test_task_list_empty_message() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["task", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No tasks yet"));
}

#[test]
fn test_settings_set_focus_changes_countdown() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["settings", "set", "focus", "30"]);
    assert_eq!(code, 0, "settings set failed: {stderr}");

    let (stdout, _, code) = run_cli(home.path(), &["settings", "show"]);
    assert_eq!(code, 0);
    let settings: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(settings["focus"], 1800);

    let (stdout, _, _) = run_cli(home.path(), &["timer", "status"]);
    assert_eq!(last_json(&stdout)["display"], "30:00");
}

#[test]
fn test_settings_rejects_out_of_range() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["settings", "set", "focus", "0"]);
    assert_eq!(code, 1);
}

#[test]
fn test_timer_start_then_pause() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["timer", "start"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("TimerStarted"));

    let (stdout, _, code) = run_cli(home.path(), &["timer", "pause"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("TimerPaused"));
    assert_eq!(last_json(&stdout)["state"], "paused");
}

#[test]
fn test_config_get_set_and_path() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "timer.long_break_interval"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "4");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "timer.long_break_interval", "3"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "timer.long_break_interval"]);
    assert_eq!(stdout.trim(), "3");

    let (stdout, _, code) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
    assert!(stdout.contains(home.path().to_str().unwrap()));
}

#[test]
fn test_config_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_auth_login_without_remote_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["auth", "login", "a@b.co", "--password", "secret1"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("remote sync is not configured"));
}

#[test]
fn test_sync_status_local_only() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["sync", "status"]);
    assert_eq!(code, 0);
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["signedIn"], false);
    assert_eq!(status["status"], "idle");
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("chronos"));
}
