//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Each test
//! points HOME at its own temp directory so no real state is touched.

use std::path::Path;
use std::process::Command;

/// Run a CLI command against an isolated home directory.
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "chronofocus-cli", "--quiet", "--"])
        .args(args)
        .env("HOME", home)
        .env("CHRONOFOCUS_ENV", "dev")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn monsters_list_prints_the_catalog() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _stderr, code) = run_cli(home.path(), &["monsters", "list"]);
    assert_eq!(code, 0);

    let monsters: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = monsters
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["id"].as_str())
        .collect();
    assert!(ids.contains(&"scrollfiend"));
    assert!(ids.contains(&"tabberwock"));
}

#[test]
fn status_is_idle_before_any_session() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _stderr, code) = run_cli(home.path(), &["session", "status"]);
    assert_eq!(code, 0);

    let state: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(state["status"], "idle");
}

#[test]
fn start_status_end_round_trip() {
    let home = tempfile::tempdir().unwrap();

    // A wide window keeps the session alive across slow cargo invocations.
    let (stdout, _stderr, code) = run_cli(
        home.path(),
        &["session", "start", "testgremlin", "--duration", "600"],
    );
    assert_eq!(code, 0);
    let started: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(started["type"], "SessionStarted");
    assert_eq!(started["session"]["monster_id"], "testgremlin");
    assert_eq!(started["session"]["current_hp"], 10);

    let (stdout, _stderr, code) = run_cli(home.path(), &["session", "status"]);
    assert_eq!(code, 0);
    let state: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(state["status"], "active");

    let (stdout, _stderr, code) = run_cli(home.path(), &["session", "end"]);
    assert_eq!(code, 0);
    let resolved: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(resolved["type"], "SessionResolved");
    assert_eq!(resolved["outcome"]["result"], "abandoned");
    assert_eq!(resolved["outcome"]["xp_earned"], 0);
}

#[test]
fn unknown_monster_fails_cleanly() {
    let home = tempfile::tempdir().unwrap();
    let (_stdout, stderr, code) = run_cli(home.path(), &["session", "start", "grue"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Unknown monster id"));
}

#[test]
fn stats_show_reports_defaults() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _stderr, code) = run_cli(home.path(), &["stats", "show"]);
    assert_eq!(code, 0);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["level"], 1);
    assert_eq!(report["stats"]["current_xp"], 0);
    assert_eq!(report["today_pomodoros"], 0);
}
