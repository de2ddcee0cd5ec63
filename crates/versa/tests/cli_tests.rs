//! CLI integration tests.
//!
//! These tests exercise the CLI commands end-to-end.

use std::path::Path;
use std::process::{Command, Output};

fn versa(args: &[&str], config_home: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_versa"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .env_remove("VERSA_CONFIG_CONTENT")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_help_command() {
    let home = tempfile::tempdir().unwrap();
    let output = versa(&["--help"], home.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Content version control"));
    assert!(stdout.contains("request"));
    assert!(stdout.contains("serve"));
}

#[test]
fn test_diff_command() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("old.txt");
    let new = dir.path().join("new.txt");
    std::fs::write(&old, "a\nb\n").unwrap();
    std::fs::write(&new, "a\nc\n").unwrap();

    let output = versa(
        &["diff", old.to_str().unwrap(), new.to_str().unwrap()],
        dir.path(),
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Summary:"));
    assert!(stdout.contains("Modifications: 1"));
}

#[test]
fn test_diff_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("old.json");
    let new = dir.path().join("new.json");
    std::fs::write(&old, r#"{"title": "Hello"}"#).unwrap();
    std::fs::write(&new, r#"{"title": "Hello", "draft": true}"#).unwrap();

    let output = versa(
        &[
            "diff",
            "--format",
            "structured",
            "--json",
            old.to_str().unwrap(),
            new.to_str().unwrap(),
        ],
        dir.path(),
    );

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["format"], "structured");
    assert_eq!(value["stats"]["insertions"], 1);
}

#[test]
fn test_request_roundtrip_through_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let data = data.to_str().unwrap();

    let output = versa(
        &[
            "--data-dir",
            data,
            "request",
            r#"{"action": "create_version", "params": {"content_id": 1, "content": "hello", "user_id": 1}}"#,
        ],
        dir.path(),
    );
    assert!(output.status.success());

    let output = versa(
        &[
            "--data-dir",
            data,
            "request",
            r#"{"action": "get_versions", "params": {"content_id": 1}}"#,
        ],
        dir.path(),
    );
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total"], 1);
}

#[test]
fn test_invalid_action_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let output = versa(&["--memory", "request", r#"{"action": "nope"}"#], dir.path());

    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["message"], "Invalid action");
}

#[test]
fn test_config_command() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("versa.jsonc"),
        "// project settings\n{\"history\": {\"preview_lines\": 5}}",
    )
    .unwrap();

    let output = versa(
        &["--project", dir.path().to_str().unwrap(), "config"],
        dir.path(),
    );

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["history"]["preview_lines"], 5);
}
