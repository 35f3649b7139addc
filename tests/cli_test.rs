#![allow(deprecated)]

//! Command-line integration tests
//!
//! These run the built binary against a temporary snapshot file. None of
//! the commands exercised here contact a collaborator.
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

mod common;

fn blobpilot(store: &Path) -> Command {
    let mut cmd = Command::cargo_bin("blobpilot").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(store.with_file_name("missing-config.yaml"))
        .arg("--store")
        .arg(store);
    cmd
}

fn connect(store: &Path) -> String {
    let output = blobpilot(store)
        .arg("connect")
        .arg("--private-key")
        .arg(common::TEST_KEY)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Session: "))
        .expect("session id in output")
        .trim()
        .to_string()
}

#[test]
fn test_connect_rejects_invalid_key() {
    let dir = TempDir::new().unwrap();
    blobpilot(&dir.path().join("sessions.json"))
        .arg("connect")
        .arg("--private-key")
        .arg("zz")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));
}

#[test]
fn test_list_unknown_session_fails() {
    let dir = TempDir::new().unwrap();
    blobpilot(&dir.path().join("sessions.json"))
        .arg("list")
        .arg("--session")
        .arg("deadbeef")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session not found"));
}

#[test]
fn test_connect_import_list_disconnect() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("sessions.json");
    let session = connect(&store);
    assert_eq!(session.len(), 32);

    blobpilot(&store)
        .args(["import", "--session", &session, "docs/a.txt", "b.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 blob(s)."));

    blobpilot(&store)
        .args(["list", "--session", &session, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 2"))
        .stdout(predicate::str::contains("\"docs\""))
        .stdout(predicate::str::contains("\"root\""));

    blobpilot(&store)
        .args(["disconnect", "--session", &session])
        .assert()
        .success();

    blobpilot(&store)
        .args(["list", "--session", &session])
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_temp_dir, config_path) =
        common::temp_config_file("ledger:\n  confirmation_timeout_seconds: 0\n");
    let dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("blobpilot").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .arg("--store")
        .arg(dir.path().join("sessions.json"))
        .args(["list", "--session", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}

#[test]
fn test_upload_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    blobpilot(&dir.path().join("sessions.json"))
        .args(["upload", "--session", "x", "--mode", "video"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown content mode"));
}

#[test]
fn test_invalid_env_override_is_reported() {
    let dir = TempDir::new().unwrap();
    blobpilot(&dir.path().join("sessions.json"))
        .env("BLOBPILOT_DELAY_MS", "soon")
        .args(["list", "--session", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid BLOBPILOT_DELAY_MS: soon"));
}
