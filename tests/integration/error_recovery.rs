//! Error Recovery Integration Tests
//!
//! Runs the binary the way a user would and checks that bad input is
//! reported cleanly while everything that still works keeps working.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn vassist(base_dir: &Path, args: &[&str]) -> Output {
    // An empty config file keeps the user's own configuration out of the run
    let config = base_dir.join("empty.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }

    Command::new(env!("CARGO_BIN_EXE_vassist"))
        .arg("--config-file")
        .arg(&config)
        .arg("--base-dir")
        .arg(base_dir)
        .arg("--no-color")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to run vassist")
}

fn initialized() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let output = vassist(temp_dir.path(), &["--init"]);
    assert!(output.status.success(), "init failed: {}", String::from_utf8_lossy(&output.stderr));
    temp_dir
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("broken.toml");
    fs::write(&config, "[assistant\nrun-mode = ").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_vassist"))
        .arg("--config-file")
        .arg(&config)
        .args(["-c", "ping"])
        .output()
        .expect("Failed to run vassist");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("Error:"));
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_vassist"))
        .arg("--config-file")
        .arg(temp_dir.path().join("absent.toml"))
        .args(["-c", "ping"])
        .output()
        .expect("Failed to run vassist");

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_conflicting_flags_are_rejected() {
    let temp_dir = TempDir::new().unwrap();

    let output = vassist(temp_dir.path(), &["--verbose", "--quiet", "-c", "ping"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error:"));

    let output = vassist(temp_dir.path(), &["-c", "ping", "--run-mode", "interactive"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unknown_start_version() {
    let temp_dir = initialized();

    let output = vassist(temp_dir.path(), &["--use-version", "v9", "-c", "ping"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unknown version 'v9'"));
    assert!(!stdout(&output).contains("Pong"));
}

#[test]
fn test_known_start_version() {
    let temp_dir = initialized();

    let output = vassist(temp_dir.path(), &["--use-version", "audit", "-c", "version current"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Current version: audit"));
}

#[test]
fn test_broken_plugin_file_does_not_stop_the_others() {
    let temp_dir = initialized();
    fs::write(temp_dir.path().join("plugins/broken.yaml"), "name: [unterminated\n").unwrap();
    fs::write(
        temp_dir.path().join("plugins/ghost.yaml"),
        "name: ghost\nentry_point: nothing-by-this-name\n",
    )
    .unwrap();

    let output = vassist(temp_dir.path(), &["-c", "ping", "-c", "calc 2 + 3"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Pong! (#1)"));
    assert!(out.contains("2 + 3 = 5"));

    let err = stderr(&output);
    assert!(err.contains("broken.yaml"));
    assert!(err.contains("ghost.yaml"));
}

#[test]
fn test_plugin_path_that_is_a_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("plugins"), "not a folder").unwrap();

    let output = vassist(temp_dir.path(), &["-c", "ping"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to scan plugin folder"));
}

#[test]
fn test_missing_plugin_folder_is_created() {
    let temp_dir = TempDir::new().unwrap();

    let output = vassist(temp_dir.path(), &["-c", "ping"]);
    assert!(output.status.success());
    assert!(temp_dir.path().join("plugins").is_dir());
    // no plugins, so nothing answers
    assert!(stdout(&output).contains("Sorry, I don't understand that command."));
}

#[test]
fn test_handler_error_sets_exit_code() {
    let temp_dir = initialized();

    let output = vassist(temp_dir.path(), &["-c", "calc 1 / 0", "-c", "ping"]);
    assert_eq!(output.status.code(), Some(2));

    let out = stdout(&output);
    assert!(out.contains("Error: Handler 'calculator' failed"));
    assert!(out.contains("division by zero"));
    // the next command still runs
    assert!(out.contains("Pong! (#1)"));
}

#[test]
fn test_unknown_command_is_not_an_error() {
    let temp_dir = initialized();

    let output = vassist(temp_dir.path(), &["-c", "sing a song"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Sorry, I don't understand that command."));
}

fn batch_over_stdin(base_dir: &Path, input: &[u8]) -> Output {
    let config = base_dir.join("empty.toml");

    let mut child = Command::new(env!("CARGO_BIN_EXE_vassist"))
        .arg("--config-file")
        .arg(&config)
        .arg("--base-dir")
        .arg(base_dir)
        .args(["--no-color", "--run-mode", "batch"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run vassist");

    child.stdin.take().unwrap().write_all(input).unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_batch_mode_stops_at_exit_token() {
    let temp_dir = initialized();

    let output = batch_over_stdin(temp_dir.path(), "ping\nthoát\nping\n".as_bytes());

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Pong! (#1)"));
    assert!(out.contains("Goodbye!"));
    assert!(!out.contains("Pong! (#2)"));
}

#[test]
fn test_batch_mode_survives_invalid_utf8() {
    let temp_dir = initialized();

    let output = batch_over_stdin(temp_dir.path(), b"ping\n\xff\xfe garbled\nping\n");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Pong! (#1)"));
    assert!(out.contains("Pong! (#2)"));
}

#[test]
fn test_unknown_strategy_request_falls_back() {
    let temp_dir = initialized();

    let output = vassist(temp_dir.path(), &["--version-manager", "quantum", "--core", "nope", "-c", "ping"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Pong! (#1)"));
}
