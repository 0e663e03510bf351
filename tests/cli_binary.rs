use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

/// Run the binary with a scratch home so no real config or ~/.arcrc leaks in.
#[allow(deprecated)]
fn cmd(home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("phabwatch").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("PHABRICATOR_API_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

// --- Help & version ---

#[test]
fn help_flag() {
    let home = tempfile::tempdir().unwrap();
    cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--poll-seconds"))
        .stdout(predicate::str::contains("whoami"));
}

#[test]
fn version_flag() {
    let home = tempfile::tempdir().unwrap();
    cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("phabwatch"));
}

#[test]
fn list_help() {
    let home = tempfile::tempdir().unwrap();
    cmd(&home)
        .args(["list", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"));
}

// --- Configuration errors (no network involved) ---

#[test]
fn missing_url_is_reported() {
    let home = tempfile::tempdir().unwrap();
    cmd(&home)
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no Phabricator URL configured"));
}

#[test]
fn missing_token_is_reported() {
    let home = tempfile::tempdir().unwrap();
    cmd(&home)
        .args(["--once", "--url", "https://phab.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API token not found"));
}

#[test]
fn explicit_missing_config_is_reported() {
    let home = tempfile::tempdir().unwrap();
    let missing = home.path().join("nope.toml");
    cmd(&home)
        .args(["--once", "--config", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn invalid_default_config_is_reported() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join(".config").join("phabwatch");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "refresh_interval = 0\n").unwrap();
    cmd(&home)
        .arg("--once")
        .assert()
        .failure()
        .stderr(predicate::str::contains("refresh_interval must be > 0"));
}

#[test]
fn unknown_config_key_is_reported() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("phabwatch.toml");
    fs::write(&path, "poll_interval = 30\n").unwrap();
    cmd(&home)
        .args(["--once", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field"));
}
