use std::thread;
use std::time::Duration;

use predicates::prelude::*;
use tempfile::TempDir;

use super::{create_vault, timevault_cmd};

#[test]
fn test_create_and_list() {
    let home = TempDir::new().unwrap();
    let older = create_vault(&home, "wifi", "hunter2", "1h");
    let newer = create_vault(&home, "bank", "0000", "7d");

    let output = timevault_cmd(&home).arg("list").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(&newer));
    assert!(lines[1].starts_with(&older));
    assert!(stdout.contains("secured"));
    assert!(!stdout.contains("hunter2"));
}

#[test]
fn test_secret_sealed_until_revealed() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "wifi", "hunter2", "1h");

    timevault_cmd(&home)
        .args(["get", &id])
        .assert()
        .failure()
        .code(7)
        .stdout(predicate::str::contains("hunter2").not())
        .stderr(predicate::str::contains("sealed"));
}

#[test]
fn test_reveal_starts_countdown_once() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "wifi", "hunter2", "1h");

    timevault_cmd(&home)
        .args(["reveal", &id])
        .assert()
        .success()
        .stderr(predicate::str::contains("Countdown started"));

    timevault_cmd(&home)
        .args(["reveal", &id])
        .assert()
        .success()
        .stderr(predicate::str::contains("already running"));

    timevault_cmd(&home)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("revealing"))
        .stdout(predicate::str::contains("requested:"));
}

#[test]
fn test_full_reveal_cycle() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "pin", "1234\n", "1");

    timevault_cmd(&home).args(["reveal", &id]).assert().success();
    thread::sleep(Duration::from_millis(1200));

    timevault_cmd(&home)
        .args(["get", &id])
        .assert()
        .success()
        .stdout("1234");

    timevault_cmd(&home)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("revealed"));

    timevault_cmd(&home)
        .args(["hide", &id])
        .assert()
        .success()
        .stderr(predicate::str::contains("secured"));

    timevault_cmd(&home)
        .args(["get", &id])
        .assert()
        .failure()
        .code(7);
}

#[test]
fn test_watch_follows_countdown_to_reveal() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "pin", "1234", "1");
    timevault_cmd(&home).args(["reveal", &id]).assert().success();

    timevault_cmd(&home)
        .args(["watch", &id])
        .timeout(Duration::from_secs(15))
        .assert()
        .success()
        .stdout(predicate::str::contains("revealed"));
}

#[test]
fn test_watch_without_countdown_exits() {
    let home = TempDir::new().unwrap();
    create_vault(&home, "idle", "x", "1h");

    timevault_cmd(&home)
        .arg("watch")
        .timeout(Duration::from_secs(15))
        .assert()
        .success()
        .stderr(predicate::str::contains("No countdown running."));
}

#[test]
fn test_delete_removes_vault() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "gone", "x", "1h");
    timevault_cmd(&home).args(["reveal", &id]).assert().success();

    timevault_cmd(&home)
        .args(["delete", &id])
        .assert()
        .success()
        .stderr(predicate::str::contains("deleted"));

    timevault_cmd(&home)
        .args(["show", &id])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Vault not found"));
}

#[test]
fn test_owners_are_isolated() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "alice's", "x", "1");

    timevault_cmd(&home)
        .args(["--owner", "bob", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()).not());

    timevault_cmd(&home)
        .args(["--owner", "bob", "reveal", &id])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Access denied"))
        .stderr(predicate::str::contains(id.as_str()).not());
}
