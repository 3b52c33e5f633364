use predicates::prelude::*;
use tempfile::TempDir;

use super::{create_vault, timevault_cmd};

fn json_error(output: std::process::Output) -> serde_json::Value {
    assert!(!output.status.success());
    serde_json::from_slice(&output.stderr).unwrap()
}

#[test]
fn test_delay_out_of_range() {
    let home = TempDir::new().unwrap();
    for delay in ["0", "1576800001"] {
        timevault_cmd(&home)
            .args(["create", "--title", "t", "--delay", delay])
            .write_stdin("x")
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("Validation failed"));
    }
    timevault_cmd(&home)
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("No vaults."));
}

#[test]
fn test_unparseable_delay() {
    let home = TempDir::new().unwrap();
    timevault_cmd(&home)
        .args(["create", "--title", "t", "--delay", "soon"])
        .write_stdin("x")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_blank_title_rejected() {
    let home = TempDir::new().unwrap();
    timevault_cmd(&home)
        .args(["create", "--title", "   ", "--delay", "10"])
        .write_stdin("x")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_malformed_id() {
    let home = TempDir::new().unwrap();
    timevault_cmd(&home)
        .args(["show", "not-a-uuid"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_json_error_sealed() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "t", "x", "1h");
    let v = json_error(
        timevault_cmd(&home)
            .args(["get", &id, "--json"])
            .output()
            .unwrap(),
    );
    assert_eq!(v["error"]["code"], "sealed");
    assert_eq!(v["error"]["exit_code"], 7);
    assert_eq!(v["error"]["transient"], false);
}

#[test]
fn test_json_error_unauthorized() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "t", "x", "1h");
    let v = json_error(
        timevault_cmd(&home)
            .args(["--owner", "mallory", "hide", &id, "--json"])
            .output()
            .unwrap(),
    );
    assert_eq!(v["error"]["code"], "unauthorized");
    assert_eq!(v["error"]["exit_code"], 4);
    assert!(!v["error"]["message"].as_str().unwrap().contains(&id));
}

#[test]
fn test_json_error_not_found() {
    let home = TempDir::new().unwrap();
    let v = json_error(
        timevault_cmd(&home)
            .args(["delete", "7f1d8c4e-2f5a-4c3b-9a77-0c2b6a1d9e10", "--json"])
            .output()
            .unwrap(),
    );
    assert_eq!(v["error"]["code"], "not_found");
    assert_eq!(v["error"]["exit_code"], 3);
}
