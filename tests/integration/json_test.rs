use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use super::{create_vault, timevault_cmd};

fn json_stdout(output: std::process::Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_create_json() {
    let home = TempDir::new().unwrap();
    let output = timevault_cmd(&home)
        .args(["create", "--title", "wifi", "--description", "home", "--delay", "90s", "--json"])
        .write_stdin("hunter2")
        .output()
        .unwrap();
    let v = json_stdout(output);

    assert_eq!(v["title"], "wifi");
    assert_eq!(v["description"], "home");
    assert_eq!(v["delay_seconds"], 90);
    assert_eq!(v["status"], "secured");
    assert_eq!(v["ready"], false);
    assert!(v.get("secret").is_none());
    assert!(v.get("seconds_remaining").is_none());
}

#[test]
fn test_list_json() {
    let home = TempDir::new().unwrap();
    create_vault(&home, "a", "1", "1h");
    create_vault(&home, "b", "2", "1h");

    let v = json_stdout(timevault_cmd(&home).args(["list", "--json"]).output().unwrap());
    let vaults = v["vaults"].as_array().unwrap();
    assert_eq!(vaults.len(), 2);
    assert_eq!(vaults[0]["title"], "b");
    assert_eq!(vaults[1]["title"], "a");
}

#[test]
fn test_reveal_json_reports_started() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "a", "1", "1h");

    let first = json_stdout(
        timevault_cmd(&home)
            .args(["reveal", &id, "--json"])
            .output()
            .unwrap(),
    );
    assert_eq!(first["started"], true);
    assert_eq!(first["status"], "revealing");
    assert!(first["seconds_remaining"].as_u64().unwrap() <= 3600);

    let second = json_stdout(
        timevault_cmd(&home)
            .args(["reveal", &id, "--json"])
            .output()
            .unwrap(),
    );
    assert_eq!(second["started"], false);
    assert_eq!(
        first["reveal_requested_at"],
        second["reveal_requested_at"]
    );
}

#[test]
fn test_get_json_after_reveal() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "pin", "4321", "1");
    timevault_cmd(&home).args(["reveal", &id]).assert().success();
    thread::sleep(Duration::from_millis(1200));

    let v = json_stdout(
        timevault_cmd(&home)
            .args(["get", &id, "--json"])
            .output()
            .unwrap(),
    );
    assert_eq!(v["id"], id.as_str());
    assert_eq!(v["title"], "pin");
    assert_eq!(v["secret"], "4321");
}

#[test]
fn test_delete_json() {
    let home = TempDir::new().unwrap();
    let id = create_vault(&home, "a", "1", "1h");
    let v = json_stdout(
        timevault_cmd(&home)
            .args(["delete", &id, "--json"])
            .output()
            .unwrap(),
    );
    assert_eq!(v["deleted"], true);
    assert_eq!(v["id"], id.as_str());
}
