use predicates::prelude::*;
use tempfile::TempDir;

use super::timevault_cmd;

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    timevault_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Time-locked secrets"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    timevault_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("timevault"));
}

#[test]
fn test_list_empty() {
    let home = TempDir::new().unwrap();
    timevault_cmd(&home)
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("No vaults."));
}

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    timevault_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tick_interval_ms = 1000"))
        .stdout(predicate::str::contains("# owner = alice"))
        .stdout(predicate::str::contains(".timevault/vaults.db"));
}

#[test]
fn test_config_file_sets_store_path_and_owner() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");
    let store = home.path().join("elsewhere/vaults.db");
    std::fs::write(
        &config,
        format!(
            "[store]\npath = \"{}\"\n\n[session]\nowner = \"carol\"\n",
            store.display()
        ),
    )
    .unwrap();

    timevault_cmd(&home)
        .env_remove("TIMEVAULT_OWNER")
        .env("TIMEVAULT_CONFIG", &config)
        .args(["create", "--title", "t", "--delay", "1m"])
        .write_stdin("x")
        .assert()
        .success();
    assert!(store.exists());

    timevault_cmd(&home)
        .env_remove("TIMEVAULT_OWNER")
        .args(["--config", config.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# owner = carol"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "[engine]\ntick_interval_ms = 1\n").unwrap();

    timevault_cmd(&home)
        .args(["--config", config.to_str().unwrap(), "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Invalid config"));
}
