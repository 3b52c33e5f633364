mod cli_test;
mod error_test;
mod json_test;
mod vault_test;

use assert_cmd::Command;
use tempfile::TempDir;

/// A `timevault` invocation isolated in `home`, acting as alice.
pub fn timevault_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("timevault").unwrap();
    cmd.env("HOME", home.path());
    cmd.env("TIMEVAULT_OWNER", "alice");
    cmd.env_remove("TIMEVAULT_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Create a vault and return its id.
pub fn create_vault(home: &TempDir, title: &str, secret: &str, delay: &str) -> String {
    let output = timevault_cmd(home)
        .args(["create", "--title", title, "--delay", delay])
        .write_stdin(secret)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "create failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}
