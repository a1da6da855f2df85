//! Integration test: Verify binary prints correct version

use std::process::Command;

#[test]
fn binary_prints_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_repotui"))
        .arg("--version")
        .output()
        .expect("Failed to execute binary");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "Expected output to contain the package version, but got: {}",
        stdout
    );
}

#[test]
fn missing_snapshot_exits_non_zero() {
    let dir = std::env::temp_dir().join(format!("repotui-missing-{}", std::process::id()));
    let output = Command::new(env!("CARGO_BIN_EXE_repotui"))
        .args(["--repo", "/nonexistent/repotui/snapshot.json", "timeline"])
        .env("REPOTUI_CONFIG", dir.join("config.toml"))
        .env("XDG_STATE_HOME", &dir)
        .output()
        .expect("Failed to execute binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.is_empty());
}
