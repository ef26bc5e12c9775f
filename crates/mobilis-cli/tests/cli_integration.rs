use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn mobilis() -> Command {
    let mut cmd = Command::cargo_bin("mobilis").unwrap();
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("MOBILIS_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn with_config(name: &str) -> Command {
    let mut cmd = mobilis();
    cmd.arg("--config").arg(fixture_path(name));
    cmd
}

#[test]
fn test_help_exits_zero() {
    mobilis()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mobilis"));
}

#[test]
fn test_devices_lists_profiles() {
    with_config("mobilis.yaml")
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("pixel"))
        .stdout(predicate::str::contains("chrome"))
        .stdout(predicate::str::contains("Windows"));
}

#[test]
fn test_devices_json_output() {
    let assert = with_config("mobilis.yaml")
        .args(["--format", "json", "devices"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    let devices = parsed["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 4);
    assert!(devices
        .iter()
        .any(|d| d["name"] == "pixel" && d["platform"] == "Android"));
}

#[test]
fn test_config_from_environment() {
    mobilis()
        .env("MOBILIS_CONFIG", fixture_path("mobilis.yaml"))
        .arg("devices")
        .assert()
        .success()
        .stdout(predicate::str::contains("surface"));
}

#[test]
fn test_caps_for_android_emulator() {
    let assert = with_config("mobilis.yaml")
        .args(["caps", "pixel"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let caps: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(caps["platformName"], "Android");
    assert_eq!(caps["automationName"], "UiAutomator2");
    assert_eq!(caps["avd"], "Pixel_7_API_34");
    assert_eq!(caps["avdReadyTimeout"], 120_000);
    assert_eq!(caps["appPackage"], "com.example.demo");
    assert!(caps["app"].as_str().unwrap().ends_with("demo.apk"));
}

#[test]
fn test_caps_w3c_payload() {
    let assert = with_config("mobilis.yaml")
        .args(["caps", "chrome", "--w3c"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let always = &payload["capabilities"]["alwaysMatch"];
    assert_eq!(always["browserName"], "Chrome");
    assert_eq!(always["appium:deviceName"], "Pixel 7");
}

#[test]
fn test_caps_unsupported_platform() {
    with_config("mobilis.yaml")
        .args(["caps", "surface"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("[Windows] device type not supported"));
}

#[test]
fn test_caps_missing_app() {
    with_config("mobilis.yaml")
        .args(["caps", "broken"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("App not found"));
}

#[test]
fn test_caps_unknown_device() {
    with_config("mobilis.yaml")
        .args(["caps", "ghost"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("device [ghost] not found"));
}

#[test]
fn test_missing_config_file() {
    with_config("does-not-exist.yaml")
        .arg("devices")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn test_unknown_locator_strategy() {
    with_config("mobilis.yaml")
        .args(["check", "chrome", "telepathy", "login"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown locator strategy"));
}

#[test]
fn test_open_without_server_fails_to_start() {
    with_config("offline.json")
        .args(["open", "chrome", "https://example.com"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error occurred starting device driver"));
}

#[test]
fn test_unknown_subcommand() {
    mobilis()
        .arg("totally-fake-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_log_dir_keeps_stderr_logging() {
    let logs = tempfile::tempdir().unwrap();
    with_config("offline.json")
        .env("RUST_LOG", "info")
        .arg("--log-dir")
        .arg(logs.path())
        .args(["open", "chrome", "https://example.com"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("starting session"));

    let written = std::fs::read_to_string(logs.path().join("mobilis.log")).unwrap();
    assert!(written.contains("starting session"), "log file:\n{written}");
}
