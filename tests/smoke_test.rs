//! Smoke tests for the lodestar launcher.
//!
//! These tests verify launches with no running instance:
//! - `lodestar -version` and `lodestar -help` print and exit
//! - anything else ends in a JSON launch report on stdout

mod common;

use common::{TestEnv, launch_report};
use predicates::prelude::*;

#[test]
fn test_version_flag() {
    let env = TestEnv::new();
    env.lodestar()
        .arg("-version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Lodestar Community Edition 0.1.0."));
}

#[test]
fn test_version_long_form() {
    let env = TestEnv::new();
    env.lodestar()
        .args(["--version", "-closeTabs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Community Edition"))
        .stdout(predicate::str::contains("continue_local").not());
}

#[test]
fn test_help_flag() {
    let env = TestEnv::new();
    env.lodestar()
        .arg("-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("usage: lodestar [options] [files...]"))
        .stdout(predicate::str::contains("-vars,--variablesFile <arg>"))
        .stdout(predicate::str::contains("-closeTabs,--closeTabs"))
        .stdout(predicate::str::contains("(C) Lodestar contributors"));
}

#[test]
fn test_no_args_reports_local_start() {
    let env = TestEnv::new();
    let output = env.lodestar().assert().success().get_output().stdout.clone();

    let report = launch_report(&output);
    assert_eq!(report["outcome"], "continue_local");
    assert_eq!(report["reuse_workspace"], false);
    assert_eq!(report["exclusive_mode"], false);
    assert_eq!(
        report["workspace"],
        env.workspace_path().to_string_lossy().as_ref()
    );
}

#[test]
fn test_reuse_workspace_without_instance() {
    let env = TestEnv::new();
    let output = env
        .lodestar()
        .args(["-reuseWorkspace", "-closeTabs"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report = launch_report(&output);
    assert_eq!(report["outcome"], "continue_local");
    assert_eq!(report["reuse_workspace"], true);
}

#[test]
fn test_data_flag_overrides_workspace() {
    let env = TestEnv::new();
    let other = common::TempDir::new().unwrap();
    let output = env
        .lodestar()
        .args(["-data", &other.path().to_string_lossy(), "-nosplash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report = launch_report(&output);
    assert_eq!(
        report["workspace"],
        other.path().to_string_lossy().as_ref()
    );
}

#[test]
fn test_unknown_option_still_starts_locally() {
    let env = TestEnv::new();
    let output = env
        .lodestar()
        .arg("-noSuchOption")
        .assert()
        .success()
        .stderr(predicate::str::contains("Unrecognized option"))
        .get_output()
        .stdout
        .clone();

    assert_eq!(launch_report(&output)["outcome"], "continue_local");
}

#[test]
fn test_quiet_silences_logging() {
    let env = TestEnv::new();
    env.lodestar()
        .args(["-q", "-noSuchOption"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_missing_variables_file_is_reported() {
    let env = TestEnv::new();
    let missing = env.workspace_path().join("missing.properties");
    let output = env
        .lodestar()
        .args(["-vars", &missing.to_string_lossy()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report = launch_report(&output);
    assert_eq!(report["outcome"], "processing_error");
    assert!(
        report["error"]
            .as_str()
            .unwrap()
            .contains("missing.properties")
    );
}

#[test]
fn test_keyring_flag_is_ignored() {
    let env = TestEnv::new();
    let output = env
        .lodestar()
        .args(["-launcher.keyring", "/tmp/keyring", "-nosplash"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Unrecognized").not())
        .get_output()
        .stdout
        .clone();

    assert_eq!(launch_report(&output)["outcome"], "continue_local");
}

#[test]
fn test_variables_file_reaches_launch_report() {
    let env = TestEnv::new();
    let vars = env.workspace_path().join("vars.properties");
    std::fs::write(&vars, "db.host=db1\ndb.port: 5432\n").unwrap();

    let output = env
        .lodestar()
        .args(["-vars", &vars.to_string_lossy()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report = launch_report(&output);
    assert_eq!(report["outcome"], "continue_local");
    assert_eq!(report["variables"]["db.host"], "db1");
    assert_eq!(report["variables"]["db.port"], "5432");
}

#[test]
fn test_data_flag_with_inline_value() {
    let env = TestEnv::new();
    let other = common::TempDir::new().unwrap();
    let output = env
        .lodestar()
        .arg(format!("-data={}", other.path().display()))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report = launch_report(&output);
    assert_eq!(
        report["workspace"],
        other.path().to_string_lossy().as_ref()
    );
}
