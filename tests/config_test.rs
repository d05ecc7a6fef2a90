//! Integration tests for Settings config loading with layered merge semantics.
//!
//! These tests use temp files for the local layer and do not touch
//! HIERPART_* environment variables.

use std::fs;

use tempfile::TempDir;

use hierpart::config::Settings;
use hierpart::ApplicationError;

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hierpart.toml");
    fs::write(&path, "init_days = 21\nverify_invariants = true\n").unwrap();

    let settings = Settings::load(Some(&path)).expect("load settings");

    assert_eq!(settings.init_days, 21);
    assert!(settings.verify_invariants);
}

#[test]
fn given_partial_local_config_when_load_then_keeps_other_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hierpart.toml");
    fs::write(&path, "verify_invariants = true\n").unwrap();

    let settings = Settings::load(Some(&path)).expect("load settings");

    assert!(settings.verify_invariants);
    assert!(settings.init_days > 0);
}

#[test]
fn given_missing_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let result = Settings::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_unknown_key_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hierpart.toml");
    fs::write(&path, "init_dayz = 3\n").unwrap();

    let err = Settings::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("init_dayz"), "got: {err}");
}

#[test]
fn given_malformed_value_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hierpart.toml");
    fs::write(&path, "init_days = \"a week\"\n").unwrap();

    assert!(matches!(
        Settings::load(Some(&path)),
        Err(ApplicationError::Config { .. })
    ));
}
