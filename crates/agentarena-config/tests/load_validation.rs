//! Config load validation tests for agentarena-config.
// crates/agentarena-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Validate ServerConfig::load against real files on disk,
//              beyond what the inline unit tests exercise against in-memory
//              TOML text.
// Purpose: Ensure config file handling is strict and fail-closed end to end.
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test assertions are permitted to unwrap and panic directly."
)]

use std::fs;

use agentarena_config::ConfigError;
use agentarena_config::ServerConfig;

#[test]
fn load_reads_a_valid_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arena.toml");
    fs::write(
        &path,
        r#"
            database_path = "arena.sqlite3"
            admin_password_hashes = ["sha256:deadbeef", "sha256:feedface"]
        "#,
    )
    .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.admin_password_hashes.len(), 2);
    assert_eq!(cfg.database_path.to_str().unwrap(), "arena.sqlite3");
    assert!(cfg.plugins_dir.is_none());
}

#[test]
fn load_round_trips_an_optional_plugins_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arena.toml");
    fs::write(
        &path,
        r#"
            database_path = "arena.sqlite3"
            plugins_dir = "plugins"
            admin_password_hashes = ["sha256:deadbeef"]
        "#,
    )
    .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.plugins_dir.unwrap().to_str().unwrap(), "plugins");
}

#[test]
fn load_surfaces_a_read_error_for_a_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let err = ServerConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn load_rejects_malformed_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arena.toml");
    fs::write(&path, "this is not [ valid toml").unwrap();

    let err = ServerConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn load_rejects_a_file_missing_required_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arena.toml");
    fs::write(&path, r#"admin_password_hashes = ["sha256:deadbeef"]"#).unwrap();

    let err = ServerConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn load_rejects_a_non_utf8_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arena.toml");
    fs::write(&path, [0xFF, 0xFE, 0xFF]).unwrap();

    let err = ServerConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotUtf8(_)));
}
