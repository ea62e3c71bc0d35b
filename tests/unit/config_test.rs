//! Tests for configuration loading and validation

use shell_pool::config::{PoolConfig, DEFAULT_INLINE_COMMAND_LIMIT, DEFAULT_SHELL};
use std::io::Write;

#[test]
fn test_json_fills_defaults() {
    let cfg = PoolConfig::from_json_str(r#"{"total_units": 6}"#).unwrap();
    assert_eq!(cfg.total_units, 6);
    assert!(!cfg.stop_on_error);
    assert!(!cfg.quiet);
    assert_eq!(cfg.log_prefix, "");
    assert_eq!(cfg.shell, DEFAULT_SHELL);
    assert_eq!(cfg.inline_command_limit, DEFAULT_INLINE_COMMAND_LIMIT);
    assert_eq!(cfg.temp_dir, None);
}

#[test]
fn test_json_full_config() {
    let cfg = PoolConfig::from_json_str(
        r#"{
            "total_units": 8,
            "stop_on_error": true,
            "quiet": true,
            "log_prefix": "ci",
            "shell": "/bin/bash",
            "inline_command_limit": 1024,
            "temp_dir": "/var/tmp"
        }"#,
    )
    .unwrap();
    assert_eq!(
        cfg,
        PoolConfig::new()
            .with_total_units(8)
            .with_stop_on_error(true)
            .with_quiet(true)
            .with_log_prefix("ci")
            .with_shell("/bin/bash")
            .with_inline_command_limit(1024)
            .with_temp_dir("/var/tmp")
    );
}

#[test]
fn test_json_zero_units_rejected() {
    let err = PoolConfig::from_json_str(r#"{"total_units": 0}"#).unwrap_err();
    assert!(err.contains("total_units"));
}

#[test]
fn test_json_malformed() {
    let err = PoolConfig::from_json_str("{total_units").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_json_file_roundtrip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"total_units": 3, "quiet": true}}"#).unwrap();

    let cfg = PoolConfig::from_json_file(file.path()).unwrap();
    assert_eq!(cfg.total_units, 3);
    assert!(cfg.quiet);
}

#[test]
fn test_json_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let err = PoolConfig::from_json_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("missing.json"));
}

#[test]
fn test_empty_shell_invalid() {
    let cfg = PoolConfig::new().with_total_units(1).with_shell("  ");
    assert!(cfg.validate().is_err());
}
