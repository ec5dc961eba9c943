//! CLI interface tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const VALID_CONFIG: &str = r#"
SERVER_HOSTNAME: registry.example.com
PREFERRED_URL_SCHEME: http
LOGS_MODEL: database
DISTRIBUTED_STORAGE_CONFIG:
  default:
    - LocalStorage
    - storage_path: /datastorage/registry
DISTRIBUTED_STORAGE_DEFAULT_LOCATIONS: []
DISTRIBUTED_STORAGE_PREFERENCE:
  - default
"#;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn regconf(config_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("regconf").unwrap();
    cmd.env_remove("REGCONF_READ_ONLY_GROUPS")
        .arg("--config")
        .arg(config_path.to_str().unwrap());
    cmd
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("regconf").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("regconf"));
}

#[test]
fn test_help_flag() {
    let mut cmd = Command::cargo_bin("regconf").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Inspect, edit and validate a container registry configuration",
        ));
}

#[test]
fn test_missing_config_error() {
    let mut cmd = Command::cargo_bin("regconf").unwrap();
    cmd.arg("--config")
        .arg("nonexistent.yaml")
        .arg("validate")
        .assert()
        .failure()
        .code(1) // Configuration error
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_show_tls_setting() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["show", "TLS_SETTING"])
        .assert()
        .success()
        .stdout("TLS_SETTING: none\n");
}

#[test]
fn test_show_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["--output-format", "json", "show", "LOGS_MODEL", "redis.host"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""LOGS_MODEL": "database""#))
        .stdout(predicate::str::contains(r#""redis.host": null"#));
}

#[test]
fn test_show_unknown_field() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["show", "NOT_A_FIELD"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown field: NOT_A_FIELD"));
}

#[test]
fn test_set_tls_writes_document() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["set", "TLS_SETTING", "external-tls"])
        .assert()
        .success();

    let written = fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("PREFERRED_URL_SCHEME: https"));
    assert!(written.contains("EXTERNAL_TLS_TERMINATION: true"));

    regconf(&config_path)
        .args(["set", "TLS_SETTING", "none"])
        .assert()
        .success();

    let written = fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("PREFERRED_URL_SCHEME: http\n"));
    assert!(!written.contains("EXTERNAL_TLS_TERMINATION"));
}

#[test]
fn test_set_invalid_value_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["set", "TLS_SETTING", "mutual"])
        .assert()
        .failure()
        .code(5);

    assert_eq!(fs::read_to_string(&config_path).unwrap(), VALID_CONFIG);
}

#[test]
fn test_set_raw_key_keeps_type() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["set", "FEATURE_MAILING", "true"])
        .assert()
        .success();

    let written = fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("FEATURE_MAILING: true"));
}

#[test]
fn test_read_only_group_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .env("REGCONF_READ_ONLY_GROUPS", "Redis,Database")
        .args(["set", "redis.host", "redis.internal"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("read-only"));
}

#[test]
fn test_validate_valid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_validate_local_storage_with_replication() {
    let temp_dir = TempDir::new().unwrap();
    let config = format!("{VALID_CONFIG}FEATURE_STORAGE_REPLICATION: true\n");
    let config_path = write_config(&temp_dir, &config);

    regconf(&config_path)
        .arg("validate")
        .assert()
        .failure()
        .code(3) // Validation error
        .stdout(predicate::str::contains(
            "Local storage cannot be used when storage replication is enabled",
        ));
}

#[test]
fn test_storage_list_and_add() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .arg("storage")
        .assert()
        .success()
        .stdout(predicate::str::contains("default [LocalStorage]"));

    // Adding requires replication
    regconf(&config_path)
        .args(["storage", "add", "us-east", "--engine", "S3Storage"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("Storage replication must be enabled"));

    regconf(&config_path)
        .args(["set", "FEATURE_STORAGE_REPLICATION", "true"])
        .assert()
        .success();
    regconf(&config_path)
        .args(["storage", "add", "us-east", "--engine", "S3Storage"])
        .assert()
        .success();

    let written = fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("us-east:"));
    assert!(written.contains("- S3Storage"));
}

#[test]
fn test_storage_add_existing_location_leaves_file_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let config = r#"
SERVER_HOSTNAME: registry.example.com
FEATURE_STORAGE_REPLICATION: true
DISTRIBUTED_STORAGE_CONFIG:
  east:
    - S3Storage
    - s3_bucket: real-bucket
      storage_path: /data
DISTRIBUTED_STORAGE_DEFAULT_LOCATIONS: []
DISTRIBUTED_STORAGE_PREFERENCE:
  - east
"#;
    let config_path = write_config(&temp_dir, config);

    regconf(&config_path)
        .args(["storage", "add", "east"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains(
            "Storage location 'east' is used more than once",
        ));

    let after = fs::read_to_string(&config_path).unwrap();
    assert_eq!(after, config);
    assert!(after.contains("real-bucket"));
}

#[test]
fn test_server_location_cannot_be_renamed() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["storage", "rename", "default", "primary"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("in use by the server"));
}

#[test]
fn test_oidc_reserved_provider() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["oidc", "add", "GITHUB"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("reserved name"));
}

#[test]
fn test_oidc_add_then_list() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["oidc", "add", "okta"])
        .assert()
        .success();

    regconf(&config_path)
        .args(["oidc", "list"])
        .assert()
        .success()
        .stdout("OKTA\n");

    regconf(&config_path)
        .arg("sections")
        .assert()
        .success()
        .stdout(predicate::str::contains("oidc-login"));
}

#[test]
fn test_save_marks_setup_complete() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(&temp_dir, VALID_CONFIG);

    regconf(&config_path)
        .args(["--setup", "save"])
        .assert()
        .success();

    let written = fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("SETUP_COMPLETE: true"));
    assert!(written.contains("DATABASE_SECRET_KEY:"));
    assert!(written.contains("TESTING: false"));
}

#[test]
fn test_save_blocked_by_invalid_hostname() {
    let temp_dir = TempDir::new().unwrap();
    let config = VALID_CONFIG.replace("registry.example.com", "localhost");
    let config_path = write_config(&temp_dir, &config);

    regconf(&config_path)
        .arg("save")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("non-localhost"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), config);
}
