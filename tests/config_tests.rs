//! Configuration document and engine table loading tests

use regconf::config::RawConfigDocument;
use regconf::config::yaml::{load_document, load_engine_table, parse_document, save_document};
use regconf::error::EditorError;
use regconf::storage::{EngineType, FieldKind};
use regconf::system::{MockSystem, RealSystem, System};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn exit_code(err: &anyhow::Error) -> Option<i32> {
    err.downcast_ref::<EditorError>().map(EditorError::exit_code)
}

#[test]
fn test_load_document_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");

    let config_content = r#"
SERVER_HOSTNAME: registry.example.com
PREFERRED_URL_SCHEME: https
FEATURE_STORAGE_REPLICATION: false
BUILDLOGS_REDIS:
  host: redis
  port: 6379
DISTRIBUTED_STORAGE_CONFIG:
  default:
    - LocalStorage
    - storage_path: /datastorage/registry
"#;
    fs::write(&config_path, config_content).unwrap();

    let system = RealSystem::new();
    let document = load_document(&system, config_path.to_str().unwrap()).unwrap();

    assert_eq!(document.get("SERVER_HOSTNAME"), Some(&json!("registry.example.com")));
    assert_eq!(document.get("FEATURE_STORAGE_REPLICATION"), Some(&json!(false)));
    assert_eq!(document.lookup("BUILDLOGS_REDIS.port"), Some(&json!(6379)));
    assert_eq!(
        document.lookup("DISTRIBUTED_STORAGE_CONFIG.default"),
        Some(&json!(["LocalStorage", {"storage_path": "/datastorage/registry"}]))
    );
}

#[test]
fn test_missing_document_is_configuration_error() {
    let system = MockSystem::new();
    let err = load_document(&system, "/conf/stack/config.yaml").unwrap_err();

    assert_eq!(exit_code(&err), Some(1));
    assert!(err.to_string().contains("Configuration file not found"));
}

#[test]
fn test_non_mapping_document_is_document_error() {
    let system = MockSystem::new()
        .with_file("/conf/config.yaml", b"- just\n- a list\n")
        .unwrap();
    let err = load_document(&system, "/conf/config.yaml").unwrap_err();

    assert_eq!(exit_code(&err), Some(2));
    assert!(format!("{err:#}").contains("must be a mapping"));
}

#[test]
fn test_invalid_yaml_is_document_error() {
    let err = parse_document("key: [unclosed").unwrap_err();
    assert_eq!(exit_code(&err), Some(2));
}

#[test]
fn test_empty_file_is_empty_document() {
    assert_eq!(parse_document("").unwrap(), RawConfigDocument::new());
}

#[test]
fn test_save_then_load_keeps_values() {
    let system = MockSystem::new().with_dir("/conf").unwrap();
    let document = RawConfigDocument::from_value(json!({
        "SETUP_COMPLETE": true,
        "DB_URI": "postgresql://quay:pw@db/quay",
        "DISTRIBUTED_STORAGE_PREFERENCE": ["default"],
        "LOGS_MODEL_CONFIG": {}
    }))
    .unwrap();

    save_document(&system, "/conf/config.yaml", &document).unwrap();
    let reloaded = RawConfigDocument::load_from_file(&system, "/conf/config.yaml").unwrap();
    assert_eq!(reloaded, document);
}

#[test]
fn test_save_into_missing_directory_is_filesystem_error() {
    let system = MockSystem::new();
    let err = save_document(&system, "/nowhere/config.yaml", &RawConfigDocument::new()).unwrap_err();
    assert_eq!(exit_code(&err), Some(4));
    assert!(!system.exists(Path::new("/nowhere/config.yaml")));
}

#[test]
fn test_load_engine_table() {
    let table_yaml = r#"
LocalStorage:
  - name: storage_path
    kind: text
IBMCloudStorage:
  - name: bucket_name
    kind: text
  - name: is_secure
    kind: bool
  - name: port
    kind: text
    optional: true
    pattern: "^[0-9]+$"
"#;
    let system = MockSystem::new()
        .with_file("/conf/engines.yaml", table_yaml.as_bytes())
        .unwrap();

    let table = load_engine_table(&system, "/conf/engines.yaml").unwrap();
    assert_eq!(table.len(), 2);

    let ibm = table
        .fields_for(&EngineType::Other("IBMCloudStorage".to_owned()))
        .unwrap();
    assert_eq!(ibm.len(), 3);
    assert_eq!(ibm[1].kind, FieldKind::Bool);
    assert!(ibm[2].optional);
    assert_eq!(ibm[2].pattern.as_deref(), Some("^[0-9]+$"));
    assert!(!ibm[0].optional);
}

#[test]
fn test_engine_table_schema_violation() {
    let table_yaml = r#"
LocalStorage:
  - name: storage_path
    kind: directory
"#;
    let system = MockSystem::new()
        .with_file("/conf/engines.yaml", table_yaml.as_bytes())
        .unwrap();

    let err = load_engine_table(&system, "/conf/engines.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("Engine schema validation failed"));
}

#[test]
fn test_engine_table_missing_file() {
    let system = MockSystem::new();
    let err = load_engine_table(&system, "/conf/engines.yaml").unwrap_err();
    assert_eq!(exit_code(&err), Some(1));
}

#[test]
fn test_builtin_table_passes_schema() {
    let table = regconf::storage::EngineSchemaTable::builtin();
    let value = serde_json::to_value(&table).unwrap();
    assert!(regconf::config::schema::validate_engine_table(&value).is_ok());
}
