//! Storage backend list tests

use regconf::config::RawConfigDocument;
use regconf::storage::{
    AddEntryRejection, EngineSchemaTable, EngineType, MAX_ENTRIES, StorageList, sanitize_fields,
};
use serde_json::{Value, json};

fn doc(value: Value) -> RawConfigDocument {
    RawConfigDocument::from_value(value).unwrap()
}

fn locations(list: &StorageList) -> Vec<&str> {
    list.entries().iter().map(|e| e.location.as_str()).collect()
}

#[test]
fn test_initialize_then_write_reproduces_document() {
    let original = doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {
            "us": ["S3Storage", {"s3_bucket": "b", "storage_path": "/r"}],
            "eu": ["LocalStorage", {"storage_path": "/data"}]
        },
        "DISTRIBUTED_STORAGE_DEFAULT_LOCATIONS": ["us"],
        "DISTRIBUTED_STORAGE_PREFERENCE": ["us", "eu"]
    }));

    let list = StorageList::initialize(&original);
    let mut written = original.clone();
    list.write_into(&mut written);
    assert_eq!(written, original);
}

#[test]
fn test_empty_storage_synthesizes_default_location() {
    let list = StorageList::initialize(&doc(json!({})));
    assert_eq!(list.len(), 1);

    let entry = &list.entries()[0];
    assert_eq!(entry.location, "default");
    assert_eq!(entry.engine_type, EngineType::LocalStorage);
    assert!(!entry.is_default_location);
    assert!(entry.engine_config.is_empty());
    assert!(list.server_locations().is_empty());
}

#[test]
fn test_preference_orders_entries_then_alphabetical() {
    let list = StorageList::initialize(&doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {
            "a": ["LocalStorage", {}],
            "b": ["LocalStorage", {}],
            "c": ["LocalStorage", {}],
            "d": ["LocalStorage", {}]
        },
        "DISTRIBUTED_STORAGE_PREFERENCE": ["c", "a", "missing"]
    })));
    assert_eq!(locations(&list), vec!["c", "a", "b", "d"]);
    assert_eq!(list.serialize().preference, vec!["c", "a", "b", "d"]);
}

#[test]
fn test_default_locations_flag_entries() {
    let list = StorageList::initialize(&doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {"x": ["LocalStorage", {}], "y": ["LocalStorage", {}]},
        "DISTRIBUTED_STORAGE_DEFAULT_LOCATIONS": ["y", "ghost"]
    })));
    let defaults: Vec<bool> = list.entries().iter().map(|e| e.is_default_location).collect();
    assert_eq!(defaults, vec![false, true]);
    assert_eq!(list.serialize().default_locations, vec!["y"]);
}

#[test]
fn test_malformed_pair_falls_back_to_local_storage() {
    let list = StorageList::initialize(&doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {"odd": "S3Storage", "half": ["SwiftStorage"]}
    })));
    let half = &list.entries()[0];
    assert_eq!(half.engine_type, EngineType::SwiftStorage);
    assert!(half.engine_config.is_empty());
    assert_eq!(list.entries()[1].engine_type, EngineType::LocalStorage);
}

#[test]
fn test_add_requires_replication() {
    let mut list = StorageList::initialize(&doc(json!({})));
    assert_eq!(
        list.add_entry("second", false),
        Err(AddEntryRejection::ReplicationDisabled)
    );
    assert_eq!(list.len(), 1);
}

#[test]
fn test_add_stops_at_limit() {
    let mut list = StorageList::initialize(&doc(json!({})));
    for i in 1..MAX_ENTRIES {
        list.add_entry(&format!("loc{i}"), true).unwrap();
    }
    assert_eq!(list.len(), MAX_ENTRIES);
    assert_eq!(
        list.add_entry("one-too-many", true),
        Err(AddEntryRejection::LimitReached { max: MAX_ENTRIES })
    );
    assert_eq!(list.len(), MAX_ENTRIES);
}

#[test]
fn test_added_entry_continues_last_engine() {
    let mut list = StorageList::initialize(&doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {"us": ["AzureStorage", {"azure_container": "c"}]}
    })));
    let id = list.add_entry("eu", true).unwrap();

    let added = list.entry(id).unwrap();
    assert_eq!(added.location, "eu");
    assert_eq!(added.engine_type, EngineType::AzureStorage);
    assert!(added.engine_config.is_empty());
    assert!(!added.is_default_location);
    assert_eq!(locations(&list), vec!["us", "eu"]);
}

#[test]
fn test_remove_by_identity_with_duplicate_locations() {
    let mut list = StorageList::initialize(&doc(json!({})));
    let first = list.entries()[0].id;
    let second = list.add_entry("default", true).unwrap();
    assert_ne!(first, second);

    let removed = list.remove_entry(second).unwrap();
    assert_eq!(removed.id, second);
    assert_eq!(list.len(), 1);
    assert_eq!(list.entries()[0].id, first);
    assert!(list.remove_entry(second).is_none());
}

#[test]
fn test_duplicate_locations_reported() {
    let mut list = StorageList::initialize(&doc(json!({})));
    assert!(list.duplicate_locations().is_empty());

    list.add_entry("eu", true).unwrap();
    list.add_entry("default", true).unwrap();
    assert_eq!(list.duplicate_locations().into_iter().collect::<Vec<_>>(), vec!["default"]);
}

#[test]
fn test_server_location_is_locked_until_duplicated() {
    let mut list = StorageList::initialize(&doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {"us": ["LocalStorage", {}], "eu": ["LocalStorage", {}]}
    })));
    assert!(!list.can_change_location("us"));
    assert!(!list.can_remove("us"));
    assert!(list.can_change_location("new-place"));

    list.add_entry("us", true).unwrap();
    assert!(list.can_change_location("us"));
    assert!(list.can_remove("us"));
}

#[test]
fn test_last_entry_cannot_be_removed() {
    let mut list = StorageList::initialize(&doc(json!({})));
    assert!(!list.can_remove("default"));

    list.add_entry("second", true).unwrap();
    assert!(list.can_remove("default"));
    assert!(list.can_remove("second"));
}

#[test]
fn test_sanitize_strips_unknown_keys_and_defaults_bools() {
    let mut list = StorageList::initialize(&doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {
            "ceph": ["RadosGWStorage", {
                "hostname": "rgw",
                "is_secure": "",
                "s3_bucket": "left over from S3",
                "access_key": "k"
            }]
        }
    })));
    list.sanitize_all(&EngineSchemaTable::builtin());

    let config = &list.entries()[0].engine_config;
    assert_eq!(config.get("hostname"), Some(&json!("rgw")));
    assert_eq!(config.get("access_key"), Some(&json!("k")));
    assert_eq!(config.get("is_secure"), Some(&json!(false)));
    assert!(!config.contains_key("s3_bucket"));
}

#[test]
fn test_sanitize_keeps_truthy_bool() {
    let mut list = StorageList::initialize(&doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {"ceph": ["RHOCSStorage", {"is_secure": true}]}
    })));
    list.sanitize_all(&EngineSchemaTable::builtin());
    assert_eq!(
        list.entries()[0].engine_config.get("is_secure"),
        Some(&json!(true))
    );
}

#[test]
fn test_sanitize_leaves_unknown_engine_alone() {
    let mut list = StorageList::initialize(&doc(json!({
        "DISTRIBUTED_STORAGE_CONFIG": {"ibm": ["IBMCloudStorage", {"anything": 1}]}
    })));
    let id = list.entries()[0].id;
    let entry = list.entry_mut(id).unwrap();
    sanitize_fields(entry, &EngineSchemaTable::builtin());

    assert_eq!(entry.engine_type, EngineType::Other("IBMCloudStorage".to_owned()));
    assert_eq!(entry.engine_config.get("anything"), Some(&json!(1)));

    let mut written = RawConfigDocument::new();
    list.write_into(&mut written);
    assert_eq!(
        written.lookup("DISTRIBUTED_STORAGE_CONFIG.ibm"),
        Some(&json!(["IBMCloudStorage", {"anything": 1}]))
    );
}
