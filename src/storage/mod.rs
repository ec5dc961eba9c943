//! Storage backend list synchronizer
//!
//! The raw document encodes storage across three keys:
//! `DISTRIBUTED_STORAGE_CONFIG` (location to `[engine, config]`),
//! `DISTRIBUTED_STORAGE_DEFAULT_LOCATIONS` and `DISTRIBUTED_STORAGE_PREFERENCE`.
//! [`StorageList`] is the ordered, editable projection of those keys.

pub mod engines;

pub use engines::{EngineField, EngineSchemaTable, EngineType, FieldKind};

use crate::config::{RawConfigDocument, is_truthy};
use core::cmp::Ordering;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, warn};

pub const STORAGE_CONFIG_KEY: &str = "DISTRIBUTED_STORAGE_CONFIG";
pub const DEFAULT_LOCATIONS_KEY: &str = "DISTRIBUTED_STORAGE_DEFAULT_LOCATIONS";
pub const PREFERENCE_KEY: &str = "DISTRIBUTED_STORAGE_PREFERENCE";
pub const REPLICATION_FLAG: &str = "FEATURE_STORAGE_REPLICATION";

/// Maximum number of storage locations the editor allows
pub const MAX_ENTRIES: usize = 10;

/// Location given to the row synthesized for an empty storage map
pub const DEFAULT_LOCATION: &str = "default";

/// Identity of an entry within its list
///
/// Locations may collide while the user is editing, so entries are removed
/// and addressed by this handle rather than by location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryId(u64);

/// Category of a problem attached to a storage entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum EntryErrorCategory {
    Location,
    Engine,
    Field,
    File,
}

/// One editable storage backend row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct StorageBackendEntry {
    #[serde(skip)]
    pub id: EntryId,
    pub location: String,
    pub is_default_location: bool,
    pub engine_type: EngineType,
    pub engine_config: Map<String, Value>,

    /// Problems found by the last validation pass
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub validation_errors: BTreeMap<EntryErrorCategory, String>,
}

/// Why an entry could not be added
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AddEntryRejection {
    #[error("Storage replication must be enabled to add more storage locations")]
    ReplicationDisabled,

    #[error("At most {max} storage locations may be configured")]
    LimitReached { max: usize },
}

/// The three raw-document values a storage list folds back into
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct StorageSerialization {
    pub config: Map<String, Value>,
    pub default_locations: Vec<String>,
    pub preference: Vec<String>,
}

/// Ordered, editable list of storage backends
#[derive(Debug, Clone, Default)]
pub struct StorageList {
    entries: Vec<StorageBackendEntry>,
    server_locations: BTreeSet<String>,
    next_id: u64,
}

impl StorageList {
    /// Build the list from a raw document
    ///
    /// Entries named in `DISTRIBUTED_STORAGE_PREFERENCE` come first, in that
    /// order; the rest follow sorted by location. An empty storage map yields a
    /// single `default` row backed by local storage.
    #[must_use]
    pub fn initialize(document: &RawConfigDocument) -> Self {
        let config = document.section(STORAGE_CONFIG_KEY).cloned().unwrap_or_default();
        let default_locations = string_list(document.get(DEFAULT_LOCATIONS_KEY));
        let preference = string_list(document.get(PREFERENCE_KEY));

        let mut list = Self {
            entries: Vec::with_capacity(config.len().max(1)),
            server_locations: config.keys().cloned().collect(),
            next_id: 0,
        };

        for (location, data) in config {
            let (engine_type, engine_config) = split_engine_data(&location, data);
            let entry = list.new_entry(
                location.clone(),
                default_locations.contains(&location),
                engine_type,
                engine_config,
            );
            list.entries.push(entry);
        }

        if list.entries.is_empty() {
            debug!("No storage configured, starting with a '{DEFAULT_LOCATION}' location");
            let entry = list.new_entry(
                DEFAULT_LOCATION.to_owned(),
                false,
                EngineType::LocalStorage,
                Map::new(),
            );
            list.entries.push(entry);
            return list;
        }

        list.entries.sort_by(|a, b| {
            let index_a = preference.iter().position(|p| *p == a.location);
            let index_b = preference.iter().position(|p| *p == b.location);
            match (index_a, index_b) {
                (Some(ia), Some(ib)) => ia.cmp(&ib),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => a.location.cmp(&b.location),
            }
        });

        list
    }

    /// Entries in display order
    #[must_use]
    #[inline]
    pub fn entries(&self) -> &[StorageBackendEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by identity
    #[must_use]
    #[inline]
    pub fn entry(&self, id: EntryId) -> Option<&StorageBackendEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Look up an entry by identity, mutably
    #[inline]
    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut StorageBackendEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Mutable access to every entry, in order
    #[inline]
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut StorageBackendEntry> {
        self.entries.iter_mut()
    }

    /// Locations that existed on the server when the session started
    #[must_use]
    #[inline]
    pub const fn server_locations(&self) -> &BTreeSet<String> {
        &self.server_locations
    }

    /// Whether another location may be added
    ///
    /// # Errors
    ///
    /// Returns the reason when replication is off or the list is full
    #[inline]
    pub fn can_add(&self, replication_enabled: bool) -> Result<(), AddEntryRejection> {
        if !replication_enabled {
            return Err(AddEntryRejection::ReplicationDisabled);
        }
        if self.entries.len() >= MAX_ENTRIES {
            return Err(AddEntryRejection::LimitReached { max: MAX_ENTRIES });
        }
        Ok(())
    }

    /// Append a new location
    ///
    /// The new entry's engine type continues from the last entry, or local
    /// storage when the list is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Storage replication is disabled
    /// - The list already holds [`MAX_ENTRIES`] entries
    pub fn add_entry(
        &mut self,
        location: &str,
        replication_enabled: bool,
    ) -> Result<EntryId, AddEntryRejection> {
        self.can_add(replication_enabled)?;

        let engine_type = self
            .entries
            .last()
            .map_or(EngineType::LocalStorage, |last| last.engine_type.clone());
        let entry = self.new_entry(location.to_owned(), false, engine_type, Map::new());
        let id = entry.id;
        debug!("Added storage location '{location}' ({})", entry.engine_type);
        self.entries.push(entry);
        Ok(id)
    }

    /// Remove an entry by identity, returning it
    pub fn remove_entry(&mut self, id: EntryId) -> Option<StorageBackendEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let removed = self.entries.remove(index);
        debug!("Removed storage location '{}'", removed.location);
        Some(removed)
    }

    /// Whether entries currently holding `location` may be renamed
    ///
    /// Locations the server does not know yet are always free to change. A
    /// server-known location may only change while at least two rows share it,
    /// so renaming one of them resolves a collision instead of orphaning a
    /// backend the server still references.
    #[must_use]
    pub fn can_change_location(&self, location: &str) -> bool {
        if !self.server_locations.contains(location) {
            return true;
        }
        self.entries.iter().filter(|e| e.location == location).count() >= 2
    }

    /// Whether the entry holding `location` may be removed
    #[must_use]
    #[inline]
    pub fn can_remove(&self, location: &str) -> bool {
        self.entries.len() > 1 && self.can_change_location(location)
    }

    /// Strip disallowed fields from every entry
    pub fn sanitize_all(&mut self, table: &EngineSchemaTable) {
        for entry in &mut self.entries {
            sanitize_fields(entry, table);
        }
    }

    /// Locations held by more than one entry
    #[must_use]
    pub fn duplicate_locations(&self) -> BTreeSet<&str> {
        let mut seen = BTreeSet::new();
        self.entries
            .iter()
            .map(|e| e.location.as_str())
            .filter(|location| !seen.insert(*location))
            .collect()
    }

    /// Fold the list back into the three raw values
    ///
    /// `preference` always mirrors the current order. The storage map is keyed
    /// by location, so callers must check [`StorageList::duplicate_locations`]
    /// first: with colliding locations the later entry replaces the earlier.
    #[must_use]
    pub fn serialize(&self) -> StorageSerialization {
        let mut config = Map::new();
        let mut default_locations = Vec::new();
        let mut preference = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            config.insert(
                entry.location.clone(),
                Value::Array(vec![
                    Value::String(entry.engine_type.to_string()),
                    Value::Object(entry.engine_config.clone()),
                ]),
            );
            if entry.is_default_location {
                default_locations.push(entry.location.clone());
            }
            preference.push(entry.location.clone());
        }

        StorageSerialization {
            config,
            default_locations,
            preference,
        }
    }

    /// Serialize into the document, replacing the three storage keys
    pub fn write_into(&self, document: &mut RawConfigDocument) {
        let serialized = self.serialize();
        document.insert(STORAGE_CONFIG_KEY, Value::Object(serialized.config));
        document.insert(
            DEFAULT_LOCATIONS_KEY,
            Value::Array(
                serialized
                    .default_locations
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            ),
        );
        document.insert(
            PREFERENCE_KEY,
            Value::Array(serialized.preference.into_iter().map(Value::String).collect()),
        );
    }

    fn new_entry(
        &mut self,
        location: String,
        is_default_location: bool,
        engine_type: EngineType,
        engine_config: Map<String, Value>,
    ) -> StorageBackendEntry {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        StorageBackendEntry {
            id,
            location,
            is_default_location,
            engine_type,
            engine_config,
            validation_errors: BTreeMap::new(),
        }
    }
}

/// Remove configuration keys the entry's engine does not accept
///
/// Boolean fields the engine declares are filled in with `false` when absent
/// or falsy. Entries whose engine the table does not know are left alone.
pub fn sanitize_fields(entry: &mut StorageBackendEntry, table: &EngineSchemaTable) {
    let Some(fields) = table.fields_for(&entry.engine_type) else {
        warn!(
            "No field schema for storage engine '{}', leaving '{}' untouched",
            entry.engine_type, entry.location
        );
        return;
    };

    let before = entry.engine_config.len();
    entry
        .engine_config
        .retain(|name, _| fields.iter().any(|f| f.name == *name));
    if entry.engine_config.len() != before {
        debug!(
            "Dropped {} field(s) not accepted by {} from '{}'",
            before - entry.engine_config.len(),
            entry.engine_type,
            entry.location
        );
    }

    for field in fields.iter().filter(|f| f.defaults_to_false()) {
        let slot = entry
            .engine_config
            .entry(field.name.clone())
            .or_insert(Value::Bool(false));
        if !is_truthy(slot) {
            *slot = Value::Bool(false);
        }
    }
}

/// Split a raw `[engine, config]` pair, tolerating malformed data
fn split_engine_data(location: &str, data: Value) -> (EngineType, Map<String, Value>) {
    let Value::Array(mut parts) = data else {
        warn!("Storage location '{location}' is not an [engine, config] pair");
        return (EngineType::LocalStorage, Map::new());
    };

    let config = match parts.get_mut(1).map(Value::take) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let engine = match parts.first() {
        Some(&Value::String(ref name)) => EngineType::from(name.clone()),
        _ => {
            warn!("Storage location '{location}' has no engine type");
            EngineType::LocalStorage
        }
    };
    (engine, config)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
