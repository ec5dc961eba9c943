//! Editing session
//!
//! An [`EditorSession`] owns everything one editing pass needs: the raw
//! document, the storage list, the engine table and the latest validation
//! result. Every mutation runs cascades and a full validation pass before it
//! returns, so callers never observe a half-applied edit.

use crate::config::RawConfigDocument;
use crate::mapper::oidc::{self, OidcProviderId, ProviderRejection};
use crate::mapper::{FieldValue, ViewField, WriteOutcome, apply_field, project_all, project_field};
use crate::storage::{
    AddEntryRejection, DEFAULT_LOCATIONS_KEY, EngineSchemaTable, EngineType, EntryId,
    PREFERENCE_KEY, REPLICATION_FLAG, STORAGE_CONFIG_KEY, StorageBackendEntry, StorageList,
    sanitize_fields,
};
use crate::validation::{
    Cascade, ValidationContext, ValidationErrorSet, ValidationIssue, apply_cascades, validate,
};
use anyhow::Result;
use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const SETUP_COMPLETE: &str = "SETUP_COMPLETE";
pub const DATABASE_SECRET_KEY: &str = "DATABASE_SECRET_KEY";
pub const TESTING: &str = "TESTING";

/// Read-only group covering storage rows
pub const STORAGE_GROUP: &str = "RegistryStorage";
/// Read-only group covering OIDC providers
pub const OIDC_GROUP: &str = "OIDCLogin";

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum SessionState {
    Unloaded,
    Loading,
    Ready,
    Validating,
    Submitting,
    Saved,
}

impl fmt::Display for SessionState {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::Saved => "saved",
        };
        f.write_str(name)
    }
}

/// Whether the registry is running or being set up for the first time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ValidationMode {
    #[default]
    Online,
    Setup,
}

/// Where the document comes from and goes back to
pub trait ConfigStore {
    /// Fetch the current configuration document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be retrieved or parsed
    fn fetch(&self) -> Result<RawConfigDocument>;

    /// Persist a submitted document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be stored
    fn submit(&self, document: &RawConfigDocument) -> Result<()>;

    /// Names of files the user has uploaded alongside the document
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot list its files
    fn uploaded_files(&self) -> Result<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }
}

/// Why the session refused an edit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditRejection {
    #[error("Cannot edit while the session is {state}")]
    NotReady { state: SessionState },

    #[error("Fields in group '{group}' are managed externally and read-only")]
    ReadOnly { group: String },

    #[error("{key} is managed through the storage commands")]
    ManagedKey { key: String },

    #[error("No storage entry with that identity")]
    UnknownEntry,

    #[error("Storage location '{location}' is in use by the server and cannot be changed")]
    LocationLocked { location: String },

    #[error("Storage location '{location}' cannot be removed")]
    CannotRemove { location: String },

    #[error("Field '{field}' is not accepted by {engine}")]
    UnknownEngineField { engine: EngineType, field: String },

    #[error(transparent)]
    Storage(#[from] AddEntryRejection),

    #[error(transparent)]
    Provider(#[from] ProviderRejection),

    #[error("Configuration is invalid: {issue}")]
    Blocked { issue: String },
}

/// One explicit editing session
#[derive(Debug, Clone)]
pub struct EditorSession {
    state: SessionState,
    mode: ValidationMode,
    document: RawConfigDocument,
    storage: StorageList,
    table: EngineSchemaTable,
    errors: ValidationErrorSet,
    uploaded_files: BTreeSet<String>,
    read_only_groups: BTreeSet<String>,
    last_cascades: Vec<Cascade>,
    has_changes: bool,
    stale: bool,
}

impl EditorSession {
    /// Create an unloaded session
    #[must_use]
    pub fn new(table: EngineSchemaTable, mode: ValidationMode) -> Self {
        Self {
            state: SessionState::Unloaded,
            mode,
            document: RawConfigDocument::new(),
            storage: StorageList::default(),
            table,
            errors: ValidationErrorSet::default(),
            uploaded_files: BTreeSet::new(),
            read_only_groups: BTreeSet::new(),
            last_cascades: Vec::new(),
            has_changes: false,
            stale: false,
        }
    }

    /// Lock field groups managed by an external system
    #[must_use]
    pub fn with_read_only_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_only_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Fetch the document from a store and start editing it
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot provide the document; the session
    /// goes back to `Unloaded`.
    pub fn load(&mut self, store: &dyn ConfigStore) -> Result<()> {
        self.state = SessionState::Loading;
        let fetched = store
            .fetch()
            .and_then(|document| Ok((document, store.uploaded_files()?)));
        match fetched {
            Ok((document, uploaded_files)) => {
                self.load_document(document, uploaded_files);
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Unloaded;
                Err(e)
            }
        }
    }

    /// Start editing a document already in hand
    pub fn load_document(&mut self, document: RawConfigDocument, uploaded_files: BTreeSet<String>) {
        self.state = SessionState::Loading;
        self.storage = StorageList::initialize(&document);
        self.document = document;
        self.uploaded_files = uploaded_files;
        self.revalidate();
        self.has_changes = false;
        info!(
            "Loaded configuration with {} storage location(s)",
            self.storage.len()
        );
    }

    #[must_use]
    #[inline]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    #[inline]
    pub const fn mode(&self) -> ValidationMode {
        self.mode
    }

    #[must_use]
    #[inline]
    pub const fn document(&self) -> &RawConfigDocument {
        &self.document
    }

    #[must_use]
    #[inline]
    pub const fn storage(&self) -> &StorageList {
        &self.storage
    }

    #[must_use]
    #[inline]
    pub const fn engine_table(&self) -> &EngineSchemaTable {
        &self.table
    }

    /// Result of the latest validation pass
    #[must_use]
    #[inline]
    pub const fn validation(&self) -> &ValidationErrorSet {
        &self.errors
    }

    /// Corrections made by the latest mutation
    #[must_use]
    #[inline]
    pub fn last_cascades(&self) -> &[Cascade] {
        &self.last_cascades
    }

    /// Whether the document changed since it was loaded or saved
    #[must_use]
    #[inline]
    pub const fn has_changes(&self) -> bool {
        self.has_changes
    }

    #[must_use]
    #[inline]
    pub const fn uploaded_files(&self) -> &BTreeSet<String> {
        &self.uploaded_files
    }

    /// Record a file the host uploaded
    ///
    /// While a submission is in flight the validation pass waits for
    /// [`EditorSession::mark_saved`] or [`EditorSession::submission_failed`].
    pub fn mark_uploaded<S: Into<String>>(&mut self, name: S) {
        self.uploaded_files.insert(name.into());
        if self.ensure_editable().is_ok() {
            self.revalidate();
        } else {
            self.stale = true;
        }
    }

    #[must_use]
    #[inline]
    pub fn is_read_only(&self, group: &str) -> bool {
        self.read_only_groups.contains(group)
    }

    #[must_use]
    #[inline]
    pub fn project(&self, field: ViewField) -> FieldValue {
        project_field(&self.document, field)
    }

    #[must_use]
    #[inline]
    pub fn project_all(&self) -> Vec<(ViewField, FieldValue)> {
        project_all(&self.document)
    }

    /// Write a view field back into the document
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not editable or the field's group
    /// is read-only. Input the mapper cannot use comes back as the
    /// [`WriteOutcome`] instead.
    pub fn apply(
        &mut self,
        field: ViewField,
        value: &FieldValue,
    ) -> Result<WriteOutcome, EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(field.group())?;

        let outcome = apply_field(&mut self.document, field, value);
        if outcome.is_applied() {
            self.changed();
        }
        Ok(outcome)
    }

    /// Set a raw top-level key
    ///
    /// A `null` value removes the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not editable or the key is one of
    /// the storage keys the storage list owns
    pub fn set_raw(&mut self, key: &str, value: Value) -> Result<(), EditRejection> {
        self.ensure_editable()?;
        if [STORAGE_CONFIG_KEY, DEFAULT_LOCATIONS_KEY, PREFERENCE_KEY].contains(&key) {
            return Err(EditRejection::ManagedKey {
                key: key.to_owned(),
            });
        }

        if value.is_null() {
            self.document.remove(key);
        } else {
            self.document.insert(key, value);
        }
        self.changed();
        Ok(())
    }

    /// Generic OIDC providers in the document
    #[must_use]
    #[inline]
    pub fn oidc_providers(&self) -> Vec<OidcProviderId> {
        oidc::providers(&self.document)
    }

    /// Add an OIDC provider
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not editable, OIDC is read-only or
    /// the id is rejected
    pub fn add_oidc_provider(&mut self, raw_id: &str) -> Result<OidcProviderId, EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(OIDC_GROUP)?;
        let id = oidc::add_provider(&mut self.document, raw_id)?;
        self.changed();
        Ok(id)
    }

    /// Remove an OIDC provider, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not editable or OIDC is read-only
    pub fn remove_oidc_provider(&mut self, id: &OidcProviderId) -> Result<bool, EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(OIDC_GROUP)?;
        let removed = oidc::remove_provider(&mut self.document, id);
        if removed {
            self.changed();
        }
        Ok(removed)
    }

    /// Add a storage location
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The session is not editable or storage is read-only
    /// - Storage replication is disabled
    /// - The location limit is reached
    pub fn add_storage(&mut self, location: &str) -> Result<EntryId, EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(STORAGE_GROUP)?;
        let replication = self.document.is_truthy(REPLICATION_FLAG);
        let id = self.storage.add_entry(location, replication)?;
        if let Some(entry) = self.storage.entry_mut(id) {
            sanitize_fields(entry, &self.table);
        }
        self.changed();
        Ok(id)
    }

    /// Remove a storage location by identity
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist or may not be removed
    pub fn remove_storage(&mut self, id: EntryId) -> Result<StorageBackendEntry, EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(STORAGE_GROUP)?;
        let location = self.entry(id)?.location.clone();
        if !self.storage.can_remove(&location) {
            return Err(EditRejection::CannotRemove { location });
        }
        let removed = self
            .storage
            .remove_entry(id)
            .ok_or(EditRejection::UnknownEntry)?;
        self.changed();
        Ok(removed)
    }

    /// Rename a storage location
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist or its current location
    /// is locked by the server
    pub fn set_storage_location(&mut self, id: EntryId, location: &str) -> Result<(), EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(STORAGE_GROUP)?;
        let current = self.entry(id)?.location.clone();
        if current == location {
            return Ok(());
        }
        if !self.storage.can_change_location(&current) {
            return Err(EditRejection::LocationLocked { location: current });
        }
        self.entry_mut(id)?.location = location.to_owned();
        self.changed();
        Ok(())
    }

    /// Switch a storage entry's engine and drop settings the new engine rejects
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist
    pub fn set_storage_engine(&mut self, id: EntryId, engine: EngineType) -> Result<(), EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(STORAGE_GROUP)?;
        let table = &self.table;
        let entry = self
            .storage
            .entry_mut(id)
            .ok_or(EditRejection::UnknownEntry)?;
        entry.engine_type = engine;
        sanitize_fields(entry, table);
        self.changed();
        Ok(())
    }

    /// Set one engine setting of a storage entry; `null` removes it
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist or its engine does not
    /// accept the field
    pub fn set_storage_field(
        &mut self,
        id: EntryId,
        field: &str,
        value: Value,
    ) -> Result<(), EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(STORAGE_GROUP)?;
        let table = &self.table;
        let entry = self
            .storage
            .entry_mut(id)
            .ok_or(EditRejection::UnknownEntry)?;
        if let Some(fields) = table.fields_for(&entry.engine_type)
            && !fields.iter().any(|f| f.name == field)
        {
            return Err(EditRejection::UnknownEngineField {
                engine: entry.engine_type.clone(),
                field: field.to_owned(),
            });
        }

        if value.is_null() {
            entry.engine_config.remove(field);
        } else {
            entry.engine_config.insert(field.to_owned(), value);
        }
        self.changed();
        Ok(())
    }

    /// Mark or unmark a storage entry as a default location
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist
    pub fn set_default_location(&mut self, id: EntryId, is_default: bool) -> Result<(), EditRejection> {
        self.ensure_editable()?;
        self.ensure_writable(STORAGE_GROUP)?;
        self.entry_mut(id)?.is_default_location = is_default;
        self.changed();
        Ok(())
    }

    /// The first blocking issue in document order
    #[must_use]
    #[inline]
    pub fn first_invalid(&self) -> Option<&ValidationIssue> {
        self.errors.first_invalid()
    }

    /// Gate submission and produce the document to send
    ///
    /// On success the session is `Submitting` until the host reports back
    /// with [`EditorSession::mark_saved`] or
    /// [`EditorSession::submission_failed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not ready or any blocking issue
    /// remains
    pub fn prepare_submission(&mut self) -> Result<RawConfigDocument, EditRejection> {
        self.ensure_editable()?;
        self.revalidate();
        if let Some(issue) = self.errors.first_invalid() {
            return Err(EditRejection::Blocked {
                issue: issue.to_string(),
            });
        }

        self.document.insert(SETUP_COMPLETE, Value::Bool(true));
        if self.mode == ValidationMode::Setup {
            if !self.document.is_truthy(DATABASE_SECRET_KEY) {
                self.document.insert(
                    DATABASE_SECRET_KEY,
                    Value::String(Uuid::new_v4().to_string()),
                );
            }
            self.document.insert(TESTING, Value::Bool(false));
        }
        self.state = SessionState::Submitting;
        debug!("Submitting configuration");
        Ok(self.document.clone())
    }

    /// The host stored the submitted document
    pub fn mark_saved(&mut self) {
        if self.state != SessionState::Submitting {
            warn!("mark_saved called while {}", self.state);
        }
        if self.stale {
            self.revalidate();
        }
        self.state = SessionState::Saved;
        self.has_changes = false;
        info!("Configuration saved");
    }

    /// The host failed to store the submitted document; editing continues
    pub fn submission_failed(&mut self) {
        if self.state == SessionState::Submitting {
            self.state = SessionState::Ready;
            if self.stale {
                self.revalidate();
            }
        }
    }

    /// Gate, submit to the store and record the outcome
    ///
    /// # Errors
    ///
    /// Returns an error if submission is blocked or the store fails
    pub fn save_to(&mut self, store: &dyn ConfigStore) -> Result<()> {
        let document = self.prepare_submission()?;
        match store.submit(&document) {
            Ok(()) => {
                self.mark_saved();
                Ok(())
            }
            Err(e) => {
                self.submission_failed();
                Err(e)
            }
        }
    }

    fn ensure_editable(&self) -> Result<(), EditRejection> {
        match self.state {
            SessionState::Ready | SessionState::Saved => Ok(()),
            state => Err(EditRejection::NotReady { state }),
        }
    }

    fn ensure_writable(&self, group: &str) -> Result<(), EditRejection> {
        if self.is_read_only(group) {
            return Err(EditRejection::ReadOnly {
                group: group.to_owned(),
            });
        }
        Ok(())
    }

    fn entry(&self, id: EntryId) -> Result<&StorageBackendEntry, EditRejection> {
        self.storage.entry(id).ok_or(EditRejection::UnknownEntry)
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut StorageBackendEntry, EditRejection> {
        self.storage.entry_mut(id).ok_or(EditRejection::UnknownEntry)
    }

    fn changed(&mut self) {
        self.has_changes = true;
        self.revalidate();
    }

    /// Fold storage into the document, cascade and validate
    ///
    /// While two entries share a location the document keeps its last
    /// consistent storage keys; the collision is reported as a location issue.
    fn revalidate(&mut self) {
        self.state = SessionState::Validating;
        self.stale = false;
        let duplicates = self.storage.duplicate_locations();
        if duplicates.is_empty() {
            self.storage.write_into(&mut self.document);
        } else {
            debug!("Storage locations {duplicates:?} collide, not folding storage into the document");
        }
        self.last_cascades = apply_cascades(&mut self.document);

        let context = ValidationContext {
            table: &self.table,
            uploaded_files: &self.uploaded_files,
        };
        self.errors = validate(&self.document, self.storage.entries(), context);
        for (index, entry) in self.storage.entries_mut().enumerate() {
            entry.validation_errors = self.errors.entry_errors(index);
        }
        self.state = SessionState::Ready;
    }
}
