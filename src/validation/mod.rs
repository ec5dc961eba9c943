//! Validation and consistency engine
//!
//! [`validate`] recomputes the full set of problems for a document and its
//! storage list on every call. Every rule runs independently, so an early
//! failure never hides a later one. [`apply_cascades`] performs the few
//! automatic corrections one field forces on another.

pub mod cascade;

pub use cascade::{Cascade, apply_cascades};

use crate::config::validation::{validate_git_host, validate_pattern, validate_server_hostname};
use crate::config::{RawConfigDocument, is_truthy};
use crate::mapper::database::{DB_URI, DatabaseFields};
use crate::mapper::endpoints::{self, EndpointProvider};
use crate::mapper::oidc::{self, OidcProviderId};
use crate::mapper::{EndpointKind, ViewField, project_field};
use crate::storage::{
    EngineField, EngineSchemaTable, EntryErrorCategory, FieldKind, REPLICATION_FLAG,
    StorageBackendEntry,
};
use core::fmt;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const SERVER_HOSTNAME: &str = "SERVER_HOSTNAME";

/// What part of the configuration an issue is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "scope", content = "target", rename_all = "lowercase")]
#[non_exhaustive]
pub enum Scope {
    /// The configuration as a whole
    Global,
    /// A view field (by its display name) or a raw document key
    Field(String),
    /// A storage entry, by index in the ordered list
    Entry(usize),
}

impl fmt::Display for Scope {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Global => f.write_str("global"),
            Self::Field(ref name) => f.write_str(name),
            Self::Entry(index) => write!(f, "storage[{index}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum IssueCategory {
    Location,
    Engine,
    Field,
    File,
    Format,
    Provider,
}

impl IssueCategory {
    /// The storage entry category this maps to, for entry-scoped issues
    #[must_use]
    #[inline]
    pub const fn entry_category(self) -> Option<EntryErrorCategory> {
        match self {
            Self::Location => Some(EntryErrorCategory::Location),
            Self::Engine => Some(EntryErrorCategory::Engine),
            Self::Field => Some(EntryErrorCategory::Field),
            Self::File => Some(EntryErrorCategory::File),
            Self::Format | Self::Provider => None,
        }
    }
}

/// A single problem found by [`validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct ValidationIssue {
    #[serde(flatten)]
    pub scope: Scope,
    pub category: IssueCategory,
    pub message: String,
    /// Whether the issue prevents submission
    pub blocking: bool,
}

impl ValidationIssue {
    #[inline]
    fn blocking(scope: Scope, category: IssueCategory, message: String) -> Self {
        Self {
            scope,
            category,
            message,
            blocking: true,
        }
    }

    #[inline]
    fn warning(scope: Scope, category: IssueCategory, message: String) -> Self {
        Self {
            scope,
            category,
            message,
            blocking: false,
        }
    }
}

impl fmt::Display for ValidationIssue {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = if self.blocking { "error" } else { "warning" };
        write!(f, "{level}: {}: {}", self.scope, self.message)
    }
}

/// Every issue found by one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrorSet {
    issues: Vec<ValidationIssue>,
}

impl ValidationErrorSet {
    #[must_use]
    #[inline]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether any issue prevents submission
    #[must_use]
    #[inline]
    pub fn is_blocking(&self) -> bool {
        self.issues.iter().any(|issue| issue.blocking)
    }

    /// Issues attached to the storage entry at `index`
    pub fn for_entry(&self, index: usize) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(move |issue| issue.scope == Scope::Entry(index))
    }

    /// Issues attached to a field or raw key
    pub fn for_field<'set>(
        &'set self,
        name: &'set str,
    ) -> impl Iterator<Item = &'set ValidationIssue> {
        self.issues
            .iter()
            .filter(move |issue| matches!(issue.scope, Scope::Field(ref f) if f == name))
    }

    /// Per-category messages for one storage entry
    ///
    /// The first message in each category wins.
    #[must_use]
    pub fn entry_errors(&self, index: usize) -> BTreeMap<EntryErrorCategory, String> {
        let mut errors = BTreeMap::new();
        for issue in self.for_entry(index) {
            if let Some(category) = issue.category.entry_category() {
                errors
                    .entry(category)
                    .or_insert_with(|| issue.message.clone());
            }
        }
        errors
    }

    /// The first blocking issue in document order
    ///
    /// View fields come first in their layout order, then raw keys in the
    /// order they were checked, then storage entries by index, then global
    /// issues.
    #[must_use]
    pub fn first_invalid(&self) -> Option<&ValidationIssue> {
        let layout = ViewField::all();
        self.issues
            .iter()
            .enumerate()
            .filter(|&(_, issue)| issue.blocking)
            .min_by_key(|&(position, issue)| {
                let rank = match issue.scope {
                    Scope::Field(ref name) => {
                        match layout.iter().position(|field| field.to_string() == *name) {
                            Some(index) => (0, index),
                            None => (1, 0),
                        }
                    }
                    Scope::Entry(index) => (2, index),
                    Scope::Global => (3, 0),
                };
                (rank, position)
            })
            .map(|(_, issue)| issue)
    }

    #[inline]
    fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

/// Host-supplied inputs validation needs besides the document
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'ctx> {
    pub table: &'ctx EngineSchemaTable,
    /// Names of files the host reports as uploaded
    pub uploaded_files: &'ctx BTreeSet<String>,
}

/// Feature flag guarding each Git provider's configuration
const GIT_PROVIDERS: [(&str, ViewField, EndpointProvider); 3] = [
    (
        "FEATURE_GITHUB_LOGIN",
        ViewField::GithubLoginKind,
        endpoints::GITHUB_LOGIN,
    ),
    (
        "FEATURE_GITHUB_BUILD",
        ViewField::GithubTriggerKind,
        endpoints::GITHUB_TRIGGER,
    ),
    (
        "FEATURE_GITLAB_BUILD",
        ViewField::GitlabTriggerKind,
        endpoints::GITLAB_TRIGGER,
    ),
];

/// Check a document and its storage list
///
/// Pure: neither the document nor the entries are touched.
#[must_use]
pub fn validate(
    document: &RawConfigDocument,
    entries: &[StorageBackendEntry],
    context: ValidationContext<'_>,
) -> ValidationErrorSet {
    let mut set = ValidationErrorSet::default();

    check_git_hosts(document, &mut set);
    check_database_uri(document, &mut set);
    check_server_hostname(document, &mut set);
    check_oidc_providers(document, &mut set);

    if entries.is_empty() {
        set.push(ValidationIssue::blocking(
            Scope::Global,
            IssueCategory::Location,
            "At least one storage location is required".to_owned(),
        ));
    }
    check_location_uniqueness(entries, &mut set);
    check_replication(document, entries, &mut set);
    for (index, entry) in entries.iter().enumerate() {
        check_entry_fields(index, entry, context, &mut set);
    }

    debug!(
        "Validation found {} issue(s), blocking: {}",
        set.len(),
        set.is_blocking()
    );
    set
}

fn check_location_uniqueness(entries: &[StorageBackendEntry], set: &mut ValidationErrorSet) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.location.as_str()).or_default() += 1;
    }

    for (index, entry) in entries.iter().enumerate() {
        if entry.location.is_empty() {
            set.push(ValidationIssue::blocking(
                Scope::Entry(index),
                IssueCategory::Location,
                "Storage location is required".to_owned(),
            ));
        } else if counts.get(entry.location.as_str()).copied().unwrap_or(0) > 1 {
            set.push(ValidationIssue::blocking(
                Scope::Entry(index),
                IssueCategory::Location,
                format!("Storage location '{}' is used more than once", entry.location),
            ));
        }
    }
}

fn check_replication(
    document: &RawConfigDocument,
    entries: &[StorageBackendEntry],
    set: &mut ValidationErrorSet,
) {
    if !document.is_truthy(REPLICATION_FLAG) {
        return;
    }
    for (index, entry) in entries.iter().enumerate() {
        if entry.engine_type.is_local() {
            set.push(ValidationIssue::blocking(
                Scope::Entry(index),
                IssueCategory::Engine,
                "Local storage cannot be used when storage replication is enabled".to_owned(),
            ));
        }
    }
}

fn check_entry_fields(
    index: usize,
    entry: &StorageBackendEntry,
    context: ValidationContext<'_>,
    set: &mut ValidationErrorSet,
) {
    let Some(fields) = context.table.fields_for(&entry.engine_type) else {
        set.push(ValidationIssue::warning(
            Scope::Entry(index),
            IssueCategory::Engine,
            format!(
                "Unknown storage engine '{}'; its settings are not checked",
                entry.engine_type
            ),
        ));
        return;
    };

    for field in fields {
        let value = entry.engine_config.get(&field.name);
        match field.kind {
            FieldKind::Bool | FieldKind::Map => {}
            FieldKind::File => check_file_field(index, entry, field, context, set),
            FieldKind::Option => {
                if let Some(value) = value.filter(|v| is_truthy(v)) {
                    if !field.values.is_empty() && !field.values.contains(value) {
                        set.push(ValidationIssue::blocking(
                            Scope::Entry(index),
                            IssueCategory::Field,
                            format!("Field '{}' has an unsupported value {value}", field.name),
                        ));
                    }
                } else if !field.optional {
                    set.push(missing_field(index, field));
                }
            }
            FieldKind::Text | FieldKind::Password => {
                let text = value.filter(|v| is_truthy(v)).map(|v| match *v {
                    Value::String(ref s) => s.clone(),
                    ref other => other.to_string(),
                });
                match text {
                    None if !field.optional => set.push(missing_field(index, field)),
                    None => {}
                    Some(text) => {
                        if let Some(pattern) = field.pattern.as_deref()
                            && let Err(message) = validate_pattern(&field.name, pattern, &text)
                        {
                            set.push(ValidationIssue::blocking(
                                Scope::Entry(index),
                                IssueCategory::Field,
                                message,
                            ));
                        }
                    }
                }
            }
        }
    }
}

fn missing_field(index: usize, field: &EngineField) -> ValidationIssue {
    ValidationIssue::blocking(
        Scope::Entry(index),
        IssueCategory::Field,
        format!("Field '{}' is required", field.name),
    )
}

/// Name under which the host stores an entry's uploaded file
#[must_use]
#[inline]
pub fn expected_file_name(location: &str, field: &EngineField) -> String {
    match field.file_suffix.as_deref() {
        Some(suffix) => format!("{location}-{suffix}"),
        None => field.name.clone(),
    }
}

fn check_file_field(
    index: usize,
    entry: &StorageBackendEntry,
    field: &EngineField,
    context: ValidationContext<'_>,
    set: &mut ValidationErrorSet,
) {
    if field.optional {
        return;
    }
    let expected = expected_file_name(&entry.location, field);
    if !context.uploaded_files.contains(&expected) {
        set.push(ValidationIssue::blocking(
            Scope::Entry(index),
            IssueCategory::File,
            format!("Upload '{expected}' for field '{}'", field.name),
        ));
    }
}

fn check_server_hostname(document: &RawConfigDocument, set: &mut ValidationErrorSet) {
    let Some(hostname) = document.get(SERVER_HOSTNAME).and_then(Value::as_str) else {
        return;
    };
    if hostname.is_empty() {
        return;
    }
    if let Err(message) = validate_server_hostname(hostname) {
        set.push(ValidationIssue::blocking(
            Scope::Field(SERVER_HOSTNAME.to_owned()),
            IssueCategory::Format,
            message,
        ));
    }
}

fn check_git_hosts(document: &RawConfigDocument, set: &mut ValidationErrorSet) {
    for (flag, field, provider) in GIT_PROVIDERS {
        if !document.is_truthy(flag) {
            continue;
        }
        let kind = project_field(document, field);
        if kind.as_text() != Some(EndpointKind::Enterprise.as_str()) {
            continue;
        }

        let endpoint = document
            .lookup(&provider.endpoint_path())
            .and_then(Value::as_str)
            .unwrap_or_default();
        let result = if endpoint.is_empty() {
            Err(format!(
                "{} is required for an enterprise installation",
                provider.endpoint_path()
            ))
        } else {
            validate_git_host(endpoint)
        };
        if let Err(message) = result {
            set.push(ValidationIssue::blocking(
                Scope::Field(field.to_string()),
                IssueCategory::Format,
                message,
            ));
        }
    }
}

fn check_database_uri(document: &RawConfigDocument, set: &mut ValidationErrorSet) {
    let Some(uri) = document.lookup(DB_URI) else {
        return;
    };
    let result = match *uri {
        Value::String(ref uri) => DatabaseFields::parse(uri).map(|_| ()),
        _ => Err(format!("{DB_URI} must be a string")),
    };
    if let Err(message) = result {
        set.push(ValidationIssue::blocking(
            Scope::Field(ViewField::Database.to_string()),
            IssueCategory::Format,
            message,
        ));
    }
}

fn check_oidc_providers(document: &RawConfigDocument, set: &mut ValidationErrorSet) {
    for id in oidc::providers(document) {
        if !id.is_well_formed() {
            set.push(ValidationIssue::blocking(
                Scope::Field(id.config_key()),
                IssueCategory::Provider,
                format!("Invalid ID for OIDC provider '{id}': must be alphanumeric uppercase"),
            ));
        }
        check_provider_config(document, &id, set);
    }
}

fn check_provider_config(
    document: &RawConfigDocument,
    id: &OidcProviderId,
    set: &mut ValidationErrorSet,
) {
    let key = id.config_key();
    if document.get(&key).is_some_and(|v| !v.is_object()) {
        set.push(ValidationIssue::blocking(
            Scope::Field(key.clone()),
            IssueCategory::Provider,
            format!("{key} must be a mapping"),
        ));
    }
}
