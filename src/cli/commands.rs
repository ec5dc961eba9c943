//! CLI command implementations

use crate::cli::{Args, Command, OidcAction, OutputFormat, StorageAction};
use crate::config::RawConfigDocument;
use crate::config::yaml::{load_document, load_engine_table, save_document};
use crate::error::EditorError;
use crate::mapper::{
    DatabaseFields, ElasticsearchKey, FieldValue, RedisKey, ViewField, WriteOutcome,
};
use crate::sections::active_sections;
use crate::session::{ConfigStore, EditRejection, EditorSession, ValidationMode};
use crate::storage::{EngineSchemaTable, EngineType, EntryId};
use crate::system::System;
use anyhow::{Context as _, Result};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Configuration document kept in a file, with uploaded files next to it
pub struct FileStore<'sys> {
    system: &'sys dyn System,
    path: String,
}

impl<'sys> FileStore<'sys> {
    #[must_use]
    #[inline]
    pub fn new(system: &'sys dyn System, path: &str) -> Self {
        Self {
            system,
            path: path.to_owned(),
        }
    }

    /// Write the working document without gating it
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    #[inline]
    pub fn write_draft(&self, document: &RawConfigDocument) -> Result<()> {
        save_document(self.system, &self.path, document)
    }
}

impl ConfigStore for FileStore<'_> {
    fn fetch(&self) -> Result<RawConfigDocument> {
        load_document(self.system, &self.path)
    }

    fn submit(&self, document: &RawConfigDocument) -> Result<()> {
        save_document(self.system, &self.path, document)
    }

    fn uploaded_files(&self) -> Result<BTreeSet<String>> {
        let config_path = Path::new(&self.path);
        let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(BTreeSet::new());
        };

        let entries = self
            .system
            .read_dir(dir)
            .with_context(|| format!("Failed to list uploaded files in {}", dir.display()))?;

        Ok(entries
            .into_iter()
            .filter(|path| path.as_path() != config_path && self.system.is_file(path))
            .filter_map(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_owned)
            })
            .collect())
    }
}

/// Run the parsed command against the configuration at `args.config`
///
/// # Errors
///
/// Returns an error if the document cannot be loaded or saved, an edit is
/// rejected, or validation blocks the command
pub fn execute(args: &Args, system: &dyn System) -> Result<()> {
    let format = args
        .output_format
        .parse::<OutputFormat>()
        .map_err(EditorError::configuration)?;

    let table = match args.engine_schema.as_deref() {
        Some(path) => load_engine_table(system, path)?,
        None => EngineSchemaTable::builtin(),
    };
    let mode = if args.setup {
        ValidationMode::Setup
    } else {
        ValidationMode::Online
    };

    let store = FileStore::new(system, &args.config);
    let mut session =
        EditorSession::new(table, mode).with_read_only_groups(args.read_only.iter().cloned());
    session.load(&store)?;

    match args.command {
        Command::Show { ref fields } => show(&session, fields, format),
        Command::Set {
            ref field,
            ref value,
        } => {
            set(&mut session, field, value)?;
            store.write_draft(session.document())
        }
        Command::Validate => report_validation(&session, format),
        Command::Storage { ref action } => {
            if storage(&mut session, action.as_ref(), format)? {
                store.write_draft(session.document())?;
            }
            Ok(())
        }
        Command::Oidc { ref action } => {
            if oidc(&mut session, action, format)? {
                store.write_draft(session.document())?;
            }
            Ok(())
        }
        Command::Sections => {
            let sections = active_sections(session.document());
            print_items(format, &sections, |s| format!("{}: {}", s.id, s.title))
        }
        Command::Save => save(&mut session, &store),
    }
}

fn show(session: &EditorSession, fields: &[String], format: OutputFormat) -> Result<()> {
    let projected = if fields.is_empty() {
        session.project_all()
    } else {
        fields
            .iter()
            .map(|name| -> Result<(ViewField, FieldValue)> {
                let field = name
                    .parse::<ViewField>()
                    .map_err(EditorError::configuration)?;
                Ok((field, session.project(field)))
            })
            .collect::<Result<Vec<_>>>()?
    };

    match format {
        OutputFormat::Json => {
            let map: Map<String, Value> = projected
                .iter()
                .map(|&(field, ref value)| -> Result<(String, Value)> {
                    Ok((field.to_string(), serde_json::to_value(value)?))
                })
                .collect::<Result<_>>()?;
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Text => {
            for (field, value) in projected {
                println!("{field}: {value}");
            }
        }
    }
    Ok(())
}

fn set(session: &mut EditorSession, name: &str, raw: &str) -> Result<()> {
    let Ok(field) = name.parse::<ViewField>() else {
        if name.is_empty() || name.contains('.') {
            return Err(EditorError::configuration(format!(
                "Unknown field: {name}. Raw keys must be top-level"
            ))
            .into());
        }
        session
            .set_raw(name, parse_scalar(raw))
            .map_err(rejection)?;
        info!("Set {name}");
        return Ok(());
    };

    let value = field_value(field, raw)?;
    match session.apply(field, &value).map_err(rejection)? {
        WriteOutcome::Applied(affected) => {
            info!("Set {field}");
            for other in affected {
                debug!("{other} is now {}", session.project(other));
            }
            Ok(())
        }
        WriteOutcome::Ignored => {
            info!("Nothing to change for {field}");
            Ok(())
        }
        WriteOutcome::Deferred(reason) | WriteOutcome::Malformed(reason) => {
            Err(EditorError::rejected(format!("{field} not updated: {reason}")).into())
        }
    }
}

/// Turn command-line text into the value a field expects
fn field_value(field: ViewField, raw: &str) -> Result<FieldValue> {
    match field {
        ViewField::Database => {
            if raw.is_empty() {
                return Ok(FieldValue::Unset);
            }
            DatabaseFields::parse(raw)
                .map(FieldValue::Database)
                .map_err(|e| EditorError::configuration(e).into())
        }
        ViewField::Redis(RedisKey::Port) | ViewField::Elasticsearch(ElasticsearchKey::Port) => {
            Ok(raw
                .parse::<u64>()
                .map_or_else(|_| FieldValue::text(raw), |port| FieldValue::Number(Number::from(port))))
        }
        _ => Ok(FieldValue::text(raw)),
    }
}

/// Read a raw value as YAML, falling back to a plain string
fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

fn report_validation(session: &EditorSession, format: OutputFormat) -> Result<()> {
    let errors = session.validation();
    for cascade in session.last_cascades() {
        info!("{cascade}");
    }
    print_items(format, errors.issues(), ToString::to_string)?;

    if let Some(first) = errors.first_invalid() {
        let blocking = errors.issues().iter().filter(|i| i.blocking).count();
        return Err(EditorError::validation(format!(
            "{blocking} blocking issue(s); first: {} ({})",
            first.message, first.scope
        ))
        .into());
    }
    if format == OutputFormat::Text && errors.is_empty() {
        println!("Configuration is valid");
    }
    Ok(())
}

/// Returns whether the document changed
fn storage(
    session: &mut EditorSession,
    action: Option<&StorageAction>,
    format: OutputFormat,
) -> Result<bool> {
    let Some(action) = action.filter(|a| !matches!(**a, StorageAction::List)) else {
        print_items(format, session.storage().entries(), |entry| {
            let default = if entry.is_default_location { " (default)" } else { "" };
            let mut line = format!("{} [{}]{default}", entry.location, entry.engine_type);
            for (category, message) in &entry.validation_errors {
                line.push_str(&format!("\n  {category:?}: {message}"));
            }
            line
        })?;
        return Ok(false);
    };

    match *action {
        StorageAction::Add {
            ref location,
            ref engine,
        } => {
            let id = session.add_storage(location).map_err(rejection)?;
            if let Some(engine) = engine {
                session
                    .set_storage_engine(id, EngineType::from(engine.clone()))
                    .map_err(rejection)?;
            }
        }
        StorageAction::Remove { ref location } => {
            let id = entry_id(session, location)?;
            session.remove_storage(id).map_err(rejection)?;
        }
        StorageAction::Rename {
            ref location,
            ref new_location,
        } => {
            let id = entry_id(session, location)?;
            session
                .set_storage_location(id, new_location)
                .map_err(rejection)?;
        }
        StorageAction::Engine {
            ref location,
            ref engine,
        } => {
            let id = entry_id(session, location)?;
            session
                .set_storage_engine(id, EngineType::from(engine.clone()))
                .map_err(rejection)?;
        }
        StorageAction::Field {
            ref location,
            ref field,
            ref value,
        } => {
            let id = entry_id(session, location)?;
            session
                .set_storage_field(id, field, parse_scalar(value))
                .map_err(rejection)?;
        }
        StorageAction::Default {
            ref location,
            enabled,
        } => {
            let id = entry_id(session, location)?;
            session
                .set_default_location(id, enabled)
                .map_err(rejection)?;
        }
        StorageAction::List => {}
    }

    if let Some(location) = session.storage().duplicate_locations().first() {
        return Err(EditorError::validation(format!(
            "Storage location '{location}' is used more than once; the configuration was not written"
        ))
        .into());
    }

    for entry in session.storage().entries() {
        for message in entry.validation_errors.values() {
            warn!("{}: {message}", entry.location);
        }
    }
    Ok(true)
}

fn entry_id(session: &EditorSession, location: &str) -> Result<EntryId> {
    session
        .storage()
        .entries()
        .iter()
        .find(|entry| entry.location == location)
        .map(|entry| entry.id)
        .ok_or_else(|| {
            EditorError::rejected(format!("No storage location named '{location}'")).into()
        })
}

/// Returns whether the document changed
fn oidc(session: &mut EditorSession, action: &OidcAction, format: OutputFormat) -> Result<bool> {
    match *action {
        OidcAction::List => {
            print_items(format, &session.oidc_providers(), ToString::to_string)?;
            Ok(false)
        }
        OidcAction::Add { ref id } => {
            let added = session.add_oidc_provider(id).map_err(rejection)?;
            info!("Add the client settings under {}", added.config_key());
            Ok(true)
        }
        OidcAction::Remove { ref id } => {
            let wanted = id.trim().to_uppercase();
            let provider = session
                .oidc_providers()
                .into_iter()
                .find(|p| p.as_str() == wanted)
                .ok_or_else(|| EditorError::rejected(format!("No OIDC provider named '{id}'")))?;
            session.remove_oidc_provider(&provider).map_err(rejection)
        }
    }
}

fn save(session: &mut EditorSession, store: &FileStore<'_>) -> Result<()> {
    let document = session.prepare_submission().map_err(rejection)?;
    if let Err(e) = store.submit(&document) {
        session.submission_failed();
        return Err(e);
    }
    session.mark_saved();
    Ok(())
}

/// Map a refused edit to the error kind that sets the exit code
fn rejection(refused: EditRejection) -> anyhow::Error {
    match refused {
        EditRejection::Blocked { .. } => EditorError::validation(refused.to_string()).into(),
        other => EditorError::rejected(other.to_string()).into(),
    }
}

fn print_items<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    render: impl Fn(&T) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Text => {
            for item in items {
                println!("{}", render(item));
            }
        }
    }
    Ok(())
}
