//! YAML loading and saving of configuration documents and engine tables

use crate::config::RawConfigDocument;
use crate::error::EditorError;
use crate::storage::EngineSchemaTable;
use crate::system::System;
use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use tracing::debug;

/// Load and parse a YAML configuration document from file
///
/// # Errors
///
/// Returns an error if:
/// - The file does not exist or cannot be read
/// - The file is not valid YAML
/// - The top level of the file is not a mapping
pub fn load_document(system: &dyn System, path: &str) -> Result<RawConfigDocument> {
    let path_obj = Path::new(path);

    if !system.exists(path_obj) {
        return Err(EditorError::configuration(format!(
            "Configuration file not found: {path}\n\
            Point --config at the registry's config.yaml"
        ))
        .into());
    }

    let content = system
        .read_to_string(path_obj)
        .with_context(|| format!("Failed to read configuration file: {path}"))?;

    parse_document(&content)
        .with_context(|| format!("Failed to parse configuration document in file: {path}"))
}

/// Parse a YAML (or JSON) string into a configuration document
///
/// # Errors
///
/// Returns an error if:
/// - The string is not valid YAML
/// - The top level is not a mapping
pub fn parse_document(content: &str) -> Result<RawConfigDocument> {
    let value: serde_json::Value = serde_yaml::from_str(content)
        .map_err(|e| EditorError::document(format!("Invalid YAML: {e}")))?;
    Ok(RawConfigDocument::from_value(value)?)
}

/// Serialize a document and write it to file
///
/// # Errors
///
/// Returns an error if:
/// - The document cannot be serialized
/// - The file cannot be written
pub fn save_document(system: &dyn System, path: &str, document: &RawConfigDocument) -> Result<()> {
    let rendered = serde_yaml::to_string(document)
        .map_err(|e| anyhow!("Failed to serialize configuration document: {e}"))?;

    system
        .write(Path::new(path), rendered.as_bytes())
        .map_err(|e| EditorError::filesystem(format!("Failed to write {path}: {e}")))?;

    debug!("Wrote configuration document to {path}");
    Ok(())
}

/// Load a storage engine schema table from a YAML file
///
/// The file is checked against the embedded JSON schema before it is
/// deserialized.
///
/// # Errors
///
/// Returns an error if:
/// - The file does not exist or cannot be read
/// - The file does not satisfy the engine table schema
pub fn load_engine_table(system: &dyn System, path: &str) -> Result<EngineSchemaTable> {
    let path_obj = Path::new(path);

    if !system.exists(path_obj) {
        return Err(
            EditorError::configuration(format!("Engine schema file not found: {path}")).into(),
        );
    }

    let content = system
        .read_to_string(path_obj)
        .with_context(|| format!("Failed to read engine schema file: {path}"))?;

    let value: serde_json::Value = serde_yaml::from_str(&content)
        .map_err(|e| EditorError::configuration(format!("Invalid YAML in {path}: {e}")))?;

    crate::config::schema::validate_engine_table(&value)
        .context("Engine schema validation failed")?;

    let table: EngineSchemaTable = serde_json::from_value(value)
        .map_err(|e| EditorError::configuration(format!("Invalid engine schema in {path}: {e}")))?;

    debug!("Loaded {} storage engine definitions from {path}", table.len());
    Ok(table)
}
