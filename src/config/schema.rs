//! JSON Schema validation for host-supplied storage engine tables

use anyhow::{Result, anyhow};
use jsonschema::Validator;
use serde_json::Value;

/// Get the embedded JSON schema for storage engine tables
///
/// # Errors
///
/// Returns an error if the embedded schema cannot be parsed or compiled
pub fn get_schema() -> Result<Validator> {
    let schema_str = include_str!("../../docs/engine-schema.json");
    let schema: Value = serde_json::from_str(schema_str)
        .map_err(|e| anyhow!("Failed to parse embedded JSON schema: {}", e))?;

    jsonschema::draft7::new(&schema).map_err(|e| anyhow!("Failed to compile JSON schema: {}", e))
}

/// Validate an engine table value against the schema
///
/// # Errors
///
/// Returns an error listing every schema violation found
pub fn validate_engine_table(table: &Value) -> Result<()> {
    let schema = get_schema()?;

    let error_messages: Vec<String> = schema
        .iter_errors(table)
        .map(|e| format!("  - {e}"))
        .collect();

    if !error_messages.is_empty() {
        return Err(anyhow!(
            "Engine schema validation failed:\n{}",
            error_messages.join("\n")
        ));
    }

    Ok(())
}
