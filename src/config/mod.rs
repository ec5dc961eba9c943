//! Configuration document module
//!
//! Holds the raw configuration document, its YAML persistence, field-level
//! format validators and the JSON schema check for engine tables

pub mod document;
pub mod schema;
pub mod validation;
pub mod yaml;

pub use document::{RawConfigDocument, child_object, ensure_object, is_truthy};

use crate::system::System;

impl RawConfigDocument {
    /// Load a document from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from_file(system: &dyn System, path: &str) -> anyhow::Result<Self> {
        yaml::load_document(system, path)
    }

    /// Save the document as YAML
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_to_file(&self, system: &dyn System, path: &str) -> anyhow::Result<()> {
        yaml::save_document(system, path, self)
    }
}
