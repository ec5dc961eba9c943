//! The raw configuration document exchanged with the configuration service

use crate::error::EditorError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped configuration tree, keyed by upper-snake-case names
///
/// Absence of a key means "unset", which is not the same thing as an empty
/// string or `false` for several fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawConfigDocument(Map<String, Value>);

impl RawConfigDocument {
    /// Create an empty document
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a document from an arbitrary JSON value
    ///
    /// `null` is accepted as an empty document, since an empty YAML file
    /// deserializes to it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The value is neither an object nor `null`
    #[inline]
    pub fn from_value(value: Value) -> Result<Self, EditorError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(EditorError::document(format!(
                "Configuration document must be a mapping, found {}",
                kind_name(&other)
            ))),
        }
    }

    /// Consume the document and return it as a JSON value
    #[must_use]
    #[inline]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Borrow the underlying map
    #[must_use]
    #[inline]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Get a top-level value
    #[must_use]
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a top-level value mutably
    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Check whether a top-level key is present (even if `null`)
    #[must_use]
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set a top-level value, returning the previous one
    #[inline]
    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Remove a top-level value
    #[inline]
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Iterate over top-level keys
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Resolve a dot-separated path such as `GITHUB_LOGIN_CONFIG.GITHUB_ENDPOINT`
    ///
    /// Any missing or falsy segment along the way resolves to `None`, so a
    /// partially filled document never causes an error here.
    #[must_use]
    #[inline]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.0.get(first).filter(|v| is_truthy(v))?;
        for part in parts {
            current = current.get(part).filter(|v| is_truthy(v))?;
        }
        Some(current)
    }

    /// Check whether a top-level key holds a truthy value
    #[must_use]
    #[inline]
    pub fn is_truthy(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_truthy)
    }

    /// Borrow a nested mapping, if the key holds one
    #[must_use]
    #[inline]
    pub fn section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Borrow a nested mapping mutably, creating it when absent
    ///
    /// A key that holds something other than a mapping is replaced by an
    /// empty one.
    #[inline]
    pub fn section_mut(&mut self, key: &str) -> &mut Map<String, Value> {
        ensure_object(self.0.entry(key.to_owned()).or_insert(Value::Null))
    }
}

impl From<Map<String, Value>> for RawConfigDocument {
    #[inline]
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Truthiness as the configuration tool has always understood it
///
/// `null`, `false`, `0`, the empty string are falsy; everything else,
/// including empty mappings and lists, is truthy.
#[must_use]
#[inline]
pub fn is_truthy(value: &Value) -> bool {
    match *value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(ref n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(ref s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Turn a value slot into a mapping in place and borrow it
#[inline]
pub fn ensure_object(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match *slot {
        Value::Object(ref mut map) => map,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

/// Borrow a nested mapping inside another mapping, creating it when absent
#[inline]
pub fn child_object<'map>(
    parent: &'map mut Map<String, Value>,
    key: &str,
) -> &'map mut Map<String, Value> {
    ensure_object(parent.entry(key.to_owned()).or_insert(Value::Null))
}

const fn kind_name(value: &Value) -> &'static str {
    match *value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
