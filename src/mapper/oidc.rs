//! OIDC login providers stored as `<ID>_LOGIN_CONFIG` sub-maps

use crate::config::RawConfigDocument;
use core::fmt;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::info;

pub const LOGIN_CONFIG_SUFFIX: &str = "_LOGIN_CONFIG";

/// Providers with their own, differently shaped configuration
pub const RESERVED_PROVIDERS: [&str; 2] = ["GITHUB", "GOOGLE"];

static PROVIDER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9]+$").expect("provider id pattern is a valid regex")
});

/// Why a provider id was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderRejection {
    #[error("Invalid ID for OIDC provider: must not be empty")]
    Empty,

    #[error("Invalid ID for OIDC provider '{0}': must be alphanumeric")]
    NotAlphanumeric(String),

    #[error("Invalid ID for OIDC provider '{0}': cannot be a reserved name")]
    Reserved(String),

    #[error("Invalid ID for OIDC provider '{0}': already exists")]
    AlreadyExists(String),
}

/// A validated, uppercase OIDC provider identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OidcProviderId(String);

impl OidcProviderId {
    /// Normalize and validate a user-entered identifier
    ///
    /// Input is uppercased first, so `okta` and `OKTA` name the same provider.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The identifier is empty
    /// - It contains anything other than ASCII letters and digits
    /// - It is one of the reserved provider names
    pub fn parse(raw: &str) -> Result<Self, ProviderRejection> {
        let id = raw.trim().to_uppercase();
        if id.is_empty() {
            return Err(ProviderRejection::Empty);
        }
        if !PROVIDER_ID_PATTERN.is_match(&id) {
            return Err(ProviderRejection::NotAlphanumeric(id));
        }
        if RESERVED_PROVIDERS.contains(&id.as_str()) {
            return Err(ProviderRejection::Reserved(id));
        }
        Ok(Self(id))
    }

    /// Recover the provider from a document key, if it names a generic provider
    ///
    /// The key is not required to satisfy [`OidcProviderId::parse`]; the
    /// document may have been written by hand.
    #[must_use]
    pub fn from_config_key(key: &str) -> Option<Self> {
        let id = key.strip_suffix(LOGIN_CONFIG_SUFFIX)?;
        if id.is_empty() || RESERVED_PROVIDERS.contains(&id) {
            return None;
        }
        Some(Self(id.to_owned()))
    }

    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document key holding this provider's configuration
    #[must_use]
    #[inline]
    pub fn config_key(&self) -> String {
        format!("{}{LOGIN_CONFIG_SUFFIX}", self.0)
    }

    /// Whether the id would pass [`OidcProviderId::parse`]
    #[must_use]
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        PROVIDER_ID_PATTERN.is_match(&self.0)
    }
}

impl fmt::Display for OidcProviderId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generic OIDC providers configured in the document, in key order
#[must_use]
pub fn providers(document: &RawConfigDocument) -> Vec<OidcProviderId> {
    document
        .keys()
        .filter_map(|key| OidcProviderId::from_config_key(key))
        .collect()
}

/// Add a provider with an empty configuration
///
/// A rejected id leaves the document untouched.
///
/// # Errors
///
/// Returns an error if the id is invalid, reserved, or already configured
pub fn add_provider(
    document: &mut RawConfigDocument,
    raw_id: &str,
) -> Result<OidcProviderId, ProviderRejection> {
    let id = OidcProviderId::parse(raw_id)?;
    let key = id.config_key();
    if document.contains_key(&key) {
        return Err(ProviderRejection::AlreadyExists(id.0));
    }

    document.insert(key, Value::Object(Map::new()));
    info!("Added OIDC provider {id}");
    Ok(id)
}

/// Remove a provider's configuration outright
///
/// Returns whether anything was removed.
pub fn remove_provider(document: &mut RawConfigDocument, id: &OidcProviderId) -> bool {
    let removed = document.remove(&id.config_key()).is_some();
    if removed {
        info!("Removed OIDC provider {id}");
    }
    removed
}
