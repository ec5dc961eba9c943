//! Automatic corrections one configuration flag forces on another

use crate::config::RawConfigDocument;
use crate::mapper::LogsModel;
use crate::mapper::logs::LOGS_MODEL;
use core::fmt;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const INTERNAL_OIDC_SERVICE_ID: &str = "INTERNAL_OIDC_SERVICE_ID";
pub const FEATURE_DIRECT_LOGIN: &str = "FEATURE_DIRECT_LOGIN";
pub const FEATURE_USER_CREATION: &str = "FEATURE_USER_CREATION";
pub const FEATURE_INVITE_ONLY_USER_CREATION: &str = "FEATURE_INVITE_ONLY_USER_CREATION";

/// A correction [`apply_cascades`] made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Cascade {
    /// An internal OIDC service turned direct login off
    DirectLoginDisabled,
    /// User creation being off turned invite-only creation off
    InviteOnlyDisabled,
    /// An empty logs model was reset to `database`
    LogsModelReset,
}

impl fmt::Display for Cascade {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::DirectLoginDisabled => write!(
                f,
                "{FEATURE_DIRECT_LOGIN} set to false because {INTERNAL_OIDC_SERVICE_ID} is set"
            ),
            Self::InviteOnlyDisabled => write!(
                f,
                "{FEATURE_INVITE_ONLY_USER_CREATION} set to false because {FEATURE_USER_CREATION} is off"
            ),
            Self::LogsModelReset => write!(f, "{LOGS_MODEL} reset to database"),
        }
    }
}

/// Apply every cascading correction the document calls for
///
/// Only corrections that actually changed the document are returned, so a
/// second call on the same document returns nothing.
pub fn apply_cascades(document: &mut RawConfigDocument) -> Vec<Cascade> {
    let mut applied = Vec::new();

    if document.is_truthy(INTERNAL_OIDC_SERVICE_ID)
        && force_false(document, FEATURE_DIRECT_LOGIN)
    {
        applied.push(Cascade::DirectLoginDisabled);
    }

    if document.get(FEATURE_USER_CREATION) == Some(&Value::Bool(false))
        && force_false(document, FEATURE_INVITE_ONLY_USER_CREATION)
    {
        applied.push(Cascade::InviteOnlyDisabled);
    }

    let model_missing = match document.get(LOGS_MODEL) {
        None | Some(&Value::Null) => true,
        Some(&Value::String(ref model)) => model.is_empty(),
        Some(_) => false,
    };
    if model_missing {
        document.insert(
            LOGS_MODEL,
            Value::String(LogsModel::Database.as_str().to_owned()),
        );
        applied.push(Cascade::LogsModelReset);
    }

    for cascade in &applied {
        debug!("Cascade: {cascade}");
    }
    applied
}

/// Set a flag to `false`, returning whether it changed
fn force_false(document: &mut RawConfigDocument, key: &str) -> bool {
    if document.get(key) == Some(&Value::Bool(false)) {
        return false;
    }
    document.insert(key, Value::Bool(false));
    true
}
