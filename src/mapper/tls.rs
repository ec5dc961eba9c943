//! TLS tri-state derived from `PREFERRED_URL_SCHEME` and `EXTERNAL_TLS_TERMINATION`

use super::{FieldValue, WriteOutcome};
use crate::config::RawConfigDocument;
use core::fmt;
use core::str::FromStr;
use serde_json::Value;

pub const SCHEME_KEY: &str = "PREFERRED_URL_SCHEME";
pub const TERMINATION_KEY: &str = "EXTERNAL_TLS_TERMINATION";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsSetting {
    None,
    InternalTls,
    ExternalTls,
}

impl TlsSetting {
    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::InternalTls => "internal-tls",
            Self::ExternalTls => "external-tls",
        }
    }
}

impl FromStr for TlsSetting {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "internal-tls" => Ok(Self::InternalTls),
            "external-tls" => Ok(Self::ExternalTls),
            _ => Err(format!(
                "Invalid TLS setting: {s}. Use 'none', 'internal-tls' or 'external-tls'"
            )),
        }
    }
}

impl fmt::Display for TlsSetting {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn project(document: &RawConfigDocument) -> FieldValue {
    let setting = if document.get(SCHEME_KEY).and_then(Value::as_str) == Some("https") {
        if document.get(TERMINATION_KEY) == Some(&Value::Bool(true)) {
            TlsSetting::ExternalTls
        } else {
            TlsSetting::InternalTls
        }
    } else {
        TlsSetting::None
    };
    FieldValue::text(setting.as_str())
}

pub(crate) fn apply(document: &mut RawConfigDocument, value: &FieldValue) -> WriteOutcome {
    if matches!(*value, FieldValue::Unset) {
        return WriteOutcome::Ignored;
    }
    let setting = match value.as_text().map(str::parse::<TlsSetting>) {
        Some(Ok(setting)) => setting,
        Some(Err(e)) => return WriteOutcome::Malformed(e),
        None => return WriteOutcome::Malformed(format!("Invalid TLS setting: {value}")),
    };

    match setting {
        TlsSetting::None => {
            document.insert(SCHEME_KEY, Value::String("http".to_owned()));
            document.remove(TERMINATION_KEY);
        }
        TlsSetting::InternalTls => {
            document.insert(SCHEME_KEY, Value::String("https".to_owned()));
            document.remove(TERMINATION_KEY);
        }
        TlsSetting::ExternalTls => {
            document.insert(SCHEME_KEY, Value::String("https".to_owned()));
            document.insert(TERMINATION_KEY, Value::Bool(true));
        }
    }

    WriteOutcome::applied()
}
