//! Hosted / enterprise selectors for GitHub and GitLab endpoints

use super::{FieldValue, WriteOutcome};
use crate::config::RawConfigDocument;
use core::fmt;
use core::str::FromStr;
use serde_json::Value;

/// Whether a Git provider is the public hosted service or a private install
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EndpointKind {
    Hosted,
    Enterprise,
}

impl EndpointKind {
    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hosted => "hosted",
            Self::Enterprise => "enterprise",
        }
    }
}

impl FromStr for EndpointKind {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hosted" => Ok(Self::Hosted),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(format!(
                "Invalid endpoint kind: {s}. Use 'hosted' or 'enterprise'"
            )),
        }
    }
}

impl fmt::Display for EndpointKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a provider keeps its endpoints and what the hosted values are
#[derive(Debug, Clone, Copy)]
pub struct EndpointProvider {
    /// Top-level config sub-map, e.g. `GITHUB_LOGIN_CONFIG`
    pub config_key: &'static str,
    pub endpoint_key: &'static str,
    pub hosted_endpoint: &'static str,
    /// API override written for hosted and dropped for enterprise
    pub api_endpoint: Option<(&'static str, &'static str)>,
}

pub const GITHUB_HOSTED: &str = "https://github.com/";
pub const GITHUB_API_HOSTED: &str = "https://api.github.com/";
pub const GITLAB_HOSTED: &str = "https://gitlab.com/";

pub const GITHUB_LOGIN: EndpointProvider = EndpointProvider {
    config_key: "GITHUB_LOGIN_CONFIG",
    endpoint_key: "GITHUB_ENDPOINT",
    hosted_endpoint: GITHUB_HOSTED,
    api_endpoint: Some(("API_ENDPOINT", GITHUB_API_HOSTED)),
};

pub const GITHUB_TRIGGER: EndpointProvider = EndpointProvider {
    config_key: "GITHUB_TRIGGER_CONFIG",
    endpoint_key: "GITHUB_ENDPOINT",
    hosted_endpoint: GITHUB_HOSTED,
    api_endpoint: Some(("API_ENDPOINT", GITHUB_API_HOSTED)),
};

pub const GITLAB_TRIGGER: EndpointProvider = EndpointProvider {
    config_key: "GITLAB_TRIGGER_CONFIG",
    endpoint_key: "GITLAB_ENDPOINT",
    hosted_endpoint: GITLAB_HOSTED,
    api_endpoint: None,
};

impl EndpointProvider {
    /// Dotted path of the endpoint inside the document
    #[must_use]
    #[inline]
    pub fn endpoint_path(&self) -> String {
        format!("{}.{}", self.config_key, self.endpoint_key)
    }
}

pub(crate) fn project(document: &RawConfigDocument, provider: EndpointProvider) -> FieldValue {
    let endpoint = document.lookup(&provider.endpoint_path());
    let kind = if endpoint.and_then(Value::as_str) == Some(provider.hosted_endpoint) {
        EndpointKind::Hosted
    } else {
        EndpointKind::Enterprise
    };
    FieldValue::text(kind.as_str())
}

pub(crate) fn apply(
    document: &mut RawConfigDocument,
    provider: EndpointProvider,
    value: &FieldValue,
) -> WriteOutcome {
    if value.is_blank() {
        return WriteOutcome::Ignored;
    }
    let kind = match value.as_text().map(str::parse::<EndpointKind>) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => return WriteOutcome::Malformed(e),
        None => return WriteOutcome::Malformed(format!("Expected text, got {value}")),
    };

    let section = document.section_mut(provider.config_key);
    match kind {
        EndpointKind::Hosted => {
            section.insert(
                provider.endpoint_key.to_owned(),
                Value::String(provider.hosted_endpoint.to_owned()),
            );
            if let Some((api_key, api_url)) = provider.api_endpoint {
                section.insert(api_key.to_owned(), Value::String(api_url.to_owned()));
            }
        }
        EndpointKind::Enterprise => {
            // Only the canonical hosted URL is cleared; a typed enterprise URL stays
            if section.get(provider.endpoint_key).and_then(Value::as_str)
                == Some(provider.hosted_endpoint)
            {
                section.insert(provider.endpoint_key.to_owned(), Value::String(String::new()));
            }
            if let Some((api_key, _)) = provider.api_endpoint {
                section.remove(api_key);
            }
        }
    }

    WriteOutcome::applied()
}
