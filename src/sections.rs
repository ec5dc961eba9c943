//! Configuration sections the editor shows for a document

use crate::config::RawConfigDocument;
use crate::mapper::logs::{LOGS_MODEL, LOGS_MODEL_CONFIG, PRODUCER};
use crate::mapper::oidc;
use serde::Serialize;
use serde_json::Value;

/// When a section is shown
#[derive(Debug, Clone, Copy)]
enum Condition {
    Always,
    /// A top-level key equals this string
    Equals(&'static str, &'static str),
    /// A top-level flag is truthy
    Flag(&'static str),
    /// At least one generic OIDC provider is configured
    OidcProviders,
    /// The nested log producer is this value
    Producer(&'static str),
}

/// One editor section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
}

const SECTIONS: [(Section, Condition); 20] = [
    (section("redis", "Redis"), Condition::Always),
    (section("registry-storage", "Registry Storage"), Condition::Always),
    (section("time-machine", "Time Machine"), Condition::Always),
    (section("access", "Access Settings"), Condition::Always),
    (
        section("ssl", "SSL certificate and key"),
        Condition::Equals("PREFERRED_URL_SCHEME", "https"),
    ),
    (
        section("ldap", "LDAP Authentication"),
        Condition::Equals("AUTHENTICATION_TYPE", "LDAP"),
    ),
    (
        section("jwt", "JWT Authentication"),
        Condition::Equals("AUTHENTICATION_TYPE", "JWT"),
    ),
    (
        section("keystone", "Keystone Authentication"),
        Condition::Equals("AUTHENTICATION_TYPE", "Keystone"),
    ),
    (
        section("apptoken-auth", "App Token Authentication"),
        Condition::Equals("AUTHENTICATION_TYPE", "AppToken"),
    ),
    (
        section("github-login", "Github (Enterprise) Authentication"),
        Condition::Flag("FEATURE_GITHUB_LOGIN"),
    ),
    (
        section("google-login", "Google Authentication"),
        Condition::Flag("FEATURE_GOOGLE_LOGIN"),
    ),
    (
        section("github-trigger", "GitHub (Enterprise) Build Triggers"),
        Condition::Flag("FEATURE_GITHUB_BUILD"),
    ),
    (
        section("bitbucket-trigger", "BitBucket Build Triggers"),
        Condition::Flag("FEATURE_BITBUCKET_BUILD"),
    ),
    (
        section("gitlab-trigger", "GitLab Build Triggers"),
        Condition::Flag("FEATURE_GITLAB_BUILD"),
    ),
    (
        section("security-scanner", "Security Scanner"),
        Condition::Flag("FEATURE_SECURITY_SCANNER"),
    ),
    (section("oidc-login", "OIDC Login(s)"), Condition::OidcProviders),
    (
        section("actionlogarchiving", "Action Log Rotation"),
        Condition::Flag("FEATURE_ACTION_LOG_ROTATION"),
    ),
    (
        section("repomirroring", "Repository Mirroring"),
        Condition::Flag("FEATURE_REPOSITORY_MIRRORING"),
    ),
    (
        section("elasticsearch", "Elasticsearch"),
        Condition::Equals(LOGS_MODEL, "elasticsearch"),
    ),
    (
        section("kinesis", "Kinesis"),
        Condition::Producer("kinesis_stream"),
    ),
];

const fn section(id: &'static str, title: &'static str) -> Section {
    Section { id, title }
}

impl Condition {
    fn holds(self, document: &RawConfigDocument) -> bool {
        match self {
            Self::Always => true,
            Self::Equals(key, expected) => {
                document.get(key).and_then(Value::as_str) == Some(expected)
            }
            Self::Flag(key) => document.is_truthy(key),
            Self::OidcProviders => !oidc::providers(document).is_empty(),
            Self::Producer(expected) => {
                document
                    .lookup(&format!("{LOGS_MODEL_CONFIG}.{PRODUCER}"))
                    .and_then(Value::as_str)
                    == Some(expected)
            }
        }
    }
}

/// Sections to show for `document`, in display order
#[must_use]
pub fn active_sections(document: &RawConfigDocument) -> Vec<Section> {
    SECTIONS
        .iter()
        .filter(|&&(_, condition)| condition.holds(document))
        .map(|&(section, _)| section)
        .collect()
}
