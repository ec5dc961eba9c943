//! Field mapper
//!
//! Projects paths of the raw configuration document into flat view fields and
//! writes edited view fields back, applying each field family's defaulting
//! rules. Nothing in here fails on malformed input: partial data projects to
//! [`FieldValue::Unset`] and unusable writes come back as a [`WriteOutcome`]
//! other than `Applied`, with the document left as it was.

pub mod database;
pub mod endpoints;
pub mod logs;
pub mod oidc;
pub mod redis;
pub mod tls;

pub use database::DatabaseFields;
pub use endpoints::EndpointKind;
pub use logs::{ElasticsearchKey, KinesisKey, LogsModel, LogsProducer};
pub use redis::RedisKey;
pub use tls::TlsSetting;

use crate::config::RawConfigDocument;
use core::fmt;
use core::str::FromStr;
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use tracing::debug;

/// A synthetic, UI-facing field derived from the raw document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ViewField {
    GithubLoginKind,
    GithubTriggerKind,
    GitlabTriggerKind,
    TlsSetting,
    Redis(RedisKey),
    LogsModel,
    LogsProducer,
    Elasticsearch(ElasticsearchKey),
    Kinesis(KinesisKey),
    Database,
}

impl ViewField {
    /// Every view field, in the order the editor lays them out
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut fields = vec![
            Self::GithubLoginKind,
            Self::GithubTriggerKind,
            Self::GitlabTriggerKind,
            Self::TlsSetting,
        ];
        fields.extend(RedisKey::ALL.into_iter().map(Self::Redis));
        fields.push(Self::LogsModel);
        fields.push(Self::LogsProducer);
        fields.extend(ElasticsearchKey::ALL.into_iter().map(Self::Elasticsearch));
        fields.extend(KinesisKey::ALL.into_iter().map(Self::Kinesis));
        fields.push(Self::Database);
        fields
    }

    /// Fields nested under `LOGS_MODEL_CONFIG`
    #[must_use]
    pub fn logs_config_fields() -> Vec<Self> {
        let mut fields = vec![Self::LogsProducer];
        fields.extend(ElasticsearchKey::ALL.into_iter().map(Self::Elasticsearch));
        fields.extend(KinesisKey::ALL.into_iter().map(Self::Kinesis));
        fields
    }

    /// The field group an external manager may lock as read-only
    #[must_use]
    #[inline]
    pub const fn group(self) -> &'static str {
        match self {
            Self::GithubLoginKind => "GitHubLogin",
            Self::GithubTriggerKind => "GitHubBuildTrigger",
            Self::GitlabTriggerKind => "GitLabBuildTrigger",
            Self::TlsSetting => "HostSettings",
            Self::Redis(_) => "Redis",
            Self::LogsModel | Self::LogsProducer | Self::Elasticsearch(_) | Self::Kinesis(_) => {
                "Elasticsearch"
            }
            Self::Database => "Database",
        }
    }
}

impl fmt::Display for ViewField {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::GithubLoginKind => f.write_str("GITHUB_LOGIN_KIND"),
            Self::GithubTriggerKind => f.write_str("GITHUB_TRIGGER_KIND"),
            Self::GitlabTriggerKind => f.write_str("GITLAB_TRIGGER_KIND"),
            Self::TlsSetting => f.write_str("TLS_SETTING"),
            Self::Redis(key) => write!(f, "redis.{}", key.as_str()),
            Self::LogsModel => f.write_str("LOGS_MODEL"),
            Self::LogsProducer => f.write_str("LOGS_MODEL_CONFIG.producer"),
            Self::Elasticsearch(key) => write!(
                f,
                "LOGS_MODEL_CONFIG.{}.{}",
                logs::ELASTICSEARCH_CONFIG,
                key.as_str()
            ),
            Self::Kinesis(key) => write!(
                f,
                "LOGS_MODEL_CONFIG.{}.{}",
                logs::KINESIS_CONFIG,
                key.as_str()
            ),
            Self::Database => f.write_str("database"),
        }
    }
}

impl FromStr for ViewField {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|field| field.to_string() == s)
            .ok_or_else(|| format!("Unknown field: {s}"))
    }
}

impl Serialize for ViewField {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Value of a view field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
#[non_exhaustive]
pub enum FieldValue {
    Unset,
    Text(String),
    Number(Number),
    Database(DatabaseFields),
}

impl FieldValue {
    /// Convenience constructor for text values
    #[inline]
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self::Text(value.into())
    }

    /// Project a raw scalar; anything that is not a string or number is unset
    #[must_use]
    #[inline]
    pub fn from_raw(value: Option<&Value>) -> Self {
        match value {
            Some(&Value::String(ref s)) => Self::Text(s.clone()),
            Some(&Value::Number(ref n)) => Self::Number(n.clone()),
            _ => Self::Unset,
        }
    }

    /// Whether the value clears a field (unset or empty text)
    #[must_use]
    #[inline]
    pub fn is_blank(&self) -> bool {
        match *self {
            Self::Unset => true,
            Self::Text(ref s) => s.is_empty(),
            Self::Number(_) | Self::Database(_) => false,
        }
    }

    /// Borrow the text, if this is a text value
    #[must_use]
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match *self {
            Self::Text(ref s) => Some(s),
            _ => None,
        }
    }

    /// Raw JSON for scalar values
    #[must_use]
    #[inline]
    pub fn to_raw(&self) -> Option<Value> {
        match *self {
            Self::Text(ref s) => Some(Value::String(s.clone())),
            Self::Number(ref n) => Some(Value::Number(n.clone())),
            Self::Unset | Self::Database(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Unset => f.write_str("<unset>"),
            Self::Text(ref s) => f.write_str(s),
            Self::Number(ref n) => write!(f, "{n}"),
            Self::Database(ref db) => write!(f, "{db}"),
        }
    }
}

/// Result of writing a view field back into the document
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
#[non_exhaustive]
pub enum WriteOutcome {
    /// The document was updated; these other fields may need re-projecting
    Applied(Vec<ViewField>),
    /// Nothing to write for this input
    Ignored,
    /// Input is not complete yet; the document was left alone
    Deferred(String),
    /// Input is wrong; the document was left alone
    Malformed(String),
}

impl WriteOutcome {
    /// Applied with no other fields affected
    #[inline]
    pub const fn applied() -> Self {
        Self::Applied(Vec::new())
    }

    /// Other fields whose projection may have changed
    #[must_use]
    #[inline]
    pub fn affected(&self) -> &[ViewField] {
        match *self {
            Self::Applied(ref fields) => fields,
            _ => &[],
        }
    }

    /// Whether the document was updated
    #[must_use]
    #[inline]
    pub const fn is_applied(&self) -> bool {
        matches!(*self, Self::Applied(_))
    }
}

/// Derive a view field from the document
#[must_use]
pub fn project_field(document: &RawConfigDocument, field: ViewField) -> FieldValue {
    match field {
        ViewField::GithubLoginKind => endpoints::project(document, endpoints::GITHUB_LOGIN),
        ViewField::GithubTriggerKind => endpoints::project(document, endpoints::GITHUB_TRIGGER),
        ViewField::GitlabTriggerKind => endpoints::project(document, endpoints::GITLAB_TRIGGER),
        ViewField::TlsSetting => tls::project(document),
        ViewField::Redis(key) => redis::project(document, key),
        ViewField::LogsModel => logs::project_model(document),
        ViewField::LogsProducer => logs::project_producer(document),
        ViewField::Elasticsearch(key) => {
            logs::project_setting(document, logs::ELASTICSEARCH_CONFIG, key.as_str())
        }
        ViewField::Kinesis(key) => {
            logs::project_setting(document, logs::KINESIS_CONFIG, key.as_str())
        }
        ViewField::Database => database::project(document),
    }
}

/// Write an edited view field back into the document
///
/// Applying the same value twice leaves the document as applying it once.
pub fn apply_field(
    document: &mut RawConfigDocument,
    field: ViewField,
    value: &FieldValue,
) -> WriteOutcome {
    let outcome = match field {
        ViewField::GithubLoginKind => endpoints::apply(document, endpoints::GITHUB_LOGIN, value),
        ViewField::GithubTriggerKind => {
            endpoints::apply(document, endpoints::GITHUB_TRIGGER, value)
        }
        ViewField::GitlabTriggerKind => {
            endpoints::apply(document, endpoints::GITLAB_TRIGGER, value)
        }
        ViewField::TlsSetting => tls::apply(document, value),
        ViewField::Redis(key) => redis::apply(document, key, value),
        ViewField::LogsModel => logs::apply_model(document, value),
        ViewField::LogsProducer => logs::apply_producer(document, value),
        ViewField::Elasticsearch(key) => {
            logs::apply_setting(document, logs::ELASTICSEARCH_CONFIG, key.as_str(), value)
        }
        ViewField::Kinesis(key) => {
            logs::apply_setting(document, logs::KINESIS_CONFIG, key.as_str(), value)
        }
        ViewField::Database => database::apply(document, value),
    };
    debug!("{field} <- {value}: {outcome:?}");
    outcome
}

/// Project every view field
#[must_use]
pub fn project_all(document: &RawConfigDocument) -> Vec<(ViewField, FieldValue)> {
    ViewField::all()
        .into_iter()
        .map(|field| (field, project_field(document, field)))
        .collect()
}
