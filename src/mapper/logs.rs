//! Action log model selector and its nested producer configuration

use super::{FieldValue, ViewField, WriteOutcome};
use crate::config::{RawConfigDocument, child_object};
use core::fmt;
use core::str::FromStr;
use serde_json::{Map, Value};

pub const LOGS_MODEL: &str = "LOGS_MODEL";
pub const LOGS_MODEL_CONFIG: &str = "LOGS_MODEL_CONFIG";
pub const PRODUCER: &str = "producer";
pub const ELASTICSEARCH_CONFIG: &str = "elasticsearch_config";
pub const KINESIS_CONFIG: &str = "kinesis_stream_config";

/// Where action logs are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogsModel {
    Database,
    Elasticsearch,
}

impl LogsModel {
    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Elasticsearch => "elasticsearch",
        }
    }
}

impl FromStr for LogsModel {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "database" => Ok(Self::Database),
            "elasticsearch" => Ok(Self::Elasticsearch),
            _ => Err(format!(
                "Invalid logs model: {s}. Use 'database' or 'elasticsearch'"
            )),
        }
    }
}

impl fmt::Display for LogsModel {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which service feeds the Elasticsearch log model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogsProducer {
    Elasticsearch,
    KinesisStream,
}

impl LogsProducer {
    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Elasticsearch => "elasticsearch",
            Self::KinesisStream => "kinesis_stream",
        }
    }
}

impl FromStr for LogsProducer {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elasticsearch" => Ok(Self::Elasticsearch),
            "kinesis_stream" => Ok(Self::KinesisStream),
            _ => Err(format!(
                "Invalid logs producer: {s}. Use 'elasticsearch' or 'kinesis_stream'"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ElasticsearchKey {
    Host,
    Port,
    AccessKey,
    SecretKey,
    AwsRegion,
    IndexPrefix,
}

impl ElasticsearchKey {
    pub const ALL: [Self; 6] = [
        Self::Host,
        Self::Port,
        Self::AccessKey,
        Self::SecretKey,
        Self::AwsRegion,
        Self::IndexPrefix,
    ];

    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Port => "port",
            Self::AccessKey => "access_key",
            Self::SecretKey => "secret_key",
            Self::AwsRegion => "aws_region",
            Self::IndexPrefix => "index_prefix",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum KinesisKey {
    AwsAccessKey,
    AwsSecretKey,
    AwsRegion,
    StreamName,
}

impl KinesisKey {
    pub const ALL: [Self; 4] = [
        Self::AwsAccessKey,
        Self::AwsSecretKey,
        Self::AwsRegion,
        Self::StreamName,
    ];

    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwsAccessKey => "aws_access_key",
            Self::AwsSecretKey => "aws_secret_key",
            Self::AwsRegion => "aws_region",
            Self::StreamName => "stream_name",
        }
    }
}

fn current_model(document: &RawConfigDocument) -> Option<&str> {
    document.get(LOGS_MODEL).and_then(Value::as_str)
}

pub(crate) fn project_model(document: &RawConfigDocument) -> FieldValue {
    match current_model(document) {
        Some(model) if !model.is_empty() => FieldValue::text(model),
        _ => FieldValue::text(LogsModel::Database.as_str()),
    }
}

pub(crate) fn project_producer(document: &RawConfigDocument) -> FieldValue {
    if current_model(document) != Some(LogsModel::Elasticsearch.as_str()) {
        return FieldValue::Unset;
    }
    match document.lookup(&format!("{LOGS_MODEL_CONFIG}.{PRODUCER}")) {
        Some(&Value::String(ref producer)) => FieldValue::Text(producer.clone()),
        _ => FieldValue::text(LogsProducer::Elasticsearch.as_str()),
    }
}

pub(crate) fn project_setting(
    document: &RawConfigDocument,
    config_name: &str,
    key: &str,
) -> FieldValue {
    FieldValue::from_raw(document.lookup(&format!("{LOGS_MODEL_CONFIG}.{config_name}.{key}")))
}

pub(crate) fn apply_model(document: &mut RawConfigDocument, value: &FieldValue) -> WriteOutcome {
    if value.is_blank() {
        document.insert(LOGS_MODEL, Value::String(LogsModel::Database.as_str().to_owned()));
        return WriteOutcome::applied();
    }
    let model = match value.as_text().map(str::parse::<LogsModel>) {
        Some(Ok(model)) => model,
        Some(Err(e)) => return WriteOutcome::Malformed(e),
        None => return WriteOutcome::Malformed(format!("Invalid logs model: {value}")),
    };

    document.insert(LOGS_MODEL, Value::String(model.as_str().to_owned()));
    match model {
        LogsModel::Elasticsearch => {
            let config = document.section_mut(LOGS_MODEL_CONFIG);
            child_object(config, ELASTICSEARCH_CONFIG);
            if !config.get(PRODUCER).is_some_and(crate::config::is_truthy) {
                config.insert(
                    PRODUCER.to_owned(),
                    Value::String(LogsProducer::Elasticsearch.as_str().to_owned()),
                );
            }
            WriteOutcome::Applied(vec![ViewField::LogsProducer])
        }
        LogsModel::Database => {
            // Switching back drops every nested producer setting
            document.insert(LOGS_MODEL_CONFIG, Value::Object(Map::new()));
            WriteOutcome::Applied(ViewField::logs_config_fields())
        }
    }
}

pub(crate) fn apply_producer(document: &mut RawConfigDocument, value: &FieldValue) -> WriteOutcome {
    if value.is_blank() {
        return WriteOutcome::Ignored;
    }
    let producer = match value.as_text().map(str::parse::<LogsProducer>) {
        Some(Ok(producer)) => producer,
        Some(Err(e)) => return WriteOutcome::Malformed(e),
        None => return WriteOutcome::Malformed(format!("Invalid logs producer: {value}")),
    };

    let config = document.section_mut(LOGS_MODEL_CONFIG);
    let affected = match producer {
        LogsProducer::KinesisStream => {
            child_object(config, KINESIS_CONFIG);
            Vec::new()
        }
        LogsProducer::Elasticsearch => {
            config.remove(KINESIS_CONFIG);
            KinesisKey::ALL
                .into_iter()
                .map(ViewField::Kinesis)
                .collect()
        }
    };
    config.insert(
        PRODUCER.to_owned(),
        Value::String(producer.as_str().to_owned()),
    );

    WriteOutcome::Applied(affected)
}

pub(crate) fn apply_setting(
    document: &mut RawConfigDocument,
    config_name: &str,
    key: &str,
    value: &FieldValue,
) -> WriteOutcome {
    if value.is_blank() {
        if let Some(nested) = document
            .get_mut(LOGS_MODEL_CONFIG)
            .and_then(|config| config.get_mut(config_name))
            .and_then(Value::as_object_mut)
        {
            nested.remove(key);
        }
        return WriteOutcome::applied();
    }

    let Some(raw) = value.to_raw() else {
        return WriteOutcome::Malformed(format!("Invalid value for {config_name}.{key}: {value}"));
    };
    child_object(document.section_mut(LOGS_MODEL_CONFIG), config_name).insert(key.to_owned(), raw);
    WriteOutcome::applied()
}
