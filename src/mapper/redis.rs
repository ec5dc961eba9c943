//! Redis connection fields, mirrored into both Redis sub-maps

use super::{FieldValue, WriteOutcome};
use crate::config::RawConfigDocument;

pub const BUILDLOGS_REDIS: &str = "BUILDLOGS_REDIS";
pub const USER_EVENTS_REDIS: &str = "USER_EVENTS_REDIS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum RedisKey {
    Host,
    Port,
    Password,
}

impl RedisKey {
    pub const ALL: [Self; 3] = [Self::Host, Self::Port, Self::Password];

    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Port => "port",
            Self::Password => "password",
        }
    }
}

pub(crate) fn project(document: &RawConfigDocument, key: RedisKey) -> FieldValue {
    let name = key.as_str();
    let value = document
        .lookup(&format!("{BUILDLOGS_REDIS}.{name}"))
        .or_else(|| document.lookup(&format!("{USER_EVENTS_REDIS}.{name}")));
    FieldValue::from_raw(value)
}

pub(crate) fn apply(
    document: &mut RawConfigDocument,
    key: RedisKey,
    value: &FieldValue,
) -> WriteOutcome {
    let name = key.as_str();

    if value.is_blank() {
        for section in [BUILDLOGS_REDIS, USER_EVENTS_REDIS] {
            document.section_mut(section).remove(name);
        }
        return WriteOutcome::applied();
    }

    let Some(raw) = value.to_raw() else {
        return WriteOutcome::Malformed(format!("Invalid Redis {name}: {value}"));
    };

    for section in [BUILDLOGS_REDIS, USER_EVENTS_REDIS] {
        document
            .section_mut(section)
            .insert(name.to_owned(), raw.clone());
    }

    WriteOutcome::applied()
}
