//! Trace-level key/value metadata.

use std::collections::BTreeMap;

use serde::Serialize;

use super::StringId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataKey {
    StatsdTriggeringSubscriptionId,
}

impl MetadataKey {
    pub fn name(self) -> &'static str {
        match self {
            MetadataKey::StatsdTriggeringSubscriptionId => "statsd_triggering_subscription_id",
        }
    }
}

/// A metadata value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variadic {
    Int(i64),
    String(StringId),
}

#[derive(Debug, Default)]
pub struct Metadata {
    entries: BTreeMap<MetadataKey, Variadic>,
}

impl Metadata {
    /// Sets `key`, replacing any previous value.
    pub fn set(&mut self, key: MetadataKey, value: Variadic) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: MetadataKey) -> Option<&Variadic> {
        self.entries.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetadataKey, &Variadic)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}
