//! Ordered container metadata
//!
//! V1 stores `key=value\0` records; V2 stores a single JSON object whose
//! computed fields are bare numbers.

use std::fmt;

use fcodekit_core::FcodeError;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

/// Ordered `(key, value)` pairs; keys may repeat
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every pair of `other` after the current ones
    pub fn extend(&mut self, other: &Metadata) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// Encode as V1 `key=value\0` records
    pub fn to_v1_records(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, value) in &self.entries {
            out.extend_from_slice(key.as_bytes());
            out.push(b'=');
            out.extend_from_slice(value.as_bytes());
            out.push(0);
        }
        out
    }

    /// Decode V1 records
    pub fn from_v1_records(bytes: &[u8]) -> Result<Self, FcodeError> {
        let mut metadata = Self::new();
        let body = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        if body.is_empty() {
            return Ok(metadata);
        }
        for record in body.split(|b| *b == 0) {
            let text = std::str::from_utf8(record)
                .map_err(|e| FcodeError::BadMetadata(e.to_string()))?;
            let (key, value) = text
                .split_once('=')
                .ok_or_else(|| FcodeError::BadMetadata(format!("record without '=': {text}")))?;
            metadata.push(key, value);
        }
        Ok(metadata)
    }

    /// Encode as a V2 JSON object: the string pairs first, then `numbers`
    /// written verbatim
    pub fn to_v2_json(&self, numbers: &[(&str, String)]) -> Vec<u8> {
        let mut items = Vec::with_capacity(self.entries.len() + numbers.len());
        for (key, value) in &self.entries {
            items.push(format!("{}:{}", json_string(key), json_string(value)));
        }
        for (key, value) in numbers {
            items.push(format!("{}:{}", json_string(key), value));
        }
        format!("{{{}}}", items.join(",")).into_bytes()
    }

    /// Decode a V2 JSON object, keeping key order. Non-string values are
    /// kept as their JSON text.
    pub fn from_v2_json(bytes: &[u8]) -> Result<Self, FcodeError> {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        let metadata = Metadata::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(metadata)
    }
}

impl From<Vec<(String, String)>> for Metadata {
    fn from(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Metadata;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Metadata, A::Error> {
                let mut metadata = Metadata::new();
                while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    metadata.push(key, value);
                }
                Ok(metadata)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

fn json_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
