//! # Record Model
//!
//! A [`Record`] is an opaque JSON object read from the input source. It is never
//! mutated; enrichment produces an [`EnrichedRecord`] that owns a copy of the
//! fields plus the server-stamped timestamp markers.

use crate::constants::fields;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder resolved by the store to its own clock at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ServerTimeMarker;

/// One logical item to upload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Build a record from a JSON value, returning `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Human-readable identifier used in logs
    pub fn title(&self) -> &str {
        self.0
            .get(fields::TITLE)
            .and_then(Value::as_str)
            .unwrap_or("<untitled>")
    }
}

/// A record's fields plus `createdAt` / `updatedAt` server time markers
///
/// Both markers are always present and resolve to the same instant on first write.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    fields: Map<String, Value>,
    created_at: ServerTimeMarker,
    updated_at: ServerTimeMarker,
}

impl EnrichedRecord {
    pub(crate) fn new(fields: Map<String, Value>, now: ServerTimeMarker) -> Self {
        Self {
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fields copied from the source record. An incoming `createdAt`/`updatedAt`
    /// is shadowed by the server markers when the payload is written.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn title(&self) -> &str {
        self.fields
            .get(fields::TITLE)
            .and_then(Value::as_str)
            .unwrap_or("<untitled>")
    }

    /// Field names and markers the store must resolve at commit time
    pub fn server_time_fields(&self) -> [(&'static str, ServerTimeMarker); 2] {
        [
            (fields::CREATED_AT, self.created_at),
            (fields::UPDATED_AT, self.updated_at),
        ]
    }

    /// Approximate encoded size of the payload in bytes
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(&self.fields).map_or(0, |b| b.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_object_only() {
        assert!(Record::from_value(json!({"title": "a"})).is_some());
        assert!(Record::from_value(json!([1, 2])).is_none());
        assert!(Record::from_value(json!("title")).is_none());
    }

    #[test]
    fn test_title_falls_back_when_missing_or_not_a_string() {
        let titled = Record::from_value(json!({"title": "Seoul Tower"})).unwrap();
        assert_eq!(titled.title(), "Seoul Tower");

        let numeric = Record::from_value(json!({"title": 7})).unwrap();
        assert_eq!(numeric.title(), "<untitled>");

        assert_eq!(Record::default().title(), "<untitled>");
    }

    #[test]
    fn test_record_deserializes_transparently() {
        let record: Record = serde_json::from_str(r#"{"title":"x","rank":3}"#).unwrap();
        assert_eq!(record.fields().len(), 2);
        assert_eq!(record.get("rank"), Some(&json!(3)));
    }
}
