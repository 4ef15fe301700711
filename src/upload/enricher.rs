use crate::models::{EnrichedRecord, Record, ServerTimeMarker};

/// Copy `record` and attach `createdAt` / `updatedAt` server time markers
pub fn enrich(record: &Record, now: ServerTimeMarker) -> EnrichedRecord {
    EnrichedRecord::new(record.fields().clone(), now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enrich_copies_fields_and_adds_markers() {
        let record = Record::from_value(json!({"title": "Namsan", "views": 3})).unwrap();
        let original = record.clone();

        let enriched = enrich(&record, ServerTimeMarker);

        assert_eq!(record, original);
        assert_eq!(enriched.fields(), record.fields());
        assert_eq!(enriched.title(), "Namsan");
        let [(created, created_marker), (updated, updated_marker)] = enriched.server_time_fields();
        assert_eq!((created, updated), ("createdAt", "updatedAt"));
        assert_eq!(created_marker, updated_marker);
    }
}
