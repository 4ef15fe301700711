//! Loads the ordered input sequence from a JSON array of objects.

use crate::error::{LoaderError, Result};
use crate::models::Record;
use serde_json::Value;
use std::path::Path;
use tracing::info;

pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let shown = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|e| LoaderError::input(&shown, e.to_string()))?;
    let records = parse_records(&raw).map_err(|message| LoaderError::input(&shown, message))?;

    info!(path = %shown, records = records.len(), "Loaded input records");
    Ok(records)
}

/// Parse a JSON document into records, naming the first element that is not an object
pub fn parse_records(raw: &str) -> std::result::Result<Vec<Record>, String> {
    let values: Vec<Value> = match serde_json::from_str(raw) {
        Ok(Value::Array(values)) => values,
        Ok(_) => return Err("expected a JSON array of objects".to_string()),
        Err(e) => return Err(format!("invalid JSON: {e}")),
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            Record::from_value(value).ok_or_else(|| format!("element {index} is not a JSON object"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_preserves_order() {
        let records = parse_records(r#"[{"title":"a"},{"title":"b"},{"title":"c"}]"#).unwrap();
        let titles: Vec<_> = records.iter().map(Record::title).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert_eq!(
            parse_records(r#"[{"title":"a"}, 3]"#).unwrap_err(),
            "element 1 is not a JSON object"
        );
        assert!(parse_records(r#"{"title":"a"}"#).is_err());
        assert!(parse_records("not json").unwrap_err().starts_with("invalid JSON"));
    }

    #[test]
    fn test_load_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"[{"title":"Bukchon"}]"#).unwrap();
        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title(), "Bukchon");
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = load_records(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LoaderError::Input { ref path, .. } if path == "/definitely/not/here.json"));
    }
}
