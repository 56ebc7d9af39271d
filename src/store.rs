//! Record store I/O.
//!
//! Reads and writes ordered record sequences as JSON Lines (one flat object
//! per line) or as a single JSON array. Whole files are loaded into memory;
//! nothing here streams.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::error::{DmError, Result};
use crate::record::Record;

/// Parse JSON Lines text into records.
///
/// Blank lines are skipped. Line numbers in errors are 1-based.
pub fn parse_jsonl(text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (line_num, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value =
            serde_json::from_str(line).map_err(|e| DmError::MalformedRecord {
                line: line_num + 1,
                message: e.to_string(),
            })?;
        let record = Record::try_from(value).map_err(|_| DmError::MalformedRecord {
            line: line_num + 1,
            message: "expected a JSON object".to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Read a JSON Lines file.
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| DmError::io(path, e))?;
    let records = parse_jsonl(&text)?;
    log::debug!("read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Write records as JSON Lines. Truncates the file unless `append` is set.
///
/// Non-ASCII text is written as-is.
pub fn write_jsonl(path: impl AsRef<Path>, records: &[Record], append: bool) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .map_err(|e| DmError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n").map_err(|e| DmError::io(path, e))?;
    }
    writer.flush().map_err(|e| DmError::io(path, e))?;
    log::debug!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Read a JSON file holding a top-level array of objects.
pub fn read_json(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| DmError::io(path, e))?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Array(items) => items.into_iter().map(Record::try_from).collect(),
        other => Err(DmError::InvalidArgument(format!(
            "{} does not hold a JSON array (found {})",
            path.display(),
            type_name(&other)
        ))),
    }
}

/// Write records as one pretty-printed JSON array (4-space indent).
pub fn write_json(path: impl AsRef<Path>, records: &[Record]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| DmError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut ser =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut ser)?;
    writer.write_all(b"\n").map_err(|e| DmError::io(path, e))?;
    writer.flush().map_err(|e| DmError::io(path, e))?;
    Ok(())
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| DmError::io(parent, e))?;
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_parse_jsonl_skips_blank_lines() {
        let records = parse_jsonl("{\"id\":1}\n\n{\"id\":2}\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("id"), Some(&json!(2)));
    }

    #[test]
    fn test_parse_jsonl_reports_line_number() {
        let err = parse_jsonl("{\"id\":1}\n{\"id\":\n").unwrap_err();
        assert!(matches!(err, DmError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_parse_jsonl_rejects_non_object() {
        let err = parse_jsonl("{\"id\":1}\n[1,2]\n").unwrap_err();
        assert!(matches!(err, DmError::MalformedRecord { line: 2, .. }));
    }

    #[test]
    fn test_write_then_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");
        let first = parse_jsonl(r#"{"id":1,"name":"Zoë"}"#).unwrap();
        let second = parse_jsonl(r#"{"id":2}"#).unwrap();

        write_jsonl(&path, &first, false).unwrap();
        write_jsonl(&path, &second, true).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\"id\":1,\"name\":\"Zoë\"}\n{\"id\":2}\n");

        write_jsonl(&path, &second, false).unwrap();
        assert_eq!(read_jsonl(&path).unwrap(), second);
    }

    #[test]
    fn test_field_order_survives_io() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("order.jsonl");
        let records = parse_jsonl(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        write_jsonl(&path, &records, false).unwrap();
        let back = read_jsonl(&path).unwrap();
        assert_eq!(back[0].keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_json_array_round_trip_uses_four_space_indent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let records = parse_jsonl("{\"id\":1}\n{\"id\":2}").unwrap();
        write_json(&path, &records).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n        \"id\": 1"));
        assert_eq!(read_json(&path).unwrap(), records);
    }

    #[test]
    fn test_read_json_rejects_object_root() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("obj.json");
        fs::write(&path, "{\"id\":1}").unwrap();
        assert!(matches!(
            read_json(&path).unwrap_err(),
            DmError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = read_jsonl("/nonexistent/dir/file.jsonl").unwrap_err();
        assert!(matches!(err, DmError::Io { .. }));
    }
}
